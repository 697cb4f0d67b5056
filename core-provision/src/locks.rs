//! Per-name async locks serializing provisioning of the same folder.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockMap = Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>;

/// Map of folder name to its lock. Clones share the same map.
///
/// An entry lives only while someone holds or waits for that name.
#[derive(Clone, Default)]
pub struct NameLocks {
    locks: LockMap,
}

impl NameLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `name`.
    pub async fn acquire(&self, name: &str) -> NameGuard {
        // Cloned under the map lock, so a pruning guard always sees this waiter.
        let lock = Arc::clone(
            self.locks
                .lock()
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
        );
        NameGuard {
            guard: Some(lock.lock_owned().await),
            name: name.to_string(),
            locks: Arc::clone(&self.locks),
        }
    }

    /// Names currently held or waited for.
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exclusive access to one name; released on drop.
pub struct NameGuard {
    guard: Option<OwnedMutexGuard<()>>,
    name: String,
    locks: LockMap,
}

impl Drop for NameGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.locks.lock();
        let idle = locks
            .get(&self.name)
            .is_some_and(|lock| Arc::strong_count(lock) == 1);
        if idle {
            locks.remove(&self.name);
        }
    }
}
