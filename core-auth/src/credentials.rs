//! # Credential Store
//!
//! Process-wide holder of the current sync target and connection flag.
//!
//! ## Overview
//!
//! The store is an observable value: views subscribe to be told about every
//! transition, and the session coordinator drives `connect`/`disconnect`.
//! Notifications are delivered synchronously on the thread that caused the
//! transition, in subscription order, after the internal lock is released so
//! a listener may read the store again.
//!
//! The store performs no I/O and no validation; callers validate targets
//! with [`ConnectionTarget`](crate::ConnectionTarget) before connecting.
//!
//! ## Usage
//!
//! ```
//! use core_auth::CredentialStore;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let store = CredentialStore::new();
//! let seen = Arc::new(AtomicUsize::new(0));
//! let counter = seen.clone();
//! let id = store.subscribe(move |_| {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! store.connect("10.0.0.5:1234");
//! store.connect("10.0.0.5:1234"); // same target, no transition
//! store.disconnect();
//! assert_eq!(seen.load(Ordering::SeqCst), 2);
//!
//! assert!(store.unsubscribe(id));
//! ```

use crate::types::{Credentials, SubscriptionId};
use core_runtime::events::{ConnectionEvent, CoreEvent, EventBus};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

type Listener = Arc<dyn Fn(&Credentials) + Send + Sync>;

struct StoreState {
    credentials: Credentials,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_id: u64,
}

/// Observable `{target, is_connected}` store.
pub struct CredentialStore {
    state: Mutex<StoreState>,
    event_bus: Option<EventBus>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState {
                credentials: Credentials::default(),
                listeners: Vec::new(),
                next_id: 0,
            }),
            event_bus: None,
        }
    }

    /// Create a store that also publishes `CoreEvent::Connection` events.
    pub fn with_event_bus(event_bus: EventBus) -> Self {
        Self {
            event_bus: Some(event_bus),
            ..Self::new()
        }
    }

    /// Current credentials.
    pub fn snapshot(&self) -> Credentials {
        self.state.lock().credentials.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().credentials.is_connected
    }

    /// Point the store at `target`.
    ///
    /// Returns `true` when this caused a transition. Connecting to the target
    /// that is already connected is a no-op and notifies nobody. An empty
    /// target is ignored so the store never reports a connection without one.
    pub fn connect(&self, target: impl Into<String>) -> bool {
        let target = target.into();
        if target.trim().is_empty() {
            warn!("Ignoring connect with an empty target");
            return false;
        }

        let (snapshot, listeners) = {
            let mut state = self.state.lock();
            if state.credentials.is_connected
                && state.credentials.target.as_deref() == Some(target.as_str())
            {
                debug!("Already connected to target");
                return false;
            }

            state.credentials = Credentials::connected(target.clone());
            (state.credentials.clone(), Self::listeners_of(&state))
        };

        info!(target_addr = %target, "Credentials connected");
        self.publish(CoreEvent::Connection(ConnectionEvent::Connected { target }));
        Self::notify(&listeners, &snapshot);
        true
    }

    /// Clear both fields. Safe in any state.
    ///
    /// Returns `true` when this caused a transition; disconnecting an already
    /// empty store notifies nobody.
    pub fn disconnect(&self) -> bool {
        let (snapshot, listeners) = {
            let mut state = self.state.lock();
            if state.credentials == Credentials::default() {
                return false;
            }

            state.credentials = Credentials::default();
            (state.credentials.clone(), Self::listeners_of(&state))
        };

        info!("Credentials cleared");
        self.publish(CoreEvent::Connection(ConnectionEvent::Disconnected));
        Self::notify(&listeners, &snapshot);
        true
    }

    /// Register `listener` for every future transition.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&Credentials) + Send + Sync + 'static,
    {
        let mut state = self.state.lock();
        let id = SubscriptionId(state.next_id);
        state.next_id += 1;
        state.listeners.push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if `id` was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut state = self.state.lock();
        let before = state.listeners.len();
        state.listeners.retain(|(existing, _)| *existing != id);
        state.listeners.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.lock().listeners.len()
    }

    fn listeners_of(state: &StoreState) -> Vec<Listener> {
        state
            .listeners
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }

    fn notify(listeners: &[Listener], snapshot: &Credentials) {
        for listener in listeners {
            listener(snapshot);
        }
    }

    fn publish(&self, event: CoreEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(event).ok();
        }
    }
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("CredentialStore")
            .field("credentials", &state.credentials)
            .field("subscribers", &state.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as SyncMutex;

    fn recorder(store: &CredentialStore) -> Arc<SyncMutex<Vec<Credentials>>> {
        let seen = Arc::new(SyncMutex::new(Vec::new()));
        let sink = seen.clone();
        store.subscribe(move |credentials| sink.lock().push(credentials.clone()));
        seen
    }

    #[test]
    fn test_connect_sets_both_fields() {
        let store = CredentialStore::new();
        assert!(store.connect("10.0.0.5"));

        let snapshot = store.snapshot();
        assert!(snapshot.is_connected);
        assert_eq!(snapshot.target.as_deref(), Some("10.0.0.5"));
    }

    #[test]
    fn test_reconnect_same_target_is_silent() {
        let store = CredentialStore::new();
        let seen = recorder(&store);

        assert!(store.connect("10.0.0.5"));
        assert!(!store.connect("10.0.0.5"));

        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn test_new_target_replaces_and_notifies() {
        let store = CredentialStore::new();
        let seen = recorder(&store);

        store.connect("10.0.0.5");
        store.connect("10.0.0.6");

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].target.as_deref(), Some("10.0.0.6"));
        assert_eq!(store.snapshot().target.as_deref(), Some("10.0.0.6"));
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let store = CredentialStore::new();
        let seen = recorder(&store);

        assert!(!store.disconnect());
        store.connect("10.0.0.5");
        assert!(store.disconnect());
        assert!(!store.disconnect());

        assert_eq!(store.snapshot(), Credentials::default());
        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1], Credentials::default());
    }

    #[test]
    fn test_empty_target_is_ignored() {
        let store = CredentialStore::new();
        assert!(!store.connect("   "));
        assert!(!store.is_connected());
    }

    #[test]
    fn test_listeners_called_in_subscription_order() {
        let store = CredentialStore::new();
        let order = Arc::new(SyncMutex::new(Vec::new()));
        for index in 0..3 {
            let order = order.clone();
            store.subscribe(move |_| order.lock().push(index));
        }

        store.connect("10.0.0.5");
        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn test_listener_may_read_store() {
        let store = Arc::new(CredentialStore::new());
        let observed = Arc::new(SyncMutex::new(None));

        let reader = Arc::downgrade(&store);
        let slot = observed.clone();
        store.subscribe(move |_| {
            if let Some(store) = reader.upgrade() {
                *slot.lock() = Some(store.snapshot());
            }
        });

        store.connect("10.0.0.5");
        assert_eq!(
            observed.lock().as_ref().and_then(|c| c.target.clone()),
            Some("10.0.0.5".to_string())
        );
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let store = CredentialStore::new();
        let seen = Arc::new(SyncMutex::new(0));
        let counter = seen.clone();
        let id = store.subscribe(move |_| *counter.lock() += 1);

        store.connect("10.0.0.5");
        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.disconnect();

        assert_eq!(*seen.lock(), 1);
        assert_eq!(store.subscriber_count(), 0);
    }

    // For any sequence of connects and disconnects, the store is connected
    // iff a connect happened since the last disconnect, and holds the most
    // recent target.
    #[test]
    fn test_state_follows_operation_sequences() {
        let targets = ["10.0.0.1", "10.0.0.2", "10.0.0.3"];

        // Enumerate every sequence of length 5 over {connect(t0..t2), disconnect}.
        for mut code in 0..(4u32.pow(5)) {
            let store = CredentialStore::new();
            let mut expected: Option<&str> = None;

            for _ in 0..5 {
                match code % 4 {
                    3 => {
                        store.disconnect();
                        expected = None;
                    }
                    n => {
                        let target = targets[n as usize];
                        store.connect(target);
                        expected = Some(target);
                    }
                }
                code /= 4;

                let snapshot = store.snapshot();
                assert_eq!(snapshot.is_connected, expected.is_some());
                assert_eq!(snapshot.target.as_deref(), expected);
            }
        }
    }

    #[tokio::test]
    async fn test_transitions_published_on_event_bus() {
        let bus = EventBus::new(8);
        let mut events = bus.subscribe();
        let store = CredentialStore::with_event_bus(bus);

        store.connect("10.0.0.5:1234");
        store.connect("10.0.0.5:1234");
        store.disconnect();

        assert_eq!(
            events.recv().await.unwrap(),
            CoreEvent::Connection(ConnectionEvent::Connected {
                target: "10.0.0.5:1234".to_string()
            })
        );
        assert_eq!(
            events.recv().await.unwrap(),
            CoreEvent::Connection(ConnectionEvent::Disconnected)
        );
        assert!(events.try_recv().is_err());
    }
}
