//! Settings Storage backed by a JSON file

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::SettingsStore,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::filesystem::default_data_dir;

const SETTINGS_FILE: &str = "settings.json";

/// JSON-file settings store
///
/// Keeps every key in memory and rewrites the whole file on each mutation.
/// Writes go to a sibling temp file first and are renamed into place so a
/// crash never leaves a truncated settings file behind.
pub struct JsonFileSettingsStore {
    path: PathBuf,
    values: Mutex<Option<BTreeMap<String, String>>>,
}

impl JsonFileSettingsStore {
    /// Create a store at `<data dir>/settings.json`
    pub fn new() -> Self {
        Self::with_path(default_data_dir().join(SETTINGS_FILE))
    }

    /// Create a store at an explicit file path
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            path,
            values: Mutex::new(None),
        }
    }

    async fn load(&self) -> Result<BTreeMap<String, String>> {
        match tokio::fs::read(&self.path).await {
            Ok(raw) => serde_json::from_slice(&raw).map_err(|e| {
                error!(path = ?self.path, error = %e, "Settings file is corrupt");
                BridgeError::OperationFailed(format!("Failed to parse settings: {}", e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(BridgeError::Io(e)),
        }
    }

    async fn persist(&self, values: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(BridgeError::Io)?;
        }

        let raw = serde_json::to_vec_pretty(values).map_err(|e| {
            BridgeError::OperationFailed(format!("Failed to encode settings: {}", e))
        })?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, raw).await.map_err(BridgeError::Io)?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(BridgeError::Io)?;

        debug!(path = ?self.path, keys = values.len(), "Persisted settings");
        Ok(())
    }

    /// Run `f` against the loaded key map, lazily reading the file once.
    async fn with_values<T>(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, String>) -> (T, bool),
    ) -> Result<T> {
        let mut guard = self.values.lock().await;
        if guard.is_none() {
            *guard = Some(self.load().await?);
        }
        let values = guard.get_or_insert_with(BTreeMap::new);

        let (result, dirty) = f(values);
        if dirty {
            self.persist(values).await?;
        }
        Ok(result)
    }
}

impl Default for JsonFileSettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SettingsStore for JsonFileSettingsStore {
    async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.with_values(|values| {
            let changed = values.get(key).map(String::as_str) != Some(value);
            if changed {
                values.insert(key.to_string(), value.to_string());
            }
            ((), changed)
        })
        .await
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        self.with_values(|values| (values.get(key).cloned(), false))
            .await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.with_values(|values| ((), values.remove(key).is_some()))
            .await
    }
}
