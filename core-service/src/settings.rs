//! User-editable client settings, persisted as one JSON document in the
//! host's [`SettingsStore`].

use crate::error::{CoreError, Result};
use bridge_traits::SettingsStore;
use core_runtime::config::DEFAULT_FOLDER_NAME;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Key the settings document is stored under
pub const SETTINGS_KEY: &str = "ventus.client_settings";

const MAX_DEVICE_NAME_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Name shown to the desktop companion
    pub device_name: String,
    /// Folder (or album) that receives synced files
    pub target_folder: String,
    pub max_connections: u32,
    pub max_rate_mbps: u32,
    pub size_limit_gb: u32,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            device_name: "Mobile".to_string(),
            target_folder: DEFAULT_FOLDER_NAME.to_string(),
            max_connections: 5,
            max_rate_mbps: 1,
            size_limit_gb: 10,
        }
    }
}

impl ClientSettings {
    pub fn validate(&self) -> Result<()> {
        let invalid = |field: &str, reason: &str| CoreError::InvalidSetting {
            field: field.to_string(),
            reason: reason.to_string(),
        };

        let device_name = self.device_name.trim();
        if device_name.is_empty() {
            return Err(invalid("device_name", "cannot be empty"));
        }
        if device_name.chars().count() > MAX_DEVICE_NAME_LEN {
            return Err(invalid("device_name", "must be at most 64 characters"));
        }
        if self.target_folder.trim().is_empty() {
            return Err(invalid("target_folder", "cannot be empty"));
        }
        if self.max_connections == 0 {
            return Err(invalid("max_connections", "must be at least 1"));
        }
        if self.max_rate_mbps == 0 {
            return Err(invalid("max_rate_mbps", "must be at least 1"));
        }
        if self.size_limit_gb == 0 {
            return Err(invalid("size_limit_gb", "must be at least 1"));
        }
        Ok(())
    }
}

/// Loads and saves [`ClientSettings`].
#[derive(Clone)]
pub struct SettingsManager {
    store: Arc<dyn SettingsStore>,
    defaults: ClientSettings,
}

impl SettingsManager {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self::with_defaults(store, ClientSettings::default())
    }

    /// Use `defaults` for anything the user has not saved.
    pub fn with_defaults(store: Arc<dyn SettingsStore>, defaults: ClientSettings) -> Self {
        Self { store, defaults }
    }

    pub fn defaults(&self) -> &ClientSettings {
        &self.defaults
    }

    /// Current settings, or defaults when none are saved.
    ///
    /// Fields missing from the saved document take their default. A stored
    /// document that no longer parses or validates is ignored with a warning
    /// so the client stays usable.
    pub async fn load(&self) -> Result<ClientSettings> {
        let Some(raw) = self.store.get_string(SETTINGS_KEY).await? else {
            debug!("No saved settings; using defaults");
            return Ok(self.defaults.clone());
        };

        match self.merge_saved(&raw) {
            Ok(settings) if settings.validate().is_ok() => Ok(settings),
            Ok(_) => {
                warn!("Saved settings are out of range; using defaults");
                Ok(self.defaults.clone())
            }
            Err(e) => {
                warn!(error = %e, "Saved settings are unreadable; using defaults");
                Ok(self.defaults.clone())
            }
        }
    }

    fn merge_saved(&self, raw: &str) -> serde_json::Result<ClientSettings> {
        let mut merged = serde_json::to_value(&self.defaults)?;
        let saved: Value = serde_json::from_str(raw)?;
        match (&mut merged, saved) {
            (Value::Object(fields), Value::Object(saved)) => fields.extend(saved),
            (_, other) => merged = other,
        }
        serde_json::from_value(merged)
    }

    pub async fn save(&self, settings: &ClientSettings) -> Result<()> {
        settings.validate()?;
        let raw = serde_json::to_string(settings)?;
        self.store.set_string(SETTINGS_KEY, &raw).await?;
        debug!("Settings saved");
        Ok(())
    }

    /// Apply `change` to the current settings and save the result.
    pub async fn update<F>(&self, change: F) -> Result<ClientSettings>
    where
        F: FnOnce(&mut ClientSettings),
    {
        let mut settings = self.load().await?;
        change(&mut settings);
        self.save(&settings).await?;
        Ok(settings)
    }

    /// Forget saved settings; the next `load` returns the defaults.
    pub async fn reset(&self) -> Result<()> {
        self.store.delete(SETTINGS_KEY).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::Result as BridgeResult;
    use mockall::mock;

    mock! {
        Store {}

        #[async_trait::async_trait]
        impl SettingsStore for Store {
            async fn set_string(&self, key: &str, value: &str) -> BridgeResult<()>;
            async fn get_string(&self, key: &str) -> BridgeResult<Option<String>>;
            async fn delete(&self, key: &str) -> BridgeResult<()>;
        }
    }

    fn returning(raw: Option<&'static str>) -> SettingsManager {
        let mut store = MockStore::new();
        store
            .expect_get_string()
            .withf(|key| key.to_string() == SETTINGS_KEY)
            .returning(move |_| Ok(raw.map(str::to_string)));
        SettingsManager::new(Arc::new(store))
    }

    #[test]
    fn defaults_match_client() {
        let settings = ClientSettings::default();
        assert_eq!(settings.device_name, "Mobile");
        assert_eq!(settings.target_folder, "Ventus");
        assert_eq!(settings.max_connections, 5);
        assert_eq!(settings.max_rate_mbps, 1);
        assert_eq!(settings.size_limit_gb, 10);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn validation_names_the_field() {
        let settings = ClientSettings {
            max_connections: 0,
            ..ClientSettings::default()
        };
        match settings.validate() {
            Err(CoreError::InvalidSetting { field, .. }) => assert_eq!(field, "max_connections"),
            other => panic!("unexpected {other:?}"),
        }

        let long_name = ClientSettings {
            device_name: "x".repeat(65),
            ..ClientSettings::default()
        };
        assert!(long_name.validate().is_err());
    }

    #[tokio::test]
    async fn load_without_saved_settings() {
        let manager = returning(None);
        assert_eq!(manager.load().await.unwrap(), ClientSettings::default());
    }

    #[tokio::test]
    async fn load_fills_missing_fields() {
        let manager = returning(Some(r#"{"device_name":"Pixel","max_connections":2}"#));
        let settings = manager.load().await.unwrap();
        assert_eq!(settings.device_name, "Pixel");
        assert_eq!(settings.max_connections, 2);
        assert_eq!(settings.target_folder, "Ventus");
    }

    #[tokio::test]
    async fn corrupt_settings_fall_back_to_defaults() {
        assert_eq!(
            returning(Some("{not json")).load().await.unwrap(),
            ClientSettings::default()
        );
        assert_eq!(
            returning(Some(r#"{"device_name":""}"#)).load().await.unwrap(),
            ClientSettings::default()
        );
    }

    #[tokio::test]
    async fn configured_defaults_fill_missing_fields() {
        let mut store = MockStore::new();
        store
            .expect_get_string()
            .times(2)
            .returning({
                let mut saved = vec![Some(r#"{"device_name":"Pixel"}"#.to_string()), None];
                move |_| Ok(saved.pop().flatten())
            });
        let defaults = ClientSettings {
            target_folder: "Phone Sync".to_string(),
            ..ClientSettings::default()
        };
        let manager = SettingsManager::with_defaults(Arc::new(store), defaults);

        assert_eq!(manager.load().await.unwrap().target_folder, "Phone Sync");
        let saved = manager.load().await.unwrap();
        assert_eq!(saved.device_name, "Pixel");
        assert_eq!(saved.target_folder, "Phone Sync");
    }

    #[tokio::test]
    async fn non_object_settings_fall_back_to_defaults() {
        assert_eq!(
            returning(Some("[1, 2]")).load().await.unwrap(),
            ClientSettings::default()
        );
    }

    #[tokio::test]
    async fn save_rejects_invalid_settings() {
        let mut store = MockStore::new();
        store.expect_set_string().times(0);
        let manager = SettingsManager::new(Arc::new(store));

        let invalid = ClientSettings {
            target_folder: " ".to_string(),
            ..ClientSettings::default()
        };
        assert!(manager.save(&invalid).await.is_err());
    }

    #[tokio::test]
    async fn update_saves_changed_document() {
        let mut store = MockStore::new();
        store.expect_get_string().returning(|_| Ok(None));
        store
            .expect_set_string()
            .withf(|key, value| key.to_string() == SETTINGS_KEY && value.contains("\"Tablet\""))
            .times(1)
            .returning(|_, _| Ok(()));
        let manager = SettingsManager::new(Arc::new(store));

        let updated = manager
            .update(|settings| settings.device_name = "Tablet".to_string())
            .await
            .unwrap();
        assert_eq!(updated.device_name, "Tablet");
    }
}
