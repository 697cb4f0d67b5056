//! # Core Configuration Module
//!
//! Provides configuration management for the Ventus client core.
//!
//! ## Overview
//!
//! A builder assembles a `CoreConfig` holding every platform bridge plus the
//! session tuning knobs. Validation fails fast so a misconfigured host learns
//! about a missing capability at startup rather than mid-session.
//!
//! ## Required Dependencies
//!
//! - `FileSystemAccess` - Sandboxed storage and staging
//! - `PermissionProvider` - Storage / media-index permission
//! - `LocalNetworkProbe` - LAN reachability probe
//! - `SettingsStore` - Persisted client settings
//!
//! ## Optional Dependencies
//!
//! - `MediaLibrary` - Required only for [`StorageModel::SharedMediaIndex`]
//! - `Clock` - Defaults to the system clock
//! - `LoggerSink` - Host log forwarding
//!
//! When the `desktop-shims` feature is enabled, desktop adapters from
//! `bridge-desktop` are injected for any required bridge that is not
//! provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{CoreConfig, StorageModel};
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .storage_model(StorageModel::SharedMediaIndex)
//!     .media_library(Arc::new(MyMediaStore))
//!     .file_system(Arc::new(MyFileSystem))
//!     .permission_provider(Arc::new(MyPermissions))
//!     .network_probe(Arc::new(MyProbe))
//!     .settings_store(Arc::new(MySettings))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{
    Clock, FileSystemAccess, LocalNetworkProbe, LoggerSink, MediaLibrary, PermissionProvider,
    SettingsStore, SystemClock,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Port the desktop companion's FTP server listens on
pub const DEFAULT_SYNC_PORT: u16 = 1234;

/// Sync folder used when neither the host nor the user names one
pub const DEFAULT_FOLDER_NAME: &str = "Ventus";

/// How the platform exposes user-visible storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageModel {
    /// Plain directories inside an app-owned root. `None` uses the
    /// `FileSystemAccess` data directory.
    SandboxedDirectory { root: Option<PathBuf> },
    /// Folders exist only as albums in a shared media index.
    SharedMediaIndex,
}

impl Default for StorageModel {
    fn default() -> Self {
        StorageModel::SandboxedDirectory { root: None }
    }
}

/// Timing and buffering knobs for sync sessions.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Interval between simulated progress ticks
    pub tick_interval: Duration,
    /// Fraction added per tick
    pub progress_step: f64,
    /// Upper bound on the local network probe
    pub probe_timeout: Duration,
    /// Buffered events per event bus subscriber
    pub event_buffer_size: usize,
    /// Sync folder used until the user saves a different one
    pub default_folder_name: String,
    /// Port assumed when a target omits one
    pub default_port: u16,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(100),
            progress_step: 0.01,
            probe_timeout: Duration::from_secs(2),
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
            default_folder_name: DEFAULT_FOLDER_NAME.to_string(),
            default_port: DEFAULT_SYNC_PORT,
        }
    }
}

impl SessionConfig {
    /// Number of ticks needed to reach 1.0 with the configured step.
    pub fn total_ticks(&self) -> u32 {
        (1.0 / self.progress_step).ceil().max(1.0) as u32
    }

    pub fn validate(&self) -> Result<()> {
        if self.tick_interval.is_zero() {
            return Err(Error::Config(
                "Progress tick interval must be greater than zero".to_string(),
            ));
        }

        if !(self.progress_step > 0.0 && self.progress_step <= 1.0) {
            return Err(Error::Config(format!(
                "Progress step must be in (0, 1], got {}",
                self.progress_step
            )));
        }

        if self.probe_timeout.is_zero() || self.probe_timeout > Duration::from_secs(60) {
            return Err(Error::Config(
                "Probe timeout must be between 1ms and 60s".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.default_folder_name.trim().is_empty() {
            return Err(Error::Config(
                "Default folder name cannot be empty".to_string(),
            ));
        }

        if self.default_port == 0 {
            return Err(Error::Config("Default port cannot be 0".to_string()));
        }

        Ok(())
    }
}

/// Core configuration for the Ventus client core.
#[derive(Clone)]
pub struct CoreConfig {
    pub file_system: Arc<dyn FileSystemAccess>,
    pub permission_provider: Arc<dyn PermissionProvider>,
    pub network_probe: Arc<dyn LocalNetworkProbe>,
    pub settings_store: Arc<dyn SettingsStore>,
    pub media_library: Option<Arc<dyn MediaLibrary>>,
    pub clock: Arc<dyn Clock>,
    pub logger_sink: Option<Arc<dyn LoggerSink>>,
    pub storage_model: StorageModel,
    pub session: SessionConfig,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("file_system", &"FileSystemAccess { ... }")
            .field("permission_provider", &"PermissionProvider { ... }")
            .field("network_probe", &"LocalNetworkProbe { ... }")
            .field("settings_store", &"SettingsStore { ... }")
            .field(
                "media_library",
                &self.media_library.as_ref().map(|_| "MediaLibrary { ... }"),
            )
            .field(
                "logger_sink",
                &self.logger_sink.as_ref().map(|_| "LoggerSink { ... }"),
            )
            .field("storage_model", &self.storage_model)
            .field("session", &self.session)
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// A `SharedMediaIndex` model without a `MediaLibrary` is accepted; the
    /// provisioner reports `PlatformUnsupported` for it at call time.
    pub fn validate(&self) -> Result<()> {
        if let StorageModel::SandboxedDirectory { root: Some(root) } = &self.storage_model {
            if root.as_os_str().is_empty() {
                return Err(Error::Config(
                    "Sandboxed storage root cannot be empty".to_string(),
                ));
            }
        }

        self.session.validate()
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn missing(capability: &str, hint: &str) -> Error {
    Error::CapabilityMissing {
        capability: capability.to_string(),
        message: format!(
            "{} implementation is required. \
             Desktop: enable the 'desktop-shims' feature to use the default adapter. \
             Mobile: {}",
            capability, hint
        ),
    }
}

#[cfg(feature = "desktop-shims")]
mod defaults {
    use super::*;
    use bridge_desktop::{
        DesktopPermissionProvider, JsonFileSettingsStore, TcpLocalNetworkProbe, TokioFileSystem,
    };

    pub(super) fn file_system() -> Result<Arc<dyn FileSystemAccess>> {
        Ok(Arc::new(TokioFileSystem::new()))
    }

    pub(super) fn permission_provider() -> Result<Arc<dyn PermissionProvider>> {
        Ok(Arc::new(DesktopPermissionProvider::new()))
    }

    pub(super) fn network_probe() -> Result<Arc<dyn LocalNetworkProbe>> {
        Ok(Arc::new(TcpLocalNetworkProbe::new()))
    }

    pub(super) fn settings_store() -> Result<Arc<dyn SettingsStore>> {
        Ok(Arc::new(JsonFileSettingsStore::new()))
    }
}

#[cfg(not(feature = "desktop-shims"))]
mod defaults {
    use super::*;

    pub(super) fn file_system() -> Result<Arc<dyn FileSystemAccess>> {
        Err(missing(
            "FileSystemAccess",
            "inject the app sandbox file system adapter.",
        ))
    }

    pub(super) fn permission_provider() -> Result<Arc<dyn PermissionProvider>> {
        Err(missing(
            "PermissionProvider",
            "inject the photo library / MediaStore permission adapter.",
        ))
    }

    pub(super) fn network_probe() -> Result<Arc<dyn LocalNetworkProbe>> {
        Err(missing(
            "LocalNetworkProbe",
            "inject a probe that triggers the local network prompt.",
        ))
    }

    pub(super) fn settings_store() -> Result<Arc<dyn SettingsStore>> {
        Err(missing(
            "SettingsStore",
            "inject platform-native settings (UserDefaults/DataStore).",
        ))
    }
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    file_system: Option<Arc<dyn FileSystemAccess>>,
    permission_provider: Option<Arc<dyn PermissionProvider>>,
    network_probe: Option<Arc<dyn LocalNetworkProbe>>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    media_library: Option<Arc<dyn MediaLibrary>>,
    clock: Option<Arc<dyn Clock>>,
    logger_sink: Option<Arc<dyn LoggerSink>>,
    storage_model: Option<StorageModel>,
    session: Option<SessionConfig>,
}

impl CoreConfigBuilder {
    pub fn file_system(mut self, fs: Arc<dyn FileSystemAccess>) -> Self {
        self.file_system = Some(fs);
        self
    }

    pub fn permission_provider(mut self, provider: Arc<dyn PermissionProvider>) -> Self {
        self.permission_provider = Some(provider);
        self
    }

    pub fn network_probe(mut self, probe: Arc<dyn LocalNetworkProbe>) -> Self {
        self.network_probe = Some(probe);
        self
    }

    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    pub fn media_library(mut self, library: Arc<dyn MediaLibrary>) -> Self {
        self.media_library = Some(library);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    pub fn storage_model(mut self, model: StorageModel) -> Self {
        self.storage_model = Some(model);
        self
    }

    /// Shortcut for `StorageModel::SandboxedDirectory` with an explicit root.
    pub fn sandbox_root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.storage_model = Some(StorageModel::SandboxedDirectory {
            root: Some(root.into()),
        });
        self
    }

    pub fn session(mut self, session: SessionConfig) -> Self {
        self.session = Some(session);
        self
    }

    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.session.get_or_insert_with(SessionConfig::default).tick_interval = interval;
        self
    }

    pub fn progress_step(mut self, step: f64) -> Self {
        self.session.get_or_insert_with(SessionConfig::default).progress_step = step;
        self
    }

    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.session.get_or_insert_with(SessionConfig::default).probe_timeout = timeout;
        self
    }

    /// Builds the final `CoreConfig`, filling in platform defaults where the
    /// `desktop-shims` feature allows and failing with
    /// `Error::CapabilityMissing` otherwise.
    pub fn build(self) -> Result<CoreConfig> {
        let file_system = match self.file_system {
            Some(fs) => fs,
            None => defaults::file_system()?,
        };

        let permission_provider = match self.permission_provider {
            Some(provider) => provider,
            None => defaults::permission_provider()?,
        };

        let network_probe = match self.network_probe {
            Some(probe) => probe,
            None => defaults::network_probe()?,
        };

        let settings_store = match self.settings_store {
            Some(store) => store,
            None => defaults::settings_store()?,
        };

        let config = CoreConfig {
            file_system,
            permission_provider,
            network_probe,
            settings_store,
            media_library: self.media_library,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            logger_sink: self.logger_sink,
            storage_model: self.storage_model.unwrap_or_default(),
            session: self.session.unwrap_or_default(),
        };

        config.validate()?;

        Ok(config)
    }
}
