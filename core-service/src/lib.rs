//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (filesystem,
//! permissions, local network probe, settings, media index) into the shared
//! Rust core and owns the process-wide pieces: the credential store, the
//! progress tracker, and the session coordinator. Desktop apps typically
//! enable the `desktop-shims` feature (which depends on `bridge-desktop`);
//! mobile hosts build a [`CoreConfig`] with their own bridges.

pub mod error;
pub mod settings;

pub use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
pub use error::{CoreError, Result};
pub use settings::{ClientSettings, SettingsManager};

use std::sync::Arc;

use bridge_traits::{
    Clock, FileSystemAccess, LocalNetworkProbe, LoggerSink, MediaLibrary, PermissionProvider,
    SettingsStore,
};
use core_auth::{ConnectionTarget, CredentialStore};
use core_provision::{provisioner_for, FolderProvisioner, NameLocks, PermissionGate};
use core_runtime::config::{CoreConfig, SessionConfig};
use core_runtime::events::{EventBus, EventStream};
use core_sync::{ProgressSource, SessionHandle, SyncSessionCoordinator, TimerProgressTracker};
use tracing::info;

/// Aggregated handle to all bridge dependencies the core requires.
pub struct CoreDependencies {
    pub filesystem: Arc<dyn FileSystemAccess>,
    pub permission_provider: Arc<dyn PermissionProvider>,
    pub network_probe: Arc<dyn LocalNetworkProbe>,
    pub settings_store: Arc<dyn SettingsStore>,
    pub media_library: Option<Arc<dyn MediaLibrary>>,
    pub clock: Arc<dyn Clock>,
    pub logger_sink: Option<Arc<dyn LoggerSink>>,
}

impl From<&CoreConfig> for CoreDependencies {
    fn from(config: &CoreConfig) -> Self {
        Self {
            filesystem: Arc::clone(&config.file_system),
            permission_provider: Arc::clone(&config.permission_provider),
            network_probe: Arc::clone(&config.network_probe),
            settings_store: Arc::clone(&config.settings_store),
            media_library: config.media_library.clone(),
            clock: Arc::clone(&config.clock),
            logger_sink: config.logger_sink.clone(),
        }
    }
}

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct VentusCore {
    deps: Arc<CoreDependencies>,
    session_config: SessionConfig,
    event_bus: EventBus,
    credentials: Arc<CredentialStore>,
    provisioner: Arc<dyn FolderProvisioner>,
    coordinator: SyncSessionCoordinator,
    settings: SettingsManager,
}

impl VentusCore {
    /// Build the core with the default fixed-rate progress tracker.
    pub fn new(config: CoreConfig) -> Result<Self> {
        let tracker = Arc::new(TimerProgressTracker::from_config(&config.session));
        Self::with_progress_source(config, tracker)
    }

    /// Build the core around a caller-supplied progress source, such as a
    /// `FeedProgressTracker` driven by a transfer engine.
    pub fn with_progress_source(
        config: CoreConfig,
        tracker: Arc<dyn ProgressSource>,
    ) -> Result<Self> {
        config.validate()?;

        let event_bus = EventBus::new(config.session.event_buffer_size);
        let credentials = Arc::new(CredentialStore::with_event_bus(event_bus.clone()));
        let gate = Arc::new(PermissionGate::new(
            Arc::clone(&config.permission_provider),
            Arc::clone(&config.network_probe),
            config.session.probe_timeout,
        ));
        let provisioner = provisioner_for(&config, NameLocks::new(), Some(event_bus.clone()));
        let coordinator = SyncSessionCoordinator::new(
            Arc::clone(&credentials),
            gate,
            Arc::clone(&provisioner),
            tracker,
            Arc::clone(&config.clock),
        )
        .with_event_bus(event_bus.clone());

        info!(
            storage = provisioner.storage_kind().as_str(),
            "Ventus core initialized"
        );

        Ok(Self {
            deps: Arc::new(CoreDependencies::from(&config)),
            settings: SettingsManager::with_defaults(
                Arc::clone(&config.settings_store),
                ClientSettings {
                    target_folder: config.session.default_folder_name.clone(),
                    ..ClientSettings::default()
                },
            ),
            session_config: config.session,
            event_bus,
            credentials,
            provisioner,
            coordinator,
        })
    }

    /// Access the bridge dependencies being used by the service.
    pub fn dependencies(&self) -> Arc<CoreDependencies> {
        Arc::clone(&self.deps)
    }

    pub fn credentials(&self) -> Arc<CredentialStore> {
        Arc::clone(&self.credentials)
    }

    pub fn provisioner(&self) -> Arc<dyn FolderProvisioner> {
        Arc::clone(&self.provisioner)
    }

    pub fn settings(&self) -> &SettingsManager {
        &self.settings
    }

    /// Logging setup that forwards to the configured host `LoggerSink`.
    ///
    /// ```ignore
    /// core_service::init_logging(core.logging_config())?;
    /// ```
    pub fn logging_config(&self) -> LoggingConfig {
        let config = LoggingConfig::default();
        match &self.deps.logger_sink {
            Some(sink) => config.with_logger_sink(Arc::clone(sink)),
            None => config,
        }
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn subscribe_events(&self) -> EventStream {
        EventStream::new(self.event_bus.subscribe())
    }

    pub fn is_session_active(&self) -> bool {
        self.coordinator.is_session_active()
    }

    /// Parse a manually typed address, applying the configured default port.
    pub fn parse_target(&self, input: &str) -> Result<ConnectionTarget> {
        Ok(ConnectionTarget::parse_with_default_port(
            input,
            self.session_config.default_port,
        )?)
    }

    /// Start a session into `folder_name`.
    pub fn begin_session(
        &self,
        target: ConnectionTarget,
        folder_name: &str,
    ) -> Result<SessionHandle> {
        Ok(self.coordinator.begin_session(target, folder_name)?)
    }

    /// Start a session to a typed address, syncing into the saved target folder.
    pub async fn connect_manual(&self, input: &str) -> Result<SessionHandle> {
        let target = self.parse_target(input)?;
        self.begin_with_saved_folder(target).await
    }

    /// Start a session from a scanned QR payload.
    pub async fn connect_scanned(&self, code: &str) -> Result<SessionHandle> {
        let target = self.parse_target(code)?;
        self.begin_with_saved_folder(target).await
    }

    /// Cancel any running session, reset progress, and clear credentials.
    pub fn disconnect(&self) {
        self.coordinator.disconnect();
    }

    async fn begin_with_saved_folder(&self, target: ConnectionTarget) -> Result<SessionHandle> {
        let folder = self.settings.load().await?.target_folder;
        self.begin_session(target, &folder)
    }
}

/// Build a core from the desktop adapters.
///
/// ```no_run
/// # async fn example() -> core_service::Result<()> {
/// let core = core_service::bootstrap_desktop()?;
/// let mut session = core.connect_manual("192.168.1.20").await?;
/// while let Some(event) = session.next_event().await {
///     println!("{event:?}");
/// }
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "desktop-shims")]
pub fn bootstrap_desktop() -> Result<VentusCore> {
    VentusCore::new(CoreConfig::builder().build()?)
}

/// Build a desktop core whose data, settings and sync folders all live under
/// `data_dir`.
#[cfg(feature = "desktop-shims")]
pub fn bootstrap_desktop_in(data_dir: impl Into<std::path::PathBuf>) -> Result<VentusCore> {
    use bridge_desktop::{
        DesktopPermissionProvider, JsonFileSettingsStore, TcpLocalNetworkProbe, TokioFileSystem,
    };

    let data_dir = data_dir.into();
    let config = CoreConfig::builder()
        .file_system(Arc::new(TokioFileSystem::with_data_directory(
            data_dir.clone(),
        )))
        .permission_provider(Arc::new(DesktopPermissionProvider::with_data_directory(
            data_dir.clone(),
        )))
        .network_probe(Arc::new(TcpLocalNetworkProbe::new()))
        .settings_store(Arc::new(JsonFileSettingsStore::with_path(
            data_dir.join("settings.json"),
        )))
        .sandbox_root(data_dir)
        .build()?;
    VentusCore::new(config)
}
