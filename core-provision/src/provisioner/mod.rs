//! # Folder Provisioning
//!
//! Idempotently brings a named sync folder into existence.
//!
//! ## Overview
//!
//! Platforms expose user-visible storage in one of two ways, and each gets
//! its own [`FolderProvisioner`]:
//!
//! | Storage model | Provisioner | Folder is... |
//! |---------------|-------------|--------------|
//! | Sandboxed directory | [`DirectoryFolderProvisioner`] | a directory holding the marker file |
//! | Shared media index | [`AlbumFolderProvisioner`] | an album seeded with the marker asset |
//!
//! Both variants:
//! - validate the folder name,
//! - re-check storage permission without prompting,
//! - serialize concurrent calls for the same name,
//! - leave the folder with a zero-byte [`MARKER_FILE`] so media scanners skip it,
//! - report `created = true` only to the call that finished provisioning.
//!
//! The variant is chosen once, from the configured [`StorageModel`], by
//! [`provisioner_for`].

mod album;
mod directory;

pub use album::AlbumFolderProvisioner;
pub use directory::DirectoryFolderProvisioner;

use crate::error::{ProvisionError, Result};
use crate::locks::NameLocks;
use async_trait::async_trait;
use bridge_traits::PermissionProvider;
use core_runtime::config::{CoreConfig, StorageModel};
use core_runtime::events::{CoreEvent, EventBus, ProvisioningEvent};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Zero-byte file that tells media scanners to skip a folder
pub const MARKER_FILE: &str = ".nomedia";

/// Prefix of hidden staging artifacts left while a folder is assembled
pub(crate) const STAGING_PREFIX: &str = ".ventus-staging";

/// Where a provisioned folder lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderHandle {
    Directory(PathBuf),
    Album { id: String, title: String },
}

impl fmt::Display for FolderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FolderHandle::Directory(path) => write!(f, "{}", path.display()),
            FolderHandle::Album { title, .. } => write!(f, "album '{}'", title),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningResult {
    pub handle: FolderHandle,
    /// True only for the call that finished provisioning the folder
    pub created: bool,
}

/// Storage model a provisioner implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Directory,
    Album,
    Unsupported,
}

impl StorageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKind::Directory => "directory",
            StorageKind::Album => "album",
            StorageKind::Unsupported => "unsupported",
        }
    }
}

#[async_trait]
pub trait FolderProvisioner: Send + Sync {
    /// Make sure `folder_name` exists and is ready to receive files.
    async fn ensure(&self, folder_name: &str) -> Result<ProvisioningResult>;

    /// Find an already provisioned folder without creating anything.
    async fn locate(&self, folder_name: &str) -> Result<Option<FolderHandle>>;

    fn storage_kind(&self) -> StorageKind;
}

/// Build the provisioner matching the configured storage model.
pub fn provisioner_for(
    config: &CoreConfig,
    locks: NameLocks,
    event_bus: Option<EventBus>,
) -> Arc<dyn FolderProvisioner> {
    match (&config.storage_model, &config.media_library) {
        (StorageModel::SandboxedDirectory { root }, _) => Arc::new(DirectoryFolderProvisioner::new(
            config.file_system.clone(),
            config.permission_provider.clone(),
            root.clone(),
            locks,
            event_bus,
        )),
        (StorageModel::SharedMediaIndex, Some(library)) => Arc::new(AlbumFolderProvisioner::new(
            library.clone(),
            config.file_system.clone(),
            config.permission_provider.clone(),
            locks,
            event_bus,
        )),
        (StorageModel::SharedMediaIndex, None) => {
            warn!("Shared media index configured without a MediaLibrary bridge");
            Arc::new(UnsupportedFolderProvisioner::new(
                "no media library is available to create albums in",
            ))
        }
    }
}

/// Provisioner for platforms that cannot create folders at all.
#[derive(Debug, Clone)]
pub struct UnsupportedFolderProvisioner {
    reason: String,
}

impl UnsupportedFolderProvisioner {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl FolderProvisioner for UnsupportedFolderProvisioner {
    async fn ensure(&self, folder_name: &str) -> Result<ProvisioningResult> {
        validate_folder_name(folder_name, NameRules::Nested)?;
        Err(ProvisionError::PlatformUnsupported(self.reason.clone()))
    }

    async fn locate(&self, _folder_name: &str) -> Result<Option<FolderHandle>> {
        Err(ProvisionError::PlatformUnsupported(self.reason.clone()))
    }

    fn storage_kind(&self) -> StorageKind {
        StorageKind::Unsupported
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NameRules {
    /// Relative path; intermediate directories allowed
    Nested,
    /// A single name with no separators
    SingleSegment,
}

/// Normalize and validate a user-supplied folder name.
///
/// Nested names may use `\` or `/` between segments; the result always
/// uses `/`.
pub(crate) fn validate_folder_name(name: &str, rules: NameRules) -> Result<String> {
    let invalid = |reason: &str| ProvisionError::InvalidFolderName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = name.trim().trim_end_matches(['/', '\\']);
    if trimmed.is_empty() {
        return Err(invalid("folder name cannot be empty"));
    }
    if trimmed.contains('\0') {
        return Err(invalid("folder name cannot contain NUL"));
    }

    let has_separator = trimmed.contains(['/', '\\']);
    if rules == NameRules::SingleSegment && has_separator {
        return Err(invalid("album names cannot contain path separators"));
    }

    if trimmed.starts_with(['/', '\\']) {
        return Err(invalid("folder name must be relative"));
    }
    let normalized = trimmed.replace('\\', "/");
    let path = Path::new(&normalized);
    if path.is_absolute() {
        return Err(invalid("folder name must be relative"));
    }

    for segment in normalized.split('/') {
        if segment.trim().is_empty() {
            return Err(invalid("folder name contains an empty segment"));
        }
        // `Path::components` drops interior `.` segments, so check them here.
        if segment == "." || segment == ".." {
            return Err(invalid("'.' and '..' are not allowed"));
        }
    }

    for component in path.components() {
        match component {
            Component::Normal(_) => {}
            Component::CurDir | Component::ParentDir => {
                return Err(invalid("'.' and '..' are not allowed"))
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(invalid("folder name must be relative"))
            }
        }
    }

    if normalized.starts_with(STAGING_PREFIX) {
        return Err(invalid("name is reserved"));
    }

    Ok(normalized)
}

/// Common tail of every `ensure`: log, publish, and pass the result through.
pub(crate) fn report(
    event_bus: Option<&EventBus>,
    folder: &str,
    kind: StorageKind,
    result: Result<ProvisioningResult>,
) -> Result<ProvisioningResult> {
    let event = match &result {
        Ok(outcome) => {
            info!(
                folder,
                storage = kind.as_str(),
                created = outcome.created,
                "Sync folder ready"
            );
            ProvisioningEvent::Provisioned {
                folder: folder.to_string(),
                storage: kind.as_str().to_string(),
                created: outcome.created,
            }
        }
        Err(e) => {
            warn!(folder, storage = kind.as_str(), error = %e, "Sync folder provisioning failed");
            ProvisioningEvent::Failed {
                folder: folder.to_string(),
                message: e.to_string(),
            }
        }
    };

    if let Some(bus) = event_bus {
        bus.emit(CoreEvent::Provisioning(event)).ok();
    }
    result
}

/// Non-prompting permission re-check shared by both variants.
pub(crate) async fn ensure_storage_access(permissions: &dyn PermissionProvider) -> Result<()> {
    let status = permissions.storage_access_status().await?;
    if status.is_granted() {
        Ok(())
    } else {
        Err(ProvisionError::PermissionDenied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_and_nested_names() {
        assert_eq!(
            validate_folder_name(" Ventus ", NameRules::Nested).unwrap(),
            "Ventus"
        );
        assert_eq!(
            validate_folder_name("Phone/Downloads/Ventus/", NameRules::Nested).unwrap(),
            "Phone/Downloads/Ventus"
        );
        assert_eq!(
            validate_folder_name("Ventus", NameRules::SingleSegment).unwrap(),
            "Ventus"
        );
    }

    #[test]
    fn rejects_bad_names() {
        for name in ["", "   ", "/", "/abs", "a/../b", "./a", "a//b", ".ventus-staging-x"] {
            assert!(
                matches!(
                    validate_folder_name(name, NameRules::Nested),
                    Err(ProvisionError::InvalidFolderName { .. })
                ),
                "expected {name:?} to be rejected"
            );
        }
    }

    #[test]
    fn backslashes_separate_nested_segments() {
        assert_eq!(
            validate_folder_name("Phone\\Downloads\\Ventus", NameRules::Nested).unwrap(),
            "Phone/Downloads/Ventus"
        );
        assert_eq!(
            validate_folder_name("Phone\\Ventus\\", NameRules::Nested).unwrap(),
            "Phone/Ventus"
        );
        for name in ["a\\..\\b", "a\\\\b", "\\abs", "a/.\\b"] {
            assert!(
                validate_folder_name(name, NameRules::Nested).is_err(),
                "expected {name:?} to be rejected"
            );
        }
        assert!(validate_folder_name("Phone\\Ventus", NameRules::SingleSegment).is_err());
    }

    #[test]
    fn album_names_are_single_segment() {
        let err = validate_folder_name("Phone/Ventus", NameRules::SingleSegment).unwrap_err();
        assert!(err.to_string().contains("path separators"));
    }

    #[tokio::test]
    async fn unsupported_provisioner_reports_platform() {
        let provisioner = UnsupportedFolderProvisioner::new("iOS cannot create Downloads folders");

        let err = provisioner.ensure("Ventus").await.unwrap_err();
        assert_eq!(
            err,
            ProvisionError::PlatformUnsupported("iOS cannot create Downloads folders".into())
        );
        assert!(matches!(
            provisioner.ensure("").await,
            Err(ProvisionError::InvalidFolderName { .. })
        ));
        assert_eq!(provisioner.storage_kind(), StorageKind::Unsupported);
    }

    #[tokio::test]
    async fn report_publishes_outcome() {
        let bus = EventBus::new(4);
        let mut events = bus.subscribe();

        let ok = report(
            Some(&bus),
            "Ventus",
            StorageKind::Directory,
            Ok(ProvisioningResult {
                handle: FolderHandle::Directory(PathBuf::from("/data/Ventus")),
                created: true,
            }),
        );
        assert!(ok.unwrap().created);

        let failed = report(
            Some(&bus),
            "Ventus",
            StorageKind::Album,
            Err(ProvisionError::PermissionDenied),
        );
        assert!(failed.is_err());

        assert_eq!(
            events.recv().await.unwrap(),
            CoreEvent::Provisioning(ProvisioningEvent::Provisioned {
                folder: "Ventus".into(),
                storage: "directory".into(),
                created: true,
            })
        );
        assert!(matches!(
            events.recv().await.unwrap(),
            CoreEvent::Provisioning(ProvisioningEvent::Failed { .. })
        ));
    }
}
