//! # Core Provision
//!
//! Everything that has to happen on the device before a sync session can
//! move files:
//!
//! - [`PermissionGate`] asks the OS for storage and local network access.
//! - [`FolderProvisioner`] makes sure the destination folder exists, either
//!   as a sandboxed directory or as an album in the shared media index.
//!
//! Provisioning of the same folder name is serialized through [`NameLocks`],
//! which callers share between provisioner instances.

pub mod error;
pub mod locks;
pub mod permission;
pub mod provisioner;

pub use error::{
    PermissionCheck, PermissionDenial, PermissionFailure, ProvisionError, Result,
};
pub use locks::{NameGuard, NameLocks};
pub use permission::{PermissionGate, PermissionGrant};
pub use provisioner::{
    provisioner_for, AlbumFolderProvisioner, DirectoryFolderProvisioner, FolderHandle,
    FolderProvisioner, ProvisioningResult, StorageKind, UnsupportedFolderProvisioner,
    MARKER_FILE,
};
