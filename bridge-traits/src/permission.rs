//! Runtime Permission Abstraction

use serde::{Deserialize, Serialize};

use crate::{error::Result, platform::PlatformSendSync};

/// Outcome of a storage permission request or status query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionStatus {
    /// Access granted
    Granted,
    /// The user declined access
    Denied,
    /// Access is blocked by policy (parental controls, MDM) and cannot be requested
    Restricted,
    /// The user has not been asked yet
    Undetermined,
}

impl PermissionStatus {
    pub fn is_granted(self) -> bool {
        matches!(self, PermissionStatus::Granted)
    }
}

/// Storage / media-index permission provider
///
/// # Platform Support
///
/// - **Android**: `READ/WRITE_EXTERNAL_STORAGE` or media permissions
/// - **iOS**: Photo library authorization
/// - **Desktop**: Always granted when the data directory is writable
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait PermissionProvider: PlatformSendSync {
    /// Ask the platform for storage access, prompting the user if needed
    async fn request_storage_access(&self) -> Result<PermissionStatus>;

    /// Report the current storage access status without prompting
    async fn storage_access_status(&self) -> Result<PermissionStatus>;
}
