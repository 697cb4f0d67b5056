//! Storage Permission Implementation

use async_trait::async_trait;
use bridge_traits::{
    error::Result,
    permission::{PermissionProvider, PermissionStatus},
};
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::filesystem::default_data_dir;

/// Desktop permission provider
///
/// Desktop platforms have no runtime storage prompt. Access is reported as
/// granted when the app data directory can be created and written to.
pub struct DesktopPermissionProvider {
    data_dir: PathBuf,
}

impl DesktopPermissionProvider {
    pub fn new() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }

    pub fn with_data_directory(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    async fn check_writable(&self) -> PermissionStatus {
        if let Err(e) = tokio::fs::create_dir_all(&self.data_dir).await {
            warn!(error = %e, "Data directory cannot be created");
            return PermissionStatus::Denied;
        }

        match tokio::fs::metadata(&self.data_dir).await {
            Ok(metadata) if !metadata.permissions().readonly() => PermissionStatus::Granted,
            Ok(_) => PermissionStatus::Denied,
            Err(e) => {
                warn!(error = %e, "Data directory is not accessible");
                PermissionStatus::Denied
            }
        }
    }
}

impl Default for DesktopPermissionProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PermissionProvider for DesktopPermissionProvider {
    async fn request_storage_access(&self) -> Result<PermissionStatus> {
        let status = self.check_writable().await;
        debug!(status = ?status, "Storage access requested");
        Ok(status)
    }

    async fn storage_access_status(&self) -> Result<PermissionStatus> {
        Ok(self.check_writable().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_writable_directory_is_granted() {
        let dir = env::temp_dir().join(format!("ventus-perm-{}", Uuid::new_v4()));
        let provider = DesktopPermissionProvider::with_data_directory(dir.clone());

        assert_eq!(
            provider.request_storage_access().await.unwrap(),
            PermissionStatus::Granted
        );
        assert_eq!(
            provider.storage_access_status().await.unwrap(),
            PermissionStatus::Granted
        );

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
