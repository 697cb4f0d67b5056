//! Shared-media-index provisioning.
//!
//! An album can only exist with at least one asset in it, so a new album is
//! seeded with the marker file: write the marker to a staging path, import
//! it, create the album around it, then drop the staging copy.

use super::{
    ensure_storage_access, report, validate_folder_name, FolderHandle, FolderProvisioner,
    NameRules, ProvisioningResult, StorageKind, MARKER_FILE, STAGING_PREFIX,
};
use crate::error::Result;
use crate::locks::NameLocks;
use async_trait::async_trait;
use bridge_traits::{AlbumInfo, FileSystemAccess, MediaLibrary, PermissionProvider};
use bytes::Bytes;
use core_runtime::events::EventBus;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub struct AlbumFolderProvisioner {
    library: Arc<dyn MediaLibrary>,
    fs: Arc<dyn FileSystemAccess>,
    permissions: Arc<dyn PermissionProvider>,
    locks: NameLocks,
    event_bus: Option<EventBus>,
}

impl AlbumFolderProvisioner {
    pub fn new(
        library: Arc<dyn MediaLibrary>,
        fs: Arc<dyn FileSystemAccess>,
        permissions: Arc<dyn PermissionProvider>,
        locks: NameLocks,
        event_bus: Option<EventBus>,
    ) -> Self {
        Self {
            library,
            fs,
            permissions,
            locks,
            event_bus,
        }
    }

    async fn staging_dir(&self, name: &str) -> Result<PathBuf> {
        Ok(self
            .fs
            .get_data_directory()
            .await?
            .join(STAGING_PREFIX)
            .join(name))
    }

    async fn provision(&self, name: &str) -> Result<ProvisioningResult> {
        let _guard = self.locks.acquire(name).await;
        ensure_storage_access(self.permissions.as_ref()).await?;

        let staging = self.staging_dir(name).await?;

        if let Some(album) = self.library.find_album(name).await? {
            debug!(album_id = %album.id, "Album already exists");
            self.discard(&staging).await;
            return Ok(ProvisioningResult {
                handle: handle(album),
                created: false,
            });
        }

        // Leftover marker from an interrupted run.
        self.discard(&staging).await;

        let result = self.seed_album(name, &staging).await;
        self.discard(&staging).await;

        let album = result?;
        info!(album_id = %album.id, "Created sync album");
        Ok(ProvisioningResult {
            handle: handle(album),
            created: true,
        })
    }

    async fn seed_album(&self, name: &str, staging: &Path) -> Result<AlbumInfo> {
        self.fs.create_dir_all(staging).await?;
        let marker = staging.join(MARKER_FILE);
        self.fs.write_file(&marker, Bytes::new()).await?;

        let asset = self.library.create_asset(&marker).await?;
        match self.library.create_album(name, &asset).await {
            Ok(album) => Ok(album),
            Err(e) => {
                if let Err(cleanup) = self.library.delete_asset(&asset).await {
                    warn!(asset = %asset, error = %cleanup, "Could not remove orphaned marker asset");
                }
                Err(e.into())
            }
        }
    }

    async fn discard(&self, staging: &Path) {
        match self.fs.exists(staging).await {
            Ok(true) => {
                if let Err(e) = self.fs.delete_dir_all(staging).await {
                    debug!(path = %staging.display(), error = %e, "Could not remove album staging");
                }
            }
            Ok(false) => {}
            Err(e) => debug!(error = %e, "Could not inspect album staging"),
        }
    }
}

fn handle(album: AlbumInfo) -> FolderHandle {
    FolderHandle::Album {
        id: album.id,
        title: album.title,
    }
}

#[async_trait]
impl FolderProvisioner for AlbumFolderProvisioner {
    #[instrument(skip(self))]
    async fn ensure(&self, folder_name: &str) -> Result<ProvisioningResult> {
        let result = match validate_folder_name(folder_name, NameRules::SingleSegment) {
            Ok(name) => self.provision(&name).await,
            Err(e) => Err(e),
        };
        report(self.event_bus.as_ref(), folder_name, StorageKind::Album, result)
    }

    async fn locate(&self, folder_name: &str) -> Result<Option<FolderHandle>> {
        let name = validate_folder_name(folder_name, NameRules::SingleSegment)?;
        Ok(self.library.find_album(&name).await?.map(handle))
    }

    fn storage_kind(&self) -> StorageKind {
        StorageKind::Album
    }
}
