//! Sandboxed-directory provisioning.
//!
//! A new folder is assembled in a hidden staging sibling and renamed into
//! place once the marker file is written, so an interrupted run never leaves
//! a half-built folder under the real name.

use super::{
    ensure_storage_access, report, validate_folder_name, FolderHandle, FolderProvisioner,
    NameRules, ProvisioningResult, StorageKind, MARKER_FILE, STAGING_PREFIX,
};
use crate::error::{ProvisionError, Result};
use crate::locks::NameLocks;
use async_trait::async_trait;
use bridge_traits::{FileSystemAccess, PermissionProvider};
use bytes::Bytes;
use core_runtime::events::EventBus;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

pub struct DirectoryFolderProvisioner {
    fs: Arc<dyn FileSystemAccess>,
    permissions: Arc<dyn PermissionProvider>,
    root: Option<PathBuf>,
    locks: NameLocks,
    event_bus: Option<EventBus>,
}

impl DirectoryFolderProvisioner {
    /// Folders are created under `root`, or the platform data directory when
    /// `root` is `None`.
    pub fn new(
        fs: Arc<dyn FileSystemAccess>,
        permissions: Arc<dyn PermissionProvider>,
        root: Option<PathBuf>,
        locks: NameLocks,
        event_bus: Option<EventBus>,
    ) -> Self {
        Self {
            fs,
            permissions,
            root,
            locks,
            event_bus,
        }
    }

    async fn root(&self) -> Result<PathBuf> {
        match &self.root {
            Some(root) => Ok(root.clone()),
            None => Ok(self.fs.get_data_directory().await?),
        }
    }

    async fn provision(&self, name: &str) -> Result<ProvisioningResult> {
        let _guard = self.locks.acquire(name).await;
        ensure_storage_access(self.permissions.as_ref()).await?;

        let target = self.root().await?.join(name);
        let parent = target
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| ProvisionError::io(ErrorKind::InvalidInput, "folder has no parent"))?;
        let leaf = leaf_name(&target)?;

        let result = if self.fs.exists(&target).await? {
            self.adopt(&target).await
        } else {
            self.create(&parent, &leaf, &target).await
        };

        if result.is_ok() {
            self.sweep_stale_staging(&parent, &leaf).await;
        }
        result
    }

    /// Take over a folder that is already at `target`.
    async fn adopt(&self, target: &Path) -> Result<ProvisioningResult> {
        let metadata = self.fs.metadata(target).await?;
        if !metadata.is_directory {
            return Err(ProvisionError::io(
                ErrorKind::AlreadyExists,
                format!("{} exists and is not a directory", target.display()),
            ));
        }

        let marker = target.join(MARKER_FILE);
        if self.fs.exists(&marker).await? {
            debug!(path = %target.display(), "Folder already provisioned");
            return Ok(existing(target));
        }

        // A bare empty directory counts as ours to finish.
        let was_empty = self.fs.is_empty_directory(target).await?;
        self.fs.write_file(&marker, Bytes::new()).await?;

        Ok(ProvisioningResult {
            handle: FolderHandle::Directory(target.to_path_buf()),
            created: was_empty,
        })
    }

    async fn create(&self, parent: &Path, leaf: &str, target: &Path) -> Result<ProvisioningResult> {
        self.fs.create_dir_all(parent).await?;

        let staging = parent.join(staging_name(leaf, Uuid::new_v4()));
        let built = self.build_staging(&staging).await;
        let renamed = match built {
            Ok(()) => self.fs.rename(&staging, target).await.map_err(ProvisionError::from),
            Err(e) => Err(e),
        };

        match renamed {
            Ok(()) => {
                info!(path = %target.display(), "Created sync folder");
                Ok(ProvisioningResult {
                    handle: FolderHandle::Directory(target.to_path_buf()),
                    created: true,
                })
            }
            Err(e) => {
                discard(self.fs.as_ref(), &staging).await;
                if self.is_directory(target).await {
                    warn!(path = %target.display(), "Folder appeared while staging; adopting it");
                    self.adopt(target).await.map(|result| ProvisioningResult {
                        created: false,
                        ..result
                    })
                } else {
                    Err(e)
                }
            }
        }
    }

    async fn build_staging(&self, staging: &Path) -> Result<()> {
        self.fs.create_dir_all(staging).await?;
        self.fs
            .write_file(&staging.join(MARKER_FILE), Bytes::new())
            .await?;
        Ok(())
    }

    async fn is_directory(&self, path: &Path) -> bool {
        match self.fs.metadata(path).await {
            Ok(metadata) => metadata.is_directory,
            Err(_) => false,
        }
    }

    /// Remove staging directories abandoned by earlier interrupted runs.
    async fn sweep_stale_staging(&self, parent: &Path, leaf: &str) {
        let entries = match self.fs.list_directory(parent).await {
            Ok(entries) => entries,
            Err(e) => {
                debug!(error = %e, "Could not list parent for staging sweep");
                return;
            }
        };

        for entry in entries {
            let is_stale = entry
                .file_name()
                .and_then(|name| name.to_str())
                .map(|name| is_staging_for(name, leaf))
                .unwrap_or(false);
            if is_stale {
                debug!(path = %entry.display(), "Removing stale staging directory");
                discard(self.fs.as_ref(), &entry).await;
            }
        }
    }
}

#[async_trait]
impl FolderProvisioner for DirectoryFolderProvisioner {
    #[instrument(skip(self))]
    async fn ensure(&self, folder_name: &str) -> Result<ProvisioningResult> {
        let result = match validate_folder_name(folder_name, NameRules::Nested) {
            Ok(name) => self.provision(&name).await,
            Err(e) => Err(e),
        };
        report(
            self.event_bus.as_ref(),
            folder_name,
            StorageKind::Directory,
            result,
        )
    }

    async fn locate(&self, folder_name: &str) -> Result<Option<FolderHandle>> {
        let name = validate_folder_name(folder_name, NameRules::Nested)?;
        let target = self.root().await?.join(name);
        if self.is_directory(&target).await {
            Ok(Some(FolderHandle::Directory(target)))
        } else {
            Ok(None)
        }
    }

    fn storage_kind(&self) -> StorageKind {
        StorageKind::Directory
    }
}

fn existing(target: &Path) -> ProvisioningResult {
    ProvisioningResult {
        handle: FolderHandle::Directory(target.to_path_buf()),
        created: false,
    }
}

fn leaf_name(target: &Path) -> Result<String> {
    target
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| ProvisionError::io(ErrorKind::InvalidInput, "folder name is not valid UTF-8"))
}

pub(crate) fn staging_name(leaf: &str, id: Uuid) -> String {
    format!("{}-{}-{}", STAGING_PREFIX, leaf, id)
}

fn is_staging_for(entry: &str, leaf: &str) -> bool {
    let prefix = format!("{}-{}-", STAGING_PREFIX, leaf);
    entry
        .strip_prefix(&prefix)
        .map(|suffix| Uuid::parse_str(suffix).is_ok())
        .unwrap_or(false)
}

async fn discard(fs: &dyn FileSystemAccess, path: &Path) {
    if let Err(e) = fs.delete_dir_all(path).await {
        debug!(path = %path.display(), error = %e, "Could not remove staging directory");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staging_names_round_trip() {
        let id = Uuid::new_v4();
        let name = staging_name("Ventus", id);
        assert!(name.starts_with(".ventus-staging-Ventus-"));
        assert!(is_staging_for(&name, "Ventus"));
    }

    #[test]
    fn unrelated_entries_are_not_staging() {
        assert!(!is_staging_for("Ventus", "Ventus"));
        assert!(!is_staging_for(".ventus-staging-Ventus-notes", "Ventus"));
        assert!(!is_staging_for(
            &staging_name("Camera", Uuid::new_v4()),
            "Ventus"
        ));
        // Leaf names may themselves contain dashes.
        assert!(is_staging_for(
            &staging_name("my-sync", Uuid::new_v4()),
            "my-sync"
        ));
    }
}
