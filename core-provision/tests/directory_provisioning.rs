//! Integration tests for sandboxed-directory provisioning
//!
//! These run against the real Tokio file system in a scratch directory and
//! cover:
//! - First and repeated `ensure` calls
//! - Concurrent `ensure` calls for the same name
//! - Recovery from interrupted runs
//! - Permission and name validation failures

use async_trait::async_trait;
use bridge_desktop::TokioFileSystem;
use bridge_traits::{error::Result as BridgeResult, PermissionProvider, PermissionStatus};
use core_provision::{
    DirectoryFolderProvisioner, FolderHandle, FolderProvisioner, NameLocks, ProvisionError,
    StorageKind, MARKER_FILE,
};
use core_runtime::events::{CoreEvent, EventBus, ProvisioningEvent};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// ============================================================================
// Helpers
// ============================================================================

struct FixedPermissions(PermissionStatus);

#[async_trait]
impl PermissionProvider for FixedPermissions {
    async fn request_storage_access(&self) -> BridgeResult<PermissionStatus> {
        Ok(self.0)
    }

    async fn storage_access_status(&self) -> BridgeResult<PermissionStatus> {
        Ok(self.0)
    }
}

fn scratch() -> PathBuf {
    env::temp_dir().join(format!("ventus-provision-{}", uuid::Uuid::new_v4()))
}

fn provisioner_in(root: &Path, status: PermissionStatus) -> DirectoryFolderProvisioner {
    DirectoryFolderProvisioner::new(
        Arc::new(TokioFileSystem::with_data_directory(root.to_path_buf())),
        Arc::new(FixedPermissions(status)),
        Some(root.to_path_buf()),
        NameLocks::new(),
        None,
    )
}

fn staging_leftovers(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.file_name().to_string_lossy().into_owned())
                .filter(|name| name.starts_with(".ventus-staging"))
                .collect()
        })
        .unwrap_or_default()
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_first_ensure_creates_then_reuses() {
    let root = scratch();
    let provisioner = provisioner_in(&root, PermissionStatus::Granted);

    let first = provisioner.ensure("Ventus").await.unwrap();
    assert!(first.created);
    assert_eq!(first.handle, FolderHandle::Directory(root.join("Ventus")));

    let marker = root.join("Ventus").join(MARKER_FILE);
    assert!(marker.is_file());
    assert_eq!(std::fs::metadata(&marker).unwrap().len(), 0);

    let second = provisioner.ensure("Ventus").await.unwrap();
    assert!(!second.created);
    assert_eq!(second.handle, first.handle);

    assert!(staging_leftovers(&root).is_empty());
    assert_eq!(provisioner.storage_kind(), StorageKind::Directory);

    std::fs::remove_dir_all(&root).ok();
}

#[tokio::test]
async fn test_nested_folder_creates_parents() {
    let root = scratch();
    let provisioner = provisioner_in(&root, PermissionStatus::Granted);

    let result = provisioner.ensure("Phone/Downloads/Ventus/").await.unwrap();
    assert!(result.created);
    assert!(root.join("Phone/Downloads/Ventus").join(MARKER_FILE).is_file());

    std::fs::remove_dir_all(&root).ok();
}

#[tokio::test]
async fn test_backslash_names_nest_like_slashes() {
    let root = scratch();
    let provisioner = provisioner_in(&root, PermissionStatus::Granted);

    let first = provisioner.ensure("Phone\\Ventus").await.unwrap();
    assert!(first.created);
    assert_eq!(first.handle, FolderHandle::Directory(root.join("Phone").join("Ventus")));
    assert!(root.join("Phone").join("Ventus").join(MARKER_FILE).is_file());

    // Same folder whichever separator is used.
    let second = provisioner.ensure("Phone/Ventus").await.unwrap();
    assert!(!second.created);
    assert_eq!(second.handle, first.handle);

    std::fs::remove_dir_all(&root).ok();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_ensures_create_once() {
    let root = scratch();
    let provisioner = Arc::new(provisioner_in(&root, PermissionStatus::Granted));

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let provisioner = provisioner.clone();
        tasks.push(tokio::spawn(async move { provisioner.ensure("Ventus").await }));
    }

    let mut created = 0;
    for task in tasks {
        if task.await.unwrap().unwrap().created {
            created += 1;
        }
    }

    assert_eq!(created, 1);
    assert!(root.join("Ventus").join(MARKER_FILE).is_file());
    assert!(staging_leftovers(&root).is_empty());

    std::fs::remove_dir_all(&root).ok();
}

#[tokio::test]
async fn test_separate_provisioners_sharing_locks_create_once() {
    let root = scratch();
    let locks = NameLocks::new();
    let make = || {
        Arc::new(DirectoryFolderProvisioner::new(
            Arc::new(TokioFileSystem::with_data_directory(root.clone())),
            Arc::new(FixedPermissions(PermissionStatus::Granted)),
            Some(root.clone()),
            locks.clone(),
            None,
        ))
    };
    let (a, b) = (make(), make());

    let (first, second) = tokio::join!(a.ensure("Ventus"), b.ensure("Ventus"));
    let created = [first.unwrap().created, second.unwrap().created];
    assert_eq!(created.iter().filter(|c| **c).count(), 1);

    std::fs::remove_dir_all(&root).ok();
}

#[tokio::test]
async fn test_stale_staging_is_swept() {
    let root = scratch();
    let stale = root.join(format!(".ventus-staging-Ventus-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&stale).unwrap();
    std::fs::write(stale.join(MARKER_FILE), b"").unwrap();
    // Not ours: suffix is not a UUID
    let foreign = root.join(".ventus-staging-Ventus-keep");
    std::fs::create_dir_all(&foreign).unwrap();

    let provisioner = provisioner_in(&root, PermissionStatus::Granted);
    assert!(provisioner.ensure("Ventus").await.unwrap().created);

    assert!(!stale.exists());
    assert!(foreign.exists());

    std::fs::remove_dir_all(&root).ok();
}

#[tokio::test]
async fn test_existing_empty_directory_is_finished() {
    let root = scratch();
    std::fs::create_dir_all(root.join("Ventus")).unwrap();

    let provisioner = provisioner_in(&root, PermissionStatus::Granted);
    let result = provisioner.ensure("Ventus").await.unwrap();

    assert!(result.created);
    assert!(root.join("Ventus").join(MARKER_FILE).is_file());

    std::fs::remove_dir_all(&root).ok();
}

#[tokio::test]
async fn test_existing_user_directory_is_adopted() {
    let root = scratch();
    std::fs::create_dir_all(root.join("Ventus")).unwrap();
    std::fs::write(root.join("Ventus").join("photo.jpg"), b"jpeg").unwrap();

    let provisioner = provisioner_in(&root, PermissionStatus::Granted);
    let result = provisioner.ensure("Ventus").await.unwrap();

    assert!(!result.created);
    assert!(root.join("Ventus").join(MARKER_FILE).is_file());
    assert!(root.join("Ventus").join("photo.jpg").is_file());

    std::fs::remove_dir_all(&root).ok();
}

#[tokio::test]
async fn test_file_in_the_way_is_an_io_error() {
    let root = scratch();
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(root.join("Ventus"), b"not a folder").unwrap();

    let provisioner = provisioner_in(&root, PermissionStatus::Granted);
    let err = provisioner.ensure("Ventus").await.unwrap_err();

    assert!(matches!(
        err,
        ProvisionError::Io {
            kind: std::io::ErrorKind::AlreadyExists,
            ..
        }
    ));
    assert!(staging_leftovers(&root).is_empty());

    std::fs::remove_dir_all(&root).ok();
}

#[tokio::test]
async fn test_permission_denied_touches_nothing() {
    let root = scratch();
    let provisioner = provisioner_in(&root, PermissionStatus::Denied);

    let err = provisioner.ensure("Ventus").await.unwrap_err();
    assert_eq!(err, ProvisionError::PermissionDenied);
    assert!(!root.join("Ventus").exists());

    std::fs::remove_dir_all(&root).ok();
}

#[tokio::test]
async fn test_invalid_names_are_rejected() {
    let root = scratch();
    let provisioner = provisioner_in(&root, PermissionStatus::Granted);

    for name in ["", "  ", "../escape", "/etc"] {
        let err = provisioner.ensure(name).await.unwrap_err();
        assert!(
            matches!(err, ProvisionError::InvalidFolderName { .. }),
            "{name:?} should be rejected"
        );
    }

    std::fs::remove_dir_all(&root).ok();
}

#[tokio::test]
async fn test_locate_does_not_create() {
    let root = scratch();
    let provisioner = provisioner_in(&root, PermissionStatus::Granted);

    assert_eq!(provisioner.locate("Ventus").await.unwrap(), None);
    assert!(!root.join("Ventus").exists());

    provisioner.ensure("Ventus").await.unwrap();
    assert_eq!(
        provisioner.locate("Ventus").await.unwrap(),
        Some(FolderHandle::Directory(root.join("Ventus")))
    );

    std::fs::remove_dir_all(&root).ok();
}

#[tokio::test]
async fn test_outcomes_are_published() {
    let root = scratch();
    let bus = EventBus::new(8);
    let mut events = bus.subscribe();
    let provisioner = DirectoryFolderProvisioner::new(
        Arc::new(TokioFileSystem::with_data_directory(root.clone())),
        Arc::new(FixedPermissions(PermissionStatus::Granted)),
        Some(root.clone()),
        NameLocks::new(),
        Some(bus),
    );

    provisioner.ensure("Ventus").await.unwrap();
    provisioner.ensure("").await.unwrap_err();

    assert_eq!(
        events.recv().await.unwrap(),
        CoreEvent::Provisioning(ProvisioningEvent::Provisioned {
            folder: "Ventus".to_string(),
            storage: "directory".to_string(),
            created: true,
        })
    );
    assert!(matches!(
        events.recv().await.unwrap(),
        CoreEvent::Provisioning(ProvisioningEvent::Failed { .. })
    ));

    std::fs::remove_dir_all(&root).ok();
}
