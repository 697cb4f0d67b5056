//! Storage and File System Abstractions
//!
//! Provides platform-agnostic traits for file I/O in the app's sandbox and
//! key-value settings storage.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// File metadata information
#[derive(Debug, Clone)]
pub struct FileMetadata {
    pub size: u64,
    pub created_at: Option<i64>,
    pub modified_at: Option<i64>,
    pub is_directory: bool,
}

/// File system access trait
///
/// Abstracts file I/O operations to support different platforms:
/// - Desktop: Direct filesystem access
/// - iOS: The app's sandboxed document directory
/// - Android: App-specific storage used for staging before media indexing
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::FileSystemAccess;
///
/// async fn write_marker(fs: &dyn FileSystemAccess, dir: &Path) -> Result<()> {
///     fs.create_dir_all(dir).await?;
///     fs.write_file(&dir.join(".nomedia"), Bytes::new()).await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait FileSystemAccess: Send + Sync {
    /// Get the application's data directory
    ///
    /// This directory is suitable for persistent application data and is the
    /// default root for sandboxed sync folders.
    async fn get_data_directory(&self) -> Result<PathBuf>;

    /// Check if a file or directory exists
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Get metadata for a file or directory
    async fn metadata(&self, path: &Path) -> Result<FileMetadata>;

    /// Create a directory and all parent directories if they don't exist
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Read entire file contents into memory
    async fn read_file(&self, path: &Path) -> Result<Bytes>;

    /// Write data to a file, creating it if it doesn't exist
    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()>;

    /// Move `from` to `to` in a single step.
    ///
    /// Implementations must fail rather than merge when `to` is a non-empty
    /// directory, so callers can detect that another writer got there first.
    async fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Delete a file
    async fn delete_file(&self, path: &Path) -> Result<()>;

    /// Delete a directory and all its contents
    async fn delete_dir_all(&self, path: &Path) -> Result<()>;

    /// List all entries in a directory
    async fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// Check whether a directory has no entries
    async fn is_empty_directory(&self, path: &Path) -> Result<bool> {
        Ok(self.list_directory(path).await?.is_empty())
    }
}

/// Key-value settings storage trait
///
/// Abstracts platform-specific preferences/settings storage:
/// - iOS: UserDefaults
/// - Android: SharedPreferences / DataStore
/// - Desktop: A JSON file in the app data directory
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::SettingsStore;
///
/// async fn save_device_name(store: &dyn SettingsStore) -> Result<()> {
///     store.set_string("device_name", "Pixel").await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Store a string value
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve a string value
    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    /// Delete a setting
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if a setting exists
    async fn has_key(&self, key: &str) -> Result<bool> {
        Ok(self.get_string(key).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;

    mock! {
        Fs {}

        #[async_trait]
        impl FileSystemAccess for Fs {
            async fn get_data_directory(&self) -> Result<PathBuf>;
            async fn exists(&self, path: &Path) -> Result<bool>;
            async fn metadata(&self, path: &Path) -> Result<FileMetadata>;
            async fn create_dir_all(&self, path: &Path) -> Result<()>;
            async fn read_file(&self, path: &Path) -> Result<Bytes>;
            async fn write_file(&self, path: &Path, data: Bytes) -> Result<()>;
            async fn rename(&self, from: &Path, to: &Path) -> Result<()>;
            async fn delete_file(&self, path: &Path) -> Result<()>;
            async fn delete_dir_all(&self, path: &Path) -> Result<()>;
            async fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>>;
        }
    }

    #[test]
    fn test_file_metadata() {
        let metadata = FileMetadata {
            size: 0,
            created_at: Some(1234567890),
            modified_at: Some(1234567900),
            is_directory: true,
        };

        assert_eq!(metadata.size, 0);
        assert!(metadata.is_directory);
    }

    #[tokio::test]
    async fn empty_directory_uses_listing() {
        let mut fs = MockFs::new();
        fs.expect_list_directory()
            .times(2)
            .returning(|path| {
                if path.ends_with("empty") {
                    Ok(Vec::new())
                } else {
                    Ok(vec![path.join(".nomedia")])
                }
            });

        assert!(fs.is_empty_directory(Path::new("/sync/empty")).await.unwrap());
        assert!(!fs.is_empty_directory(Path::new("/sync/Ventus")).await.unwrap());
    }
}
