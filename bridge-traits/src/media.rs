//! Shared Media Index Abstraction
//!
//! Platforms that keep user-visible files in a system media index (Android's
//! MediaStore, the iOS photo library) cannot create a folder directly. A
//! folder is brought into existence by registering an asset and grouping it
//! into a named album.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::{error::Result, platform::PlatformSendSync};

/// Identifier of an asset registered with the media index
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetId(pub String);

impl AssetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An album (index collection) as reported by the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumInfo {
    /// Platform identifier of the album
    pub id: String,
    /// User-visible album title
    pub title: String,
    /// Number of assets in the album, if the platform reports it
    pub asset_count: Option<u64>,
}

/// Media index trait
///
/// # Platform Support
///
/// - **Android**: `MediaStore` buckets
/// - **iOS**: `PHAssetCollection` albums
/// - **Desktop**: not available; sandboxed directories are used instead
///
/// # Example
///
/// ```ignore
/// use bridge_traits::media::MediaLibrary;
///
/// async fn ensure_album(library: &dyn MediaLibrary, marker: &Path) -> Result<AlbumInfo> {
///     if let Some(album) = library.find_album("Ventus").await? {
///         return Ok(album);
///     }
///     let asset = library.create_asset(marker).await?;
///     library.create_album("Ventus", &asset).await
/// }
/// ```
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait MediaLibrary: PlatformSendSync {
    /// Look up an album by its exact title
    async fn find_album(&self, title: &str) -> Result<Option<AlbumInfo>>;

    /// Register the file at `path` with the media index
    ///
    /// The platform imports a copy, so the source file may be deleted once
    /// this returns.
    async fn create_asset(&self, path: &Path) -> Result<AssetId>;

    /// Create an album named `title` that initially contains `asset`
    ///
    /// Platforms require at least one asset to materialize an album.
    async fn create_album(&self, title: &str, asset: &AssetId) -> Result<AlbumInfo>;

    /// Remove a previously registered asset from the index
    async fn delete_asset(&self, asset: &AssetId) -> Result<()>;
}
