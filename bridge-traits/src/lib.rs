//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the Ventus client core and the
//! platform it runs on. Each trait is a capability the core needs but that
//! differs per platform (desktop, iOS, Android).
//!
//! ## Traits
//!
//! ### Storage
//! - [`FileSystemAccess`](storage::FileSystemAccess) - Sandboxed file I/O and staging
//! - [`MediaLibrary`](media::MediaLibrary) - Shared media index albums
//! - [`SettingsStore`](storage::SettingsStore) - Key-value preferences storage
//!
//! ### Platform Integration
//! - [`PermissionProvider`](permission::PermissionProvider) - Storage / media-index permission
//! - [`LocalNetworkProbe`](network::LocalNetworkProbe) - One-shot LAN reachability probe
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Storage model |
//! |----------|---------------------|---------------|
//! | Desktop  | `bridge-desktop`    | Sandboxed directory |
//! | iOS      | Host app            | Sandboxed directory |
//! | Android  | Host app            | Shared media index |
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Platform
//! implementations should convert native errors into it with an actionable
//! message, and use `PermissionDenied` when the OS refused access so the core
//! can tell a denial apart from an I/O failure.
//!
//! ## Thread Safety
//!
//! Bridge traits require `Send + Sync` on native targets so adapters can be
//! shared across Tokio tasks behind an `Arc`.

pub mod error;
pub mod media;
pub mod network;
pub mod permission;
pub mod platform;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use media::{AlbumInfo, AssetId, MediaLibrary};
pub use network::{LocalNetworkProbe, ProbeOutcome};
pub use permission::{PermissionProvider, PermissionStatus};
pub use storage::{FileMetadata, FileSystemAccess, SettingsStore};
pub use time::{Clock, FixedClock, LogEntry, LogLevel, LoggerSink, SystemClock};
