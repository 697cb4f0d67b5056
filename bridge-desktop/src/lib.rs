//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `FileSystemAccess` using `tokio::fs`, rooted at the `dirs` data directory
//! - `PermissionProvider` granting access when the data directory is writable
//! - `LocalNetworkProbe` using a single `tokio::net::TcpStream` connect
//! - `SettingsStore` backed by a JSON file
//!
//! Desktop has no shared media index, so no `MediaLibrary` adapter is
//! provided; the core provisions sandboxed directories instead.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{TokioFileSystem, TcpLocalNetworkProbe};
//!
//! #[tokio::main]
//! async fn main() {
//!     let fs = TokioFileSystem::new();
//!     let probe = TcpLocalNetworkProbe::new();
//!     // Hand both to CoreConfig::builder()
//! }
//! ```

mod filesystem;
mod network;
mod permission;
mod settings;

pub use filesystem::TokioFileSystem;
pub use network::TcpLocalNetworkProbe;
pub use permission::DesktopPermissionProvider;
pub use settings::JsonFileSettingsStore;
