//! Thread-safety markers shared by every bridge trait.
//!
//! Native hosts run bridge adapters on a multi-threaded Tokio runtime, so the
//! traits require `Send + Sync`. Single-threaded hosts (an embedded runtime
//! driven from a UI thread on `wasm32`) cannot satisfy those bounds, so the
//! markers collapse to no-ops there.

/// `Send + Sync` on native targets, nothing on `wasm32`.
#[cfg(not(target_arch = "wasm32"))]
pub trait PlatformSendSync: Send + Sync {}

#[cfg(not(target_arch = "wasm32"))]
impl<T> PlatformSendSync for T where T: Send + Sync {}

#[cfg(target_arch = "wasm32")]
pub trait PlatformSendSync {}

#[cfg(target_arch = "wasm32")]
impl<T> PlatformSendSync for T {}
