//! Local Network Probe Abstraction
//!
//! Some platforms gate access to the local network behind a permission that
//! is only prompted the first time the app touches a LAN address. A single
//! connection attempt against the sync target both triggers that prompt and
//! tells the core whether the OS let the packet out.

use std::time::Duration;

use crate::{error::Result, platform::PlatformSendSync};

/// Result of a single reachability probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The target answered (accepted or actively refused the connection)
    Responded,
    /// Nothing came back before the timeout, or the route was unavailable
    NoResponse,
    /// The operating system refused to send traffic to the local network
    Blocked,
}

impl ProbeOutcome {
    /// Whether the probe was allowed to leave the device
    pub fn was_probed(self) -> bool {
        !matches!(self, ProbeOutcome::Blocked)
    }
}

/// Local network probe trait
///
/// # Platform Support
///
/// - **iOS**: Triggers the local network privacy prompt
/// - **Android / Desktop**: Plain TCP connection attempt
///
/// # Example
///
/// ```ignore
/// use bridge_traits::network::LocalNetworkProbe;
///
/// async fn lan_allowed(probe: &dyn LocalNetworkProbe) -> bool {
///     probe
///         .probe("192.168.1.20", 1234, Duration::from_secs(2))
///         .await
///         .map(|outcome| outcome.was_probed())
///         .unwrap_or(false)
/// }
/// ```
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait LocalNetworkProbe: PlatformSendSync {
    /// Attempt one connection to `host:port`, giving up after `timeout`
    async fn probe(&self, host: &str, port: u16, timeout: Duration) -> Result<ProbeOutcome>;
}
