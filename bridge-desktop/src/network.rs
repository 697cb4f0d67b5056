//! Local Network Probe Implementation

use async_trait::async_trait;
use bridge_traits::{
    error::Result,
    network::{LocalNetworkProbe, ProbeOutcome},
};
use std::io::ErrorKind;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

/// Desktop probe that opens (and immediately drops) one TCP connection.
///
/// Desktop operating systems do not gate LAN access, so the probe only
/// distinguishes an answering host from silence. An OS-level refusal to send
/// (`PermissionDenied`, e.g. a sandbox or firewall profile) reports `Blocked`.
#[derive(Debug, Default, Clone)]
pub struct TcpLocalNetworkProbe;

impl TcpLocalNetworkProbe {
    pub fn new() -> Self {
        Self
    }

    fn classify(kind: ErrorKind) -> ProbeOutcome {
        match kind {
            ErrorKind::ConnectionRefused | ErrorKind::ConnectionReset => ProbeOutcome::Responded,
            ErrorKind::PermissionDenied => ProbeOutcome::Blocked,
            _ => ProbeOutcome::NoResponse,
        }
    }
}

#[async_trait]
impl LocalNetworkProbe for TcpLocalNetworkProbe {
    async fn probe(&self, host: &str, port: u16, timeout: Duration) -> Result<ProbeOutcome> {
        let outcome = match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(_stream)) => ProbeOutcome::Responded,
            Ok(Err(e)) => Self::classify(e.kind()),
            Err(_) => ProbeOutcome::NoResponse,
        };

        debug!(port, outcome = ?outcome, "Local network probe finished");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn refused_counts_as_response() {
        assert_eq!(
            TcpLocalNetworkProbe::classify(ErrorKind::ConnectionRefused),
            ProbeOutcome::Responded
        );
        assert_eq!(
            TcpLocalNetworkProbe::classify(ErrorKind::PermissionDenied),
            ProbeOutcome::Blocked
        );
        assert_eq!(
            TcpLocalNetworkProbe::classify(ErrorKind::TimedOut),
            ProbeOutcome::NoResponse
        );
    }

    #[tokio::test]
    async fn test_probe_listening_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let probe = TcpLocalNetworkProbe::new();
        let outcome = probe
            .probe("127.0.0.1", port, Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(outcome, ProbeOutcome::Responded);
    }
}
