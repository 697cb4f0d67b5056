//! # Permission Gate
//!
//! Acquires everything a session needs from the OS before any folder is
//! touched: storage (or media-index) access and local network access.
//!
//! Both checks run concurrently and the gate resolves only once both have
//! finished, so a denial always reports every failed check at once. Nothing
//! is cached; each call asks the platform again.

use crate::error::{PermissionCheck, PermissionDenial, PermissionFailure};
use bridge_traits::{LocalNetworkProbe, PermissionProvider, PermissionStatus, ProbeOutcome};
use core_auth::ConnectionTarget;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Proof that both checks passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionGrant {
    /// What the local network probe observed
    pub probe: ProbeOutcome,
}

pub struct PermissionGate {
    permissions: Arc<dyn PermissionProvider>,
    probe: Arc<dyn LocalNetworkProbe>,
    probe_timeout: Duration,
}

impl PermissionGate {
    pub fn new(
        permissions: Arc<dyn PermissionProvider>,
        probe: Arc<dyn LocalNetworkProbe>,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            permissions,
            probe,
            probe_timeout,
        }
    }

    /// Request storage access and probe `target`, concurrently.
    #[instrument(skip(self), fields(port = target.port()))]
    pub async fn acquire(
        &self,
        target: &ConnectionTarget,
    ) -> Result<PermissionGrant, PermissionDenial> {
        let (storage, network) = tokio::join!(self.check_storage(), self.check_network(target));

        let mut failures = Vec::new();
        if let Err(failure) = storage {
            failures.push(failure);
        }
        let probe = match network {
            Ok(outcome) => Some(outcome),
            Err(failure) => {
                failures.push(failure);
                None
            }
        };

        match probe {
            Some(probe) if failures.is_empty() => {
                info!(probe = ?probe, "Permissions granted");
                Ok(PermissionGrant { probe })
            }
            _ => {
                let denial = PermissionDenial { failures };
                warn!(reason = %denial, "Permissions denied");
                Err(denial)
            }
        }
    }

    async fn check_storage(&self) -> Result<(), PermissionFailure> {
        let failure = |reason: String| PermissionFailure {
            check: PermissionCheck::Storage,
            reason,
        };

        match self.permissions.request_storage_access().await {
            Ok(PermissionStatus::Granted) => Ok(()),
            Ok(PermissionStatus::Denied) => Err(failure("was denied".to_string())),
            Ok(PermissionStatus::Restricted) => {
                Err(failure("is restricted on this device".to_string()))
            }
            Ok(PermissionStatus::Undetermined) => {
                Err(failure("was not granted (no answer from the user)".to_string()))
            }
            Err(e) => Err(failure(format!("could not be requested: {}", e))),
        }
    }

    async fn check_network(
        &self,
        target: &ConnectionTarget,
    ) -> Result<ProbeOutcome, PermissionFailure> {
        let host = target.host().to_string();
        let probe = self.probe.probe(&host, target.port(), self.probe_timeout);

        // A bridge that ignores its timeout still cannot stall the gate.
        let outcome = match tokio::time::timeout(self.probe_timeout, probe).await {
            Ok(result) => result,
            Err(_) => Ok(ProbeOutcome::NoResponse),
        };

        match outcome {
            Ok(ProbeOutcome::Blocked) => Err(PermissionFailure {
                check: PermissionCheck::LocalNetwork,
                reason: "was blocked by the system".to_string(),
            }),
            Ok(outcome) => {
                debug!(outcome = ?outcome, "Local network probed");
                Ok(outcome)
            }
            Err(e) => Err(PermissionFailure {
                check: PermissionCheck::LocalNetwork,
                reason: format!("could not be probed: {}", e),
            }),
        }
    }
}
