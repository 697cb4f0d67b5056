use bridge_traits::BridgeError;
use std::fmt;
use std::io::ErrorKind;
use thiserror::Error;

/// Why a folder could not be provisioned.
///
/// None of these are fatal to the process; a later `ensure` may succeed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProvisionError {
    #[error("Storage permission was not granted")]
    PermissionDenied,

    #[error("Folder provisioning is not supported on this platform: {0}")]
    PlatformUnsupported(String),

    #[error("I/O error ({kind:?}): {message}")]
    Io { kind: ErrorKind, message: String },

    #[error("Invalid folder name '{name}': {reason}")]
    InvalidFolderName { name: String, reason: String },
}

impl ProvisionError {
    pub(crate) fn io(kind: ErrorKind, message: impl Into<String>) -> Self {
        ProvisionError::Io {
            kind,
            message: message.into(),
        }
    }
}

impl From<BridgeError> for ProvisionError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::PermissionDenied(_) => ProvisionError::PermissionDenied,
            BridgeError::NotAvailable(reason) => ProvisionError::PlatformUnsupported(reason),
            other => ProvisionError::Io {
                kind: other.io_kind(),
                message: other.to_string(),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, ProvisionError>;

/// Which permission check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionCheck {
    /// Storage / media-index access
    Storage,
    /// Local network reachability probe
    LocalNetwork,
}

impl fmt::Display for PermissionCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionCheck::Storage => f.write_str("storage access"),
            PermissionCheck::LocalNetwork => f.write_str("local network access"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionFailure {
    pub check: PermissionCheck,
    pub reason: String,
}

/// Every check that failed during one `PermissionGate::acquire` call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct PermissionDenial {
    pub failures: Vec<PermissionFailure>,
}

impl PermissionDenial {
    pub fn failed(&self, check: PermissionCheck) -> bool {
        self.failures.iter().any(|failure| failure.check == check)
    }
}

impl fmt::Display for PermissionDenial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Permission denied: ")?;
        for (index, failure) in self.failures.iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{} {}", failure.check, failure.reason)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bridge_errors_map_to_provision_errors() {
        assert_eq!(
            ProvisionError::from(BridgeError::PermissionDenied("photos".into())),
            ProvisionError::PermissionDenied
        );
        assert_eq!(
            ProvisionError::from(BridgeError::NotAvailable("no media store".into())),
            ProvisionError::PlatformUnsupported("no media store".into())
        );

        let io = ProvisionError::from(BridgeError::Io(std::io::Error::new(
            ErrorKind::StorageFull,
            "disk full",
        )));
        assert!(matches!(io, ProvisionError::Io { kind: ErrorKind::StorageFull, .. }));
    }

    #[test]
    fn denial_lists_every_failure() {
        let denial = PermissionDenial {
            failures: vec![
                PermissionFailure {
                    check: PermissionCheck::Storage,
                    reason: "was denied by the user".into(),
                },
                PermissionFailure {
                    check: PermissionCheck::LocalNetwork,
                    reason: "was blocked by the system".into(),
                },
            ],
        };

        assert_eq!(
            denial.to_string(),
            "Permission denied: storage access was denied by the user; \
             local network access was blocked by the system"
        );
        assert!(denial.failed(PermissionCheck::Storage));
        assert!(denial.failed(PermissionCheck::LocalNetwork));
    }
}
