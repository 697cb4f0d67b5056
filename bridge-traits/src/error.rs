use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("Access denied by the platform: {0}")]
    PermissionDenied(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Best-effort mapping onto an [`std::io::ErrorKind`] so callers can
    /// report I/O failures uniformly regardless of which bridge raised them.
    pub fn io_kind(&self) -> std::io::ErrorKind {
        match self {
            BridgeError::Io(err) => err.kind(),
            BridgeError::PermissionDenied(_) => std::io::ErrorKind::PermissionDenied,
            BridgeError::NotAvailable(_) => std::io::ErrorKind::Unsupported,
            BridgeError::OperationFailed(_) => std::io::ErrorKind::Other,
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
