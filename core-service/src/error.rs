use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(#[from] core_runtime::Error),

    #[error("Platform error: {0}")]
    Bridge(#[from] bridge_traits::BridgeError),

    #[error("Connection error: {0}")]
    Auth(#[from] core_auth::AuthError),

    #[error("Provisioning error: {0}")]
    Provision(#[from] core_provision::ProvisionError),

    #[error("Session error: {0}")]
    Session(#[from] core_sync::SessionError),

    #[error("Invalid setting '{field}': {reason}")]
    InvalidSetting { field: String, reason: String },

    #[error("Settings serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
