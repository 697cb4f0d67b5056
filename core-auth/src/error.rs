use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid connection target '{input}': {reason}")]
    InvalidTarget { input: String, reason: String },
}

pub type Result<T> = std::result::Result<T, AuthError>;
