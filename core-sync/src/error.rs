use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Progress tracker is already running")]
    AlreadyRunning,

    #[error("A sync session is already in progress ({session_id})")]
    SessionInProgress { session_id: String },

    #[error("Sync session cancelled")]
    Cancelled,

    #[error("Internal session error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, SessionError>;
