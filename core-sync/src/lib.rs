//! # Sync Session Module
//!
//! Runs a sync session end to end once the user has picked a target.
//!
//! ## Components
//!
//! - **Progress** (`progress`): `ProgressSource` trait with a fixed-rate timer
//!   tracker and a feed tracker for real transfer engines
//! - **Session Coordinator** (`coordinator`): connect, permission gate,
//!   folder provisioning, progress relay, completion stats

pub mod coordinator;
pub mod error;
pub mod progress;

pub use coordinator::{
    SessionEvent, SessionHandle, SessionId, SessionOutcome, SyncSessionCoordinator, SyncStats,
};
pub use error::{Result, SessionError};
pub use progress::{
    FeedProgressTracker, ProgressSource, ProgressStream, SessionProgress, TimerProgressTracker,
    TransferReport,
};
