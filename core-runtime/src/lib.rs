//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the Ventus client core:
//! - Logging and tracing infrastructure
//! - Configuration management and bridge wiring
//! - Event bus system
//!
//! Every other `core-*` crate depends on this one for its configuration
//! types and for publishing lifecycle events.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{CoreConfig, SessionConfig, StorageModel};
pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus};
