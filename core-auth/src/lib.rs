//! # Connection Credentials Module
//!
//! Holds and validates the sync target the client connects to.
//!
//! ## Overview
//!
//! - [`CredentialStore`] is the observable `{target, is_connected}` value
//!   shared by the views and the session coordinator.
//! - [`ConnectionTarget`] validates manual input and scanned QR payloads
//!   before they reach the store.
//!
//! Events for every store transition are mirrored to the runtime
//! `EventBus` when one is supplied.

pub mod credentials;
pub mod error;
pub mod target;
pub mod types;

pub use credentials::CredentialStore;
pub use error::{AuthError, Result};
pub use target::{ConnectionTarget, DEFAULT_PORT};
pub use types::{Credentials, SubscriptionId};
