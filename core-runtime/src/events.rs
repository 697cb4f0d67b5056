//! # Event Bus System
//!
//! Broadcasts typed lifecycle events from the core modules using
//! `tokio::sync::broadcast`, so hosts and diagnostics can observe connection,
//! provisioning and session changes without being wired into each module.
//!
//! ## Overview
//!
//! - **Event Types**: `CoreEvent` wrapping one enum per domain
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Receiver wrapper with optional filtering
//!
//! ```text
//! ┌──────────────────┐   emit   ┌──────────┐   subscribe   ┌────────────┐
//! │ CredentialStore  ├─────────>│          ├──────────────>│ Host UI    │
//! ├──────────────────┤          │ EventBus │               └────────────┘
//! │ FolderProvisioner├─────────>│          │   subscribe   ┌────────────┐
//! ├──────────────────┤          │          ├──────────────>│ Diagnostics│
//! │ SessionCoordinator────────->│          │               └────────────┘
//! └──────────────────┘          └──────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{ConnectionEvent, CoreEvent, EventBus};
//!
//! let event_bus = EventBus::new(16);
//! let mut subscriber = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Connection(ConnectionEvent::Connected {
//!         target: "10.0.0.5:1234".to_string(),
//!     }))
//!     .ok();
//!
//! assert!(subscriber.try_recv().is_ok());
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber fell behind and missed `n` events.
//! - **`RecvError::Closed`**: every sender was dropped.
//!
//! Emitting with no subscribers returns `Err`; publishers ignore it with
//! `.ok()` because the bus is purely observational.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast::{self, error::RecvError, error::SendError, Receiver};

/// Default number of buffered events per subscriber
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 64;

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Credential store transitions
    Connection(ConnectionEvent),
    /// Local sync folder provisioning
    Provisioning(ProvisioningEvent),
    /// Synchronization session lifecycle
    Session(SessionLifecycleEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Connection(e) => e.description(),
            CoreEvent::Provisioning(e) => e.description(),
            CoreEvent::Session(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Provisioning(ProvisioningEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Session(SessionLifecycleEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Session(SessionLifecycleEvent::Cancelled { .. }) => EventSeverity::Warning,
            CoreEvent::Session(SessionLifecycleEvent::Progress { .. }) => EventSeverity::Debug,
            _ => EventSeverity::Info,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Connection Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ConnectionEvent {
    /// The credential store now points at `target`.
    Connected { target: String },
    /// Credentials were cleared.
    Disconnected,
}

impl ConnectionEvent {
    fn description(&self) -> &str {
        match self {
            ConnectionEvent::Connected { .. } => "Connected to sync target",
            ConnectionEvent::Disconnected => "Disconnected from sync target",
        }
    }
}

// ============================================================================
// Provisioning Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ProvisioningEvent {
    /// The folder is ready. `created` is false when it already existed.
    Provisioned {
        folder: String,
        /// Which storage model provisioned it ("directory" or "album").
        storage: String,
        created: bool,
    },
    /// Provisioning failed; a later attempt may succeed.
    Failed { folder: String, message: String },
}

impl ProvisioningEvent {
    fn description(&self) -> &str {
        match self {
            ProvisioningEvent::Provisioned { created: true, .. } => "Sync folder created",
            ProvisioningEvent::Provisioned { created: false, .. } => "Sync folder already present",
            ProvisioningEvent::Failed { .. } => "Sync folder provisioning failed",
        }
    }
}

// ============================================================================
// Session Events
// ============================================================================

/// Session lifecycle as seen from outside the session's own event stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum SessionLifecycleEvent {
    Started {
        session_id: String,
        target: String,
        folder: String,
        /// Unix epoch milliseconds
        started_at: i64,
    },
    Progress {
        session_id: String,
        /// 0-100
        percent: u8,
    },
    Completed {
        session_id: String,
        files_transferred: u64,
        total_bytes: u64,
        elapsed_secs: f64,
    },
    Failed {
        session_id: String,
        message: String,
    },
    Cancelled {
        session_id: String,
    },
}

impl SessionLifecycleEvent {
    fn description(&self) -> &str {
        match self {
            SessionLifecycleEvent::Started { .. } => "Sync session started",
            SessionLifecycleEvent::Progress { .. } => "Sync session in progress",
            SessionLifecycleEvent::Completed { .. } => "Sync session completed",
            SessionLifecycleEvent::Failed { .. } => "Sync session failed",
            SessionLifecycleEvent::Cancelled { .. } => "Sync session cancelled",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central broadcast channel. Cloning shares the underlying channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error if there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` that skips events failing a filter.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let event_bus = EventBus::new(16);
/// let sessions = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Session(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` will be returned.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive a matching event without waiting.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}
