//! # Sync Session Coordinator
//!
//! Drives one sync session from "connect" to "done".
//!
//! ## Overview
//!
//! `begin_session` records the target in the `CredentialStore` and then runs
//! the remaining steps in order on a background task, reporting each outcome
//! on the session's own event stream:
//!
//! 1. Record the target in the `CredentialStore`
//! 2. Acquire storage and local network permission via `PermissionGate`
//! 3. Provision the destination folder via `FolderProvisioner`
//! 4. Relay progress from the `ProgressSource` until it completes
//! 5. Report `SyncStats`
//!
//! A denial or provisioning failure ends the session; nothing is retried and
//! the credentials stay connected until [`SyncSessionCoordinator::disconnect`].
//! Only one session runs at a time.
//!
//! Cancellation takes effect between steps: the permission and provisioning
//! calls always run to completion, but once cancelled their result is
//! ignored and the session ends with `Cancelled`. Progress stops immediately.
//!
//! The coordinator accepts a new session as soon as the terminal event
//! (`Completed`, `PermissionDenied`, `ProvisionFailed` or `Cancelled`) has
//! been delivered.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let mut session = coordinator.begin_session(target, "Ventus")?;
//! while let Some(event) = session.next_event().await {
//!     match event {
//!         SessionEvent::Progress(fraction) => println!("{:.0}%", fraction * 100.0),
//!         SessionEvent::Completed(stats) => println!("{} MB", stats.total_megabytes()),
//!         other => if let Some(message) = other.user_message() { eprintln!("{message}") },
//!     }
//! }
//! ```

use crate::error::{Result, SessionError};
use crate::progress::{ProgressSource, TransferReport};
use bridge_traits::Clock;
use core_auth::{ConnectionTarget, CredentialStore};
use core_provision::{
    FolderProvisioner, PermissionDenial, PermissionGate, ProvisionError, ProvisioningResult,
};
use core_runtime::events::{CoreEvent, EventBus, SessionLifecycleEvent};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

const BYTES_PER_MEGABYTE: f64 = 1024.0 * 1024.0;

/// Unique identifier of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Summary shown once a session completes.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SyncStats {
    pub files_transferred: u64,
    pub total_bytes: u64,
    pub elapsed_secs: f64,
}

impl SyncStats {
    fn from_report(report: Option<TransferReport>, elapsed_secs: f64) -> Self {
        let report = report.unwrap_or_default();
        Self {
            files_transferred: report.files_transferred,
            total_bytes: report.total_bytes,
            elapsed_secs,
        }
    }

    pub fn average_speed_bytes_per_sec(&self) -> f64 {
        if self.elapsed_secs > 0.0 {
            self.total_bytes as f64 / self.elapsed_secs
        } else {
            0.0
        }
    }

    pub fn total_megabytes(&self) -> f64 {
        self.total_bytes as f64 / BYTES_PER_MEGABYTE
    }
}

/// Everything a session reports to its owner.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    PermissionDenied(PermissionDenial),
    ProvisionFailed(ProvisionError),
    /// Fraction in `[0.0, 1.0]`
    Progress(f64),
    Completed(SyncStats),
    Cancelled,
}

impl SessionEvent {
    /// Message to show the user for events that end a session unsuccessfully.
    pub fn user_message(&self) -> Option<String> {
        match self {
            SessionEvent::PermissionDenied(denial) => Some(denial.to_string()),
            SessionEvent::ProvisionFailed(ProvisionError::PermissionDenied) => Some(
                "Storage permission is required to create the sync folder".to_string(),
            ),
            SessionEvent::ProvisionFailed(ProvisionError::PlatformUnsupported(reason)) => Some(
                format!("This device cannot create a sync folder: {}", reason),
            ),
            SessionEvent::ProvisionFailed(ProvisionError::InvalidFolderName { name, reason }) => {
                Some(format!("'{}' cannot be used as a sync folder: {}", name, reason))
            }
            SessionEvent::ProvisionFailed(ProvisionError::Io { message, .. }) => {
                Some(format!("Could not create the sync folder: {}", message))
            }
            SessionEvent::Cancelled => Some("Sync was cancelled".to_string()),
            SessionEvent::Progress(_) | SessionEvent::Completed(_) => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionEvent::Progress(_))
    }
}

/// How a session that was not cancelled ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    Completed(SyncStats),
    PermissionDenied(PermissionDenial),
    ProvisionFailed(ProvisionError),
}

/// Owner's view of a running session.
pub struct SessionHandle {
    id: SessionId,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    cancel: CancellationToken,
    task: JoinHandle<Result<SessionOutcome>>,
}

impl SessionHandle {
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Next event, or `None` once the session has ended and every event was read.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events.recv().await
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the session to end.
    ///
    /// Cancellation is reported as [`SessionError::Cancelled`].
    pub async fn wait(self) -> Result<SessionOutcome> {
        self.task
            .await
            .map_err(|e| SessionError::Internal(format!("session task failed: {}", e)))?
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

struct ActiveSession {
    id: SessionId,
    cancel: CancellationToken,
}

/// Clears the active-session slot once the session has reached its terminal
/// event, and at the latest when the session task ends.
struct ActiveGuard {
    slot: Arc<Mutex<Option<ActiveSession>>>,
    id: SessionId,
}

impl ActiveGuard {
    fn release(&self) {
        let mut slot = self.slot.lock();
        if slot.as_ref().map(|active| active.id) == Some(self.id) {
            *slot = None;
        }
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.release();
    }
}

/// Session orchestrator.
#[derive(Clone)]
pub struct SyncSessionCoordinator {
    credentials: Arc<CredentialStore>,
    gate: Arc<PermissionGate>,
    provisioner: Arc<dyn FolderProvisioner>,
    tracker: Arc<dyn ProgressSource>,
    clock: Arc<dyn Clock>,
    event_bus: Option<EventBus>,
    active: Arc<Mutex<Option<ActiveSession>>>,
}

impl SyncSessionCoordinator {
    pub fn new(
        credentials: Arc<CredentialStore>,
        gate: Arc<PermissionGate>,
        provisioner: Arc<dyn FolderProvisioner>,
        tracker: Arc<dyn ProgressSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            credentials,
            gate,
            provisioner,
            tracker,
            clock,
            event_bus: None,
            active: Arc::new(Mutex::new(None)),
        }
    }

    /// Also mirror session lifecycle onto `event_bus`.
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    pub fn tracker(&self) -> &Arc<dyn ProgressSource> {
        &self.tracker
    }

    pub fn is_session_active(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Start a session syncing into `folder_name` from `target`.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// [`SessionError::SessionInProgress`] if another session has not ended.
    #[instrument(skip(self), fields(port = target.port()))]
    pub fn begin_session(&self, target: ConnectionTarget, folder_name: &str) -> Result<SessionHandle> {
        let id = SessionId::new();
        let cancel = CancellationToken::new();
        {
            let mut active = self.active.lock();
            if let Some(existing) = active.as_ref() {
                return Err(SessionError::SessionInProgress {
                    session_id: existing.id.to_string(),
                });
            }
            *active = Some(ActiveSession {
                id,
                cancel: cancel.clone(),
            });
        }

        self.credentials.connect(target.to_string());

        let (sender, events) = mpsc::unbounded_channel();
        let run = SessionRun {
            id,
            target,
            folder: folder_name.to_string(),
            events: sender,
            cancel: cancel.clone(),
            active: ActiveGuard {
                slot: Arc::clone(&self.active),
                id,
            },
        };

        let coordinator = self.clone();
        let task = tokio::spawn(async move { coordinator.run_session(run).await });

        info!(session_id = %id, folder = folder_name, "Sync session started");
        Ok(SessionHandle {
            id,
            events,
            cancel,
            task,
        })
    }

    /// Cancel any running session, reset progress, and clear credentials.
    pub fn disconnect(&self) {
        if let Some(active) = self.active.lock().as_ref() {
            active.cancel.cancel();
        }
        self.tracker.reset();
        self.credentials.disconnect();
        info!("Disconnected");
    }

    #[instrument(skip(self, run), fields(session_id = %run.id))]
    async fn run_session(&self, run: SessionRun) -> Result<SessionOutcome> {
        let started = Instant::now();

        self.publish(SessionLifecycleEvent::Started {
            session_id: run.id.to_string(),
            target: run.target.to_string(),
            folder: run.folder.clone(),
            started_at: self.clock.unix_timestamp_millis(),
        });

        // The gate and the provisioner run to completion; a cancel that
        // arrived meanwhile wins over whatever they returned.
        let permission = self.gate.acquire(&run.target).await;
        if run.cancel.is_cancelled() {
            return Err(self.cancelled(&run));
        }
        if let Err(denial) = permission {
            self.publish_failed(&run, denial.to_string());
            run.finish(SessionEvent::PermissionDenied(denial.clone()));
            return Ok(SessionOutcome::PermissionDenied(denial));
        }

        let provisioned = self.provisioner.ensure(&run.folder).await;
        if run.cancel.is_cancelled() {
            return Err(self.cancelled(&run));
        }
        let folder = match provisioned {
            Ok(folder) => folder,
            Err(e) => {
                self.publish_failed(&run, e.to_string());
                run.finish(SessionEvent::ProvisionFailed(e.clone()));
                return Ok(SessionOutcome::ProvisionFailed(e));
            }
        };
        log_folder(&folder);

        let mut progress = match self.tracker.start() {
            Ok(stream) => stream,
            Err(e) => {
                error!(error = %e, "Could not start progress tracking");
                self.publish_failed(&run, e.to_string());
                return Err(e);
            }
        };

        let mut last_percent = None;
        loop {
            tokio::select! {
                biased;
                _ = run.cancel.cancelled() => {
                    self.tracker.cancel();
                    return Err(self.cancelled(&run));
                }
                next = progress.next() => match next {
                    Some(update) => {
                        run.send(SessionEvent::Progress(update.fraction));
                        let percent = update.percent();
                        if last_percent != Some(percent) {
                            last_percent = Some(percent);
                            self.publish(SessionLifecycleEvent::Progress {
                                session_id: run.id.to_string(),
                                percent,
                            });
                        }
                        if update.completed {
                            break;
                        }
                    }
                    // Tracker was reset or cancelled underneath us.
                    None => return Err(self.cancelled(&run)),
                },
            }
        }

        let stats = SyncStats::from_report(
            self.tracker.final_report(),
            started.elapsed().as_secs_f64(),
        );
        info!(
            files = stats.files_transferred,
            bytes = stats.total_bytes,
            elapsed_secs = stats.elapsed_secs,
            "Sync session completed"
        );
        self.publish(SessionLifecycleEvent::Completed {
            session_id: run.id.to_string(),
            files_transferred: stats.files_transferred,
            total_bytes: stats.total_bytes,
            elapsed_secs: stats.elapsed_secs,
        });
        run.finish(SessionEvent::Completed(stats));

        Ok(SessionOutcome::Completed(stats))
    }

    fn cancelled(&self, run: &SessionRun) -> SessionError {
        warn!("Sync session cancelled");
        self.publish(SessionLifecycleEvent::Cancelled {
            session_id: run.id.to_string(),
        });
        run.finish(SessionEvent::Cancelled);
        SessionError::Cancelled
    }

    fn publish_failed(&self, run: &SessionRun, message: String) {
        self.publish(SessionLifecycleEvent::Failed {
            session_id: run.id.to_string(),
            message,
        });
    }

    fn publish(&self, event: SessionLifecycleEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Session(event)).ok();
        }
    }
}

impl fmt::Debug for SyncSessionCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncSessionCoordinator")
            .field("storage", &self.provisioner.storage_kind())
            .field("session_active", &self.is_session_active())
            .finish()
    }
}

struct SessionRun {
    id: SessionId,
    target: ConnectionTarget,
    folder: String,
    events: mpsc::UnboundedSender<SessionEvent>,
    cancel: CancellationToken,
    active: ActiveGuard,
}

impl SessionRun {
    fn send(&self, event: SessionEvent) {
        // The owner may have dropped its handle; the session still finishes.
        self.events.send(event).ok();
    }

    /// Free the coordinator for the next session, then send the last event.
    fn finish(&self, event: SessionEvent) {
        self.active.release();
        self.send(event);
    }
}

fn log_folder(folder: &ProvisioningResult) {
    debug!(folder = %folder.handle, created = folder.created, "Sync folder ready");
}
