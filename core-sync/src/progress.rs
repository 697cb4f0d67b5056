//! # Session Progress
//!
//! Sources of progress for a running sync session.
//!
//! ## Overview
//!
//! The coordinator only sees the [`ProgressSource`] trait. Two sources ship
//! with the core:
//!
//! - [`TimerProgressTracker`] advances on a fixed tick until it reaches 1.0.
//!   It stands in while transfers happen out of band.
//! - [`FeedProgressTracker`] is pushed byte counts by a transfer engine and
//!   keeps the real totals for the completion report.
//!
//! Both guarantee that, within one session, emitted fractions never decrease,
//! the last emission is exactly 1.0, and `completed = true` is emitted once.
//! The stream ends after completion or cancellation.

use crate::error::{Result, SessionError};
use core_runtime::config::SessionConfig;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Point-in-time progress of a session.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionProgress {
    /// In `[0.0, 1.0]`
    pub fraction: f64,
    pub completed: bool,
}

impl SessionProgress {
    pub fn percent(&self) -> u8 {
        (self.fraction.clamp(0.0, 1.0) * 100.0).round() as u8
    }
}

/// Totals reported by a transfer engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransferReport {
    pub files_transferred: u64,
    pub total_bytes: u64,
}

/// Receiving end of one session's progress emissions.
#[derive(Debug)]
pub struct ProgressStream {
    receiver: mpsc::UnboundedReceiver<SessionProgress>,
}

impl ProgressStream {
    fn channel() -> (mpsc::UnboundedSender<SessionProgress>, Self) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (sender, Self { receiver })
    }

    /// Next emission, or `None` once the session completed or was cancelled.
    pub async fn next(&mut self) -> Option<SessionProgress> {
        self.receiver.recv().await
    }
}

pub trait ProgressSource: Send + Sync {
    /// Begin a fresh session at 0.0.
    ///
    /// Fails with [`SessionError::AlreadyRunning`] while a session is active.
    fn start(&self) -> Result<ProgressStream>;

    /// Stop emitting. Progress is kept as is; no-op once completed.
    fn cancel(&self);

    /// Cancel and zero.
    fn reset(&self);

    fn snapshot(&self) -> SessionProgress;

    /// Real transfer totals, when the source has them.
    fn final_report(&self) -> Option<TransferReport>;
}

// ============================================================================
// Timer
// ============================================================================

struct TimerState {
    ticks: u32,
    completed: bool,
    running: Option<CancellationToken>,
}

/// Fixed-rate progress source.
///
/// Fractions come from an integer tick count so repeated float addition
/// never drifts short of 1.0.
#[derive(Clone)]
pub struct TimerProgressTracker {
    tick_interval: Duration,
    total_ticks: u32,
    state: Arc<Mutex<TimerState>>,
}

impl TimerProgressTracker {
    pub fn new(tick_interval: Duration, total_ticks: u32) -> Self {
        Self {
            tick_interval,
            total_ticks: total_ticks.max(1),
            state: Arc::new(Mutex::new(TimerState {
                ticks: 0,
                completed: false,
                running: None,
            })),
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.tick_interval, config.total_ticks())
    }

    fn progress_of(&self, state: &TimerState) -> SessionProgress {
        SessionProgress {
            fraction: f64::from(state.ticks) / f64::from(self.total_ticks),
            completed: state.completed,
        }
    }

    async fn run(self, token: CancellationToken, sender: mpsc::UnboundedSender<SessionProgress>) {
        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // First tick fires immediately.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = interval.tick() => {}
            }

            let progress = {
                let mut state = self.state.lock();
                if token.is_cancelled() {
                    break;
                }
                state.ticks = (state.ticks + 1).min(self.total_ticks);
                if state.ticks == self.total_ticks {
                    state.completed = true;
                    state.running = None;
                }
                self.progress_of(&state)
            };

            // Keep counting even if nobody listens; snapshot() still reflects it.
            sender.send(progress).ok();
            if progress.completed {
                debug!("Timer progress completed");
                break;
            }
        }
    }
}

impl Default for TimerProgressTracker {
    fn default() -> Self {
        Self::from_config(&SessionConfig::default())
    }
}

impl ProgressSource for TimerProgressTracker {
    fn start(&self) -> Result<ProgressStream> {
        let token = CancellationToken::new();
        {
            let mut state = self.state.lock();
            if state.running.is_some() {
                return Err(SessionError::AlreadyRunning);
            }
            state.ticks = 0;
            state.completed = false;
            state.running = Some(token.clone());
        }

        let (sender, stream) = ProgressStream::channel();
        tokio::spawn(self.clone().run(token, sender));
        Ok(stream)
    }

    fn cancel(&self) {
        if let Some(token) = self.state.lock().running.take() {
            token.cancel();
            debug!("Timer progress cancelled");
        }
    }

    fn reset(&self) {
        let mut state = self.state.lock();
        if let Some(token) = state.running.take() {
            token.cancel();
        }
        state.ticks = 0;
        state.completed = false;
    }

    fn snapshot(&self) -> SessionProgress {
        self.progress_of(&self.state.lock())
    }

    fn final_report(&self) -> Option<TransferReport> {
        None
    }
}

// ============================================================================
// Feed
// ============================================================================

#[derive(Default)]
struct FeedState {
    sender: Option<mpsc::UnboundedSender<SessionProgress>>,
    progress: SessionProgress,
    report: TransferReport,
}

/// Progress pushed by a transfer engine.
#[derive(Clone, Default)]
pub struct FeedProgressTracker {
    state: Arc<Mutex<FeedState>>,
}

impl FeedProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record transfer totals so far.
    ///
    /// Returns `false` when no session is running. A fraction lower than one
    /// already emitted is raised to it; reaching `bytes_total` completes the
    /// session.
    pub fn report(&self, bytes_done: u64, bytes_total: u64, files_done: u64) -> bool {
        let mut state = self.state.lock();
        if state.sender.is_none() {
            return false;
        }

        let fraction = if bytes_total == 0 {
            0.0
        } else {
            (bytes_done as f64 / bytes_total as f64).min(1.0)
        };
        state.report = TransferReport {
            files_transferred: files_done,
            total_bytes: bytes_done,
        };

        if fraction >= 1.0 {
            Self::complete(&mut state);
        } else if fraction > state.progress.fraction {
            state.progress.fraction = fraction;
            Self::emit(&state);
        }
        true
    }

    /// Mark the running session complete with the last reported totals.
    pub fn finish(&self) -> bool {
        let mut state = self.state.lock();
        if state.sender.is_none() {
            return false;
        }
        Self::complete(&mut state);
        true
    }

    fn complete(state: &mut FeedState) {
        state.progress = SessionProgress {
            fraction: 1.0,
            completed: true,
        };
        Self::emit(state);
        state.sender = None;
    }

    fn emit(state: &FeedState) {
        if let Some(sender) = &state.sender {
            sender.send(state.progress).ok();
        }
    }
}

impl ProgressSource for FeedProgressTracker {
    fn start(&self) -> Result<ProgressStream> {
        let mut state = self.state.lock();
        if state.sender.is_some() {
            return Err(SessionError::AlreadyRunning);
        }

        let (sender, stream) = ProgressStream::channel();
        *state = FeedState {
            sender: Some(sender),
            ..FeedState::default()
        };
        Ok(stream)
    }

    fn cancel(&self) {
        self.state.lock().sender = None;
    }

    fn reset(&self) {
        *self.state.lock() = FeedState::default();
    }

    fn snapshot(&self) -> SessionProgress {
        self.state.lock().progress
    }

    fn final_report(&self) -> Option<TransferReport> {
        let state = self.state.lock();
        state.progress.completed.then_some(state.report)
    }
}
