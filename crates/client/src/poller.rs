//! Processing-status poll loop.
//!
//! [`StatusPoller::start`] spawns one task per recording. The task fetches
//! a snapshot immediately, then once per interval, feeding each response
//! through a [`ProgressTracker`] and reporting [`PollEvent`]s over a
//! channel. It stops on its own at a terminal job status or a rejected
//! session, and otherwise runs until the caller cancels through the
//! returned [`PollHandle`].
//!
//! Requests are issued serially: the next tick is only awaited after the
//! previous fetch resolved, and ticks missed while a fetch was in flight
//! are skipped rather than replayed.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use scribe_core::processing::{JobStatus, ProcessingSnapshot};
use scribe_core::progress::{ProgressTracker, TrackerOutcome};
use scribe_core::types::DbId;

use crate::api::{ApiError, BackendApi};
use crate::config::ClientConfig;
use crate::events::{PollEvent, PollOutcome};
use crate::session::Session;

/// Anything that can produce a processing snapshot for a recording.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch_snapshot(&self, recording_id: DbId) -> Result<ProcessingSnapshot, ApiError>;
}

/// Fetches snapshots from the backend on behalf of one session.
pub struct ApiSnapshotSource {
    api: BackendApi,
    session: Session,
}

impl ApiSnapshotSource {
    pub fn new(api: BackendApi, session: Session) -> Self {
        Self { api, session }
    }

    /// Give the session back once polling is over.
    pub fn into_session(self) -> Session {
        self.session
    }
}

#[async_trait]
impl SnapshotSource for ApiSnapshotSource {
    async fn fetch_snapshot(&self, recording_id: DbId) -> Result<ProcessingSnapshot, ApiError> {
        self.api.processing_status(&self.session, recording_id).await
    }
}

/// Timing of the poll loop.
#[derive(Debug, Clone, Copy)]
pub struct PollerConfig {
    /// Time between the starts of consecutive polls.
    pub interval: Duration,
    /// Pause between reaching `completed` and emitting the handoff.
    pub handoff_delay: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(crate::config::DEFAULT_POLL_INTERVAL_MS),
            handoff_delay: Duration::from_millis(crate::config::DEFAULT_HANDOFF_DELAY_MS),
        }
    }
}

impl From<&ClientConfig> for PollerConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            interval: config.poll_interval,
            handoff_delay: config.handoff_delay,
        }
    }
}

/// Starts poll loops against a shared snapshot source.
pub struct StatusPoller<S> {
    source: Arc<S>,
    config: PollerConfig,
}

/// Shortest accepted poll interval; `tokio::time::interval` rejects zero.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

impl<S: SnapshotSource + 'static> StatusPoller<S> {
    /// Intervals below [`MIN_POLL_INTERVAL`] are raised to it.
    pub fn new(source: Arc<S>, mut config: PollerConfig) -> Self {
        config.interval = config.interval.max(MIN_POLL_INTERVAL);
        Self { source, config }
    }

    /// Spawn the poll loop for `recording_id`.
    ///
    /// The first fetch is issued immediately. Dropping the returned handle
    /// cancels the loop.
    pub fn start(&self, recording_id: DbId) -> PollHandle {
        let cancel = CancellationToken::new();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let source = Arc::clone(&self.source);
        let config = self.config;
        let task_cancel = cancel.clone();

        let task = tokio::spawn(async move {
            tracing::info!(recording_id, "Starting status poll");
            let outcome = run_poll_loop(source, recording_id, config, &task_cancel, &event_tx).await;
            tracing::info!(recording_id, outcome = ?outcome, "Status poll ended");
            outcome
        });

        PollHandle {
            recording_id,
            cancel,
            events: event_rx,
            task,
        }
    }
}

/// Ownership token for one running poll loop.
///
/// Cancelling (explicitly, or by dropping the handle) stops the timer and
/// discards any response still in flight.
pub struct PollHandle {
    recording_id: DbId,
    cancel: CancellationToken,
    events: mpsc::UnboundedReceiver<PollEvent>,
    task: JoinHandle<PollOutcome>,
}

impl PollHandle {
    pub fn recording_id(&self) -> DbId {
        self.recording_id
    }

    /// Next event from the loop. Returns `None` once the loop has ended
    /// and every event has been received.
    pub async fn next_event(&mut self) -> Option<PollEvent> {
        self.events.recv().await
    }

    /// Request cancellation without waiting for the loop to exit.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the loop to end on its own.
    pub async fn join(mut self) -> Result<PollOutcome, tokio::task::JoinError> {
        (&mut self.task).await
    }

    /// Cancel the loop and wait for it to exit.
    pub async fn stop(self) -> Result<PollOutcome, tokio::task::JoinError> {
        self.cancel();
        self.join().await
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Core poll loop: tick -> fetch -> apply -> report, until terminal.
async fn run_poll_loop<S: SnapshotSource + ?Sized>(
    source: Arc<S>,
    recording_id: DbId,
    config: PollerConfig,
    cancel: &CancellationToken,
    events: &mpsc::UnboundedSender<PollEvent>,
) -> PollOutcome {
    let mut tracker = ProgressTracker::new();
    let mut ticker = tokio::time::interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut seq: u64 = 0;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return PollOutcome::Cancelled { recording_id },
            _ = ticker.tick() => {}
        }

        seq += 1;
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(recording_id, seq, "Dropping in-flight status request");
                return PollOutcome::Cancelled { recording_id };
            }
            result = source.fetch_snapshot(recording_id) => result,
        };

        let snapshot = match result {
            Ok(snapshot) => snapshot,
            Err(e) if e.is_unauthorized() => {
                tracing::warn!(recording_id, error = %e, "Status poll rejected, session required");
                return PollOutcome::Unauthenticated {
                    recording_id,
                    message: e.to_string(),
                };
            }
            Err(e) => {
                tracing::warn!(
                    recording_id,
                    seq,
                    transient = e.is_transient(),
                    error = %e,
                    "Status poll failed, will retry",
                );
                let _ = events.send(PollEvent::SoftError {
                    recording_id,
                    message: e.to_string(),
                });
                continue;
            }
        };

        let view = match tracker.apply(seq, snapshot) {
            TrackerOutcome::Applied(view) => view,
            TrackerOutcome::Stale => {
                tracing::debug!(recording_id, seq, "Discarding stale snapshot");
                continue;
            }
        };

        let status = view.status;
        tracing::debug!(recording_id, seq, progress = view.progress, %status, "Snapshot applied");
        let _ = events.send(PollEvent::Progress(view));

        match status {
            JobStatus::Completed => {
                return hand_off(recording_id, config.handoff_delay, cancel, events).await;
            }
            JobStatus::Failed => {
                let errors = tracker
                    .last_snapshot()
                    .map(ProcessingSnapshot::step_errors)
                    .unwrap_or_default();
                tracing::warn!(recording_id, failed_steps = errors.len(), "Processing failed");
                return PollOutcome::Failed {
                    recording_id,
                    errors,
                };
            }
            JobStatus::Uploaded | JobStatus::Processing => {}
        }
    }
}

/// Hold the completed state for `delay`, then emit the handoff.
async fn hand_off(
    recording_id: DbId,
    delay: Duration,
    cancel: &CancellationToken,
    events: &mpsc::UnboundedSender<PollEvent>,
) -> PollOutcome {
    tracing::info!(recording_id, "Processing completed");

    tokio::select! {
        biased;
        _ = cancel.cancelled() => return PollOutcome::Cancelled { recording_id },
        _ = tokio::time::sleep(delay) => {}
    }

    let _ = events.send(PollEvent::Handoff { recording_id });
    PollOutcome::Completed { recording_id }
}
