//! Processing-progress aggregation.
//!
//! Maps a [`ProcessingSnapshot`] to a single 0-100 value for the overall
//! progress bar and to one [`StepBadge`] per pipeline step. The overall
//! value never decreases within a job: [`aggregate_progress`] floors the
//! result at the previously displayed value, and [`ProgressTracker`]
//! additionally drops responses that arrive out of order.

use serde::Serialize;

use crate::processing::{JobStatus, ProcessingSnapshot, StepKind, StepStatus};
use crate::types::{DbId, Timestamp};

/// Points each completed step contributes to the overall progress.
pub const POINTS_PER_STEP: f64 = 25.0;

/// Upper bound of every progress value.
pub const MAX_PROGRESS: f64 = 100.0;

/// Factor mapping `current_step_progress` onto a step badge's own bar.
const STEP_BADGE_SCALE: f64 = 4.0;

// ---------------------------------------------------------------------------
// Overall progress
// ---------------------------------------------------------------------------

/// Compute the next overall progress value from a snapshot.
///
/// `prev` is the value currently displayed (0 for a fresh job). Completed
/// steps are worth [`POINTS_PER_STEP`] each. While a step is in progress
/// the total is instead `index * 25 + current_step_progress`, with the
/// within-step figure added as reported rather than rescaled to the
/// step's 25-point share. The result is floored at `prev`, capped at 100,
/// and forced to 100 once the job is `completed`.
pub fn aggregate_progress(snapshot: &ProcessingSnapshot, prev: f64) -> f64 {
    if snapshot.status == JobStatus::Completed {
        return MAX_PROGRESS;
    }

    let completed_count = StepKind::ORDER
        .into_iter()
        .filter(|kind| snapshot.step_status(*kind) == StepStatus::Success)
        .count();
    let base = completed_count as f64 * POINTS_PER_STEP;

    let total = match snapshot.in_progress_step() {
        Some(kind) => {
            let within = clamp_percent(snapshot.current_step_progress.unwrap_or(0.0));
            kind.index() as f64 * POINTS_PER_STEP + within
        }
        None => base,
    };

    total.max(clamp_percent(prev)).min(MAX_PROGRESS)
}

/// Clamp to `[0, 100]`, mapping NaN to 0.
fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, MAX_PROGRESS)
    }
}

// ---------------------------------------------------------------------------
// Step badges
// ---------------------------------------------------------------------------

/// Render-ready view of one pipeline step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepBadge {
    pub step: StepKind,
    pub label: &'static str,
    pub description: &'static str,
    pub status: StepStatus,
    pub status_label: &'static str,
    /// The step's own bar, 0-100.
    pub progress: f64,
    /// Backend error message, only for failed steps.
    pub error: Option<String>,
}

/// Progress of a single step's own bar.
///
/// `success` is full, `in_progress` scales `current_step_progress` by 4
/// (capped at 100), anything else is empty.
pub fn step_progress(snapshot: &ProcessingSnapshot, kind: StepKind) -> f64 {
    match snapshot.step_status(kind) {
        StepStatus::Success => MAX_PROGRESS,
        StepStatus::InProgress => {
            let within = snapshot.current_step_progress.unwrap_or(0.0);
            clamp_percent(within * STEP_BADGE_SCALE)
        }
        StepStatus::Pending | StepStatus::Failed => 0.0,
    }
}

/// One badge per pipeline step, in pipeline order.
pub fn step_badges(snapshot: &ProcessingSnapshot) -> Vec<StepBadge> {
    StepKind::ORDER
        .into_iter()
        .map(|kind| {
            let status = snapshot.step_status(kind);
            let error = match status {
                StepStatus::Failed => snapshot.step(kind).and_then(|s| s.error.clone()),
                _ => None,
            };
            StepBadge {
                step: kind,
                label: kind.label(),
                description: kind.description(),
                status,
                status_label: status.label(),
                progress: step_progress(snapshot, kind),
                error,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

/// Result of offering a snapshot to a [`ProgressTracker`].
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerOutcome {
    /// The snapshot was newer than anything seen; display state changed.
    Applied(ProgressView),
    /// The snapshot was older than the last applied one and was dropped.
    Stale,
}

/// Everything the rendering layer needs after one applied snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressView {
    pub recording_id: DbId,
    pub status: JobStatus,
    pub progress: f64,
    pub steps: Vec<StepBadge>,
}

/// Display state for one job: displayed progress plus the last applied
/// snapshot.
///
/// Each response is tagged with the sequence number of the request that
/// produced it. A response is applied only if its sequence is newer than
/// the last applied one and its newest step timestamp does not go back in
/// time.
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    progress: f64,
    last_seq: Option<u64>,
    last_timestamp: Option<Timestamp>,
    last_snapshot: Option<ProcessingSnapshot>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently displayed overall progress.
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// The most recently applied snapshot.
    pub fn last_snapshot(&self) -> Option<&ProcessingSnapshot> {
        self.last_snapshot.as_ref()
    }

    /// Offer the response to request `seq`.
    pub fn apply(&mut self, seq: u64, snapshot: ProcessingSnapshot) -> TrackerOutcome {
        if self.last_seq.is_some_and(|last| seq <= last) {
            return TrackerOutcome::Stale;
        }

        let timestamp = snapshot.latest_timestamp();
        if let (Some(last), Some(current)) = (self.last_timestamp, timestamp) {
            if current < last {
                return TrackerOutcome::Stale;
            }
        }

        self.progress = aggregate_progress(&snapshot, self.progress);
        self.last_seq = Some(seq);
        if timestamp.is_some() {
            self.last_timestamp = timestamp;
        }

        let view = ProgressView {
            recording_id: snapshot.job_id,
            status: snapshot.status,
            progress: self.progress,
            steps: step_badges(&snapshot),
        };
        self.last_snapshot = Some(snapshot);
        TrackerOutcome::Applied(view)
    }
}
