//! Events and outcomes reported by the status poller.

use scribe_core::processing::StepKind;
use scribe_core::progress::ProgressView;
use scribe_core::types::DbId;

/// Something the rendering layer should react to while a poll runs.
#[derive(Debug, Clone, PartialEq)]
pub enum PollEvent {
    /// A newer snapshot was applied.
    Progress(ProgressView),

    /// A fetch failed; polling continues and displayed progress is kept.
    SoftError {
        recording_id: DbId,
        /// Human-readable error description.
        message: String,
    },

    /// Processing completed and the handoff delay has elapsed; the caller
    /// should move on to the results view.
    Handoff { recording_id: DbId },
}

/// Why a poll loop ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The job completed and the handoff was emitted.
    Completed { recording_id: DbId },

    /// The job failed. Carries each failed step's error message.
    Failed {
        recording_id: DbId,
        errors: Vec<(StepKind, String)>,
    },

    /// The backend rejected the session; the caller should sign in again.
    Unauthenticated { recording_id: DbId, message: String },

    /// The caller cancelled the poll.
    Cancelled { recording_id: DbId },
}

impl PollOutcome {
    pub fn recording_id(&self) -> DbId {
        match self {
            Self::Completed { recording_id }
            | Self::Failed { recording_id, .. }
            | Self::Unauthenticated { recording_id, .. }
            | Self::Cancelled { recording_id } => *recording_id,
        }
    }
}
