//! Processing-status data model.
//!
//! The backend reports a recording's pipeline state as a
//! [`ProcessingSnapshot`]: an overall status plus a possibly partial list
//! of per-step records. The list is treated as a lookup keyed by
//! [`StepKind`]; an absent step reads as [`StepStatus::Pending`].
//!
//! Deserialization is lenient: unknown step statuses read as `pending`,
//! unknown job statuses read as `processing`, and empty or unparseable
//! timestamps read as `None`.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Step identifiers
// ---------------------------------------------------------------------------

/// One of the four pipeline stages, in pipeline order.
///
/// The derived `Ord` follows declaration order, which is the fixed total
/// order transcription < translation < optimization < ai_generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Transcription,
    Translation,
    Optimization,
    AiGeneration,
}

impl StepKind {
    /// All steps in pipeline order.
    pub const ORDER: [StepKind; 4] = [
        StepKind::Transcription,
        StepKind::Translation,
        StepKind::Optimization,
        StepKind::AiGeneration,
    ];

    /// Zero-based position of this step in [`StepKind::ORDER`].
    pub fn index(self) -> usize {
        match self {
            Self::Transcription => 0,
            Self::Translation => 1,
            Self::Optimization => 2,
            Self::AiGeneration => 3,
        }
    }

    /// Wire identifier used by the backend.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transcription => "transcription",
            Self::Translation => "translation",
            Self::Optimization => "optimization",
            Self::AiGeneration => "ai_generation",
        }
    }

    /// Display name shown on the step badge.
    pub fn label(self) -> &'static str {
        match self {
            Self::Transcription => "AI Transcription",
            Self::Translation => "Language Processing",
            Self::Optimization => "Text Optimization",
            Self::AiGeneration => "AI Analysis",
        }
    }

    /// One-line description shown under the badge label.
    pub fn description(self) -> &'static str {
        match self {
            Self::Transcription => "Converting speech to text",
            Self::Translation => "Translating and optimizing text",
            Self::Optimization => "Cleaning and preparing content",
            Self::AiGeneration => "Generating meeting insights",
        }
    }
}

impl FromStr for StepKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ORDER
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CoreError::UnknownValue {
                kind: "processing step",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A step identifier as reported on the wire.
///
/// Identifiers outside the fixed pipeline are kept so they can be logged,
/// but they never contribute to progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepKey {
    Known(StepKind),
    Other(String),
}

impl StepKey {
    pub fn kind(&self) -> Option<StepKind> {
        match self {
            Self::Known(kind) => Some(*kind),
            Self::Other(_) => None,
        }
    }
}

impl From<StepKind> for StepKey {
    fn from(kind: StepKind) -> Self {
        Self::Known(kind)
    }
}

impl<'de> Deserialize<'de> for StepKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.parse::<StepKind>() {
            Ok(kind) => Self::Known(kind),
            Err(_) => Self::Other(raw),
        })
    }
}

impl Serialize for StepKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Known(kind) => serializer.serialize_str(kind.as_str()),
            Self::Other(raw) => serializer.serialize_str(raw),
        }
    }
}

// ---------------------------------------------------------------------------
// Statuses
// ---------------------------------------------------------------------------

/// Status of a single pipeline step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    #[default]
    Pending,
    InProgress,
    Success,
    Failed,
}

impl StepStatus {
    /// Parse a wire value; anything unrecognised is `Pending`.
    pub fn parse_lossy(raw: &str) -> Self {
        match raw {
            "in_progress" => Self::InProgress,
            "success" => Self::Success,
            "failed" => Self::Failed,
            _ => Self::Pending,
        }
    }

    /// Text for the status side of a step badge.
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InProgress => "Processing...",
            Self::Success => "Completed",
            Self::Failed => "Failed",
        }
    }
}

impl<'de> Deserialize<'de> for StepStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(Self::parse_lossy).unwrap_or_default())
    }
}

/// Overall status of a recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Uploaded but processing has not been started.
    Uploaded,
    #[default]
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Parse a wire value; anything unrecognised is `Processing`.
    pub fn parse_lossy(raw: &str) -> Self {
        match raw {
            "uploaded" => Self::Uploaded,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            _ => Self::Processing,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uploaded => "uploaded",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// `completed` and `failed` admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for JobStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(Self::parse_lossy).unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One per-step record from the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingStep {
    pub step: StepKey,
    #[serde(default)]
    pub status: StepStatus,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_timestamp")]
    pub timestamp: Option<Timestamp>,
}

impl ProcessingStep {
    pub fn new(kind: StepKind, status: StepStatus) -> Self {
        Self {
            step: StepKey::Known(kind),
            status,
            error: None,
            timestamp: None,
        }
    }
}

/// The backend's view of one recording's pipeline at poll time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingSnapshot {
    #[serde(rename = "recording_id", alias = "job_id")]
    pub job_id: DbId,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(
        rename = "processing_steps",
        alias = "steps",
        default,
        deserialize_with = "deserialize_steps"
    )]
    pub steps: Vec<ProcessingStep>,
    #[serde(default)]
    pub current_step_progress: Option<f64>,
}

impl ProcessingSnapshot {
    /// Recorded status of `kind`, or `Pending` when the step is absent.
    ///
    /// When the backend repeats a step identifier the first record wins.
    pub fn step_status(&self, kind: StepKind) -> StepStatus {
        self.step(kind).map(|s| s.status).unwrap_or_default()
    }

    /// The record for `kind`, if the backend reported one.
    pub fn step(&self, kind: StepKind) -> Option<&ProcessingStep> {
        self.steps.iter().find(|s| s.step.kind() == Some(kind))
    }

    /// The step named by the first `in_progress` record, in snapshot order.
    ///
    /// `None` when that record's identifier is unknown, or when it repeats
    /// an identifier whose first record says otherwise, so this always
    /// agrees with [`Self::step_status`].
    pub fn in_progress_step(&self) -> Option<StepKind> {
        let kind = self
            .steps
            .iter()
            .find(|s| s.status == StepStatus::InProgress)?
            .step
            .kind()?;
        (self.step_status(kind) == StepStatus::InProgress).then_some(kind)
    }

    /// Error messages of every failed step, paired with the step.
    pub fn step_errors(&self) -> Vec<(StepKind, String)> {
        StepKind::ORDER
            .into_iter()
            .filter_map(|kind| {
                let step = self.step(kind)?;
                if step.status != StepStatus::Failed {
                    return None;
                }
                let message = step
                    .error
                    .clone()
                    .unwrap_or_else(|| "Unknown error".to_string());
                Some((kind, message))
            })
            .collect()
    }

    /// Most recent step timestamp, used to detect stale responses.
    pub fn latest_timestamp(&self) -> Option<Timestamp> {
        self.steps.iter().filter_map(|s| s.timestamp).max()
    }
}

// ---------------------------------------------------------------------------
// Lenient deserializers
// ---------------------------------------------------------------------------

/// Parse a backend timestamp.
///
/// Accepts RFC 3339 and the naive ISO-8601 form the backend writes
/// (interpreted as UTC). Empty or unparseable input yields `None`.
pub fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn deserialize_lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<Timestamp>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

/// `null` and a missing list both read as "no steps reported".
fn deserialize_steps<'de, D>(deserializer: D) -> Result<Vec<ProcessingStep>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<ProcessingStep>>::deserialize(deserializer)?.unwrap_or_default())
}
