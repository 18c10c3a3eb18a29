//! Meeting history records and the client-side filters applied to them.
//!
//! The backend returns the user's recordings unfiltered; search, status
//! filtering, ordering and the dashboard counters are computed here.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::processing::{parse_timestamp, JobStatus};
use crate::types::{DbId, Timestamp};

/// Window for the "this week" dashboard counter.
pub const RECENT_WINDOW_DAYS: i64 = 7;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One row of `GET /api/meetings`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingSummary {
    pub id: DbId,
    pub title: String,
    pub filename: String,
    /// Raw upload date as sent by the backend (naive UTC ISO-8601).
    pub upload_date: String,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub has_transcription: bool,
    #[serde(default)]
    pub has_notes: bool,
}

impl MeetingSummary {
    /// Parsed upload date, `None` if the backend sent something unreadable.
    pub fn uploaded_at(&self) -> Option<Timestamp> {
        parse_timestamp(&self.upload_date)
    }

    /// Notes can be opened once processing finished and produced them.
    pub fn notes_available(&self) -> bool {
        self.has_notes && self.status == JobStatus::Completed
    }
}

/// Full record from `GET /api/meetings/{id}`.
///
/// `transcription` and `notes` are free-form JSON produced by the AI
/// pipeline and are passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingDetail {
    pub id: DbId,
    pub title: String,
    pub filename: String,
    pub upload_date: String,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub transcription: serde_json::Value,
    #[serde(default)]
    pub notes: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Query options
// ---------------------------------------------------------------------------

/// History status filter: everything, or one overall status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(JobStatus),
}

impl StatusFilter {
    pub fn matches(self, status: JobStatus) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => wanted == status,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "uploaded" => Ok(Self::Only(JobStatus::Uploaded)),
            "processing" => Ok(Self::Only(JobStatus::Processing)),
            "completed" => Ok(Self::Only(JobStatus::Completed)),
            "failed" => Ok(Self::Only(JobStatus::Failed)),
            other => Err(CoreError::UnknownValue {
                kind: "status filter",
                value: other.to_string(),
            }),
        }
    }
}

/// History ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    DateDesc,
    DateAsc,
    TitleAsc,
    TitleDesc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DateDesc => "date_desc",
            Self::DateAsc => "date_asc",
            Self::TitleAsc => "title_asc",
            Self::TitleDesc => "title_desc",
        }
    }

    fn compare(self, a: &MeetingSummary, b: &MeetingSummary) -> Ordering {
        match self {
            Self::DateDesc => b.uploaded_at().cmp(&a.uploaded_at()),
            Self::DateAsc => a.uploaded_at().cmp(&b.uploaded_at()),
            Self::TitleAsc => compare_titles(&a.title, &b.title),
            Self::TitleDesc => compare_titles(&b.title, &a.title),
        }
    }
}

impl FromStr for SortOrder {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::DateDesc, Self::DateAsc, Self::TitleAsc, Self::TitleDesc]
            .into_iter()
            .find(|order| order.as_str() == s)
            .ok_or_else(|| CoreError::UnknownValue {
                kind: "sort order",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive title comparison, falling back to byte order so the
/// result is total.
fn compare_titles(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Search, filter and ordering options for the history view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryQuery {
    /// Substring matched case-insensitively against title and filename.
    /// Surrounding whitespace is ignored; a blank term matches everything.
    pub search: Option<String>,
    pub status: StatusFilter,
    pub sort: SortOrder,
}

impl HistoryQuery {
    fn matches(&self, meeting: &MeetingSummary) -> bool {
        let search_ok = match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => {
                let term = term.to_lowercase();
                meeting.title.to_lowercase().contains(&term)
                    || meeting.filename.to_lowercase().contains(&term)
            }
        };
        search_ok && self.status.matches(meeting.status)
    }

    /// Apply the query to a list of meetings. The sort is stable, so
    /// meetings that compare equal keep their backend order.
    pub fn apply(&self, meetings: &[MeetingSummary]) -> Vec<MeetingSummary> {
        let mut filtered: Vec<MeetingSummary> = meetings
            .iter()
            .filter(|m| self.matches(m))
            .cloned()
            .collect();
        filtered.sort_by(|a, b| self.sort.compare(a, b));
        filtered
    }
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Document format offered by the notes export endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Pdf,
    Word,
}

impl ExportFormat {
    /// Path segment of `GET /api/export/{id}/{format}`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Word => "word",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Word => "docx",
        }
    }

    /// `meeting_notes_{id}.pdf` or `meeting_notes_{id}.docx`.
    pub fn default_filename(self, recording_id: DbId) -> String {
        format!("meeting_notes_{recording_id}.{}", self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pdf" => Ok(Self::Pdf),
            "word" | "docx" => Ok(Self::Word),
            other => Err(CoreError::UnknownValue {
                kind: "export format",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

/// Counters shown on the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total_meetings: usize,
    pub completed_meetings: usize,
    pub processing_meetings: usize,
    /// Uploaded within [`RECENT_WINDOW_DAYS`] of `now`.
    pub this_week_meetings: usize,
}

impl DashboardStats {
    pub fn from_meetings(meetings: &[MeetingSummary], now: Timestamp) -> Self {
        let cutoff = now - chrono::Duration::days(RECENT_WINDOW_DAYS);
        let count_status = |status: JobStatus| meetings.iter().filter(|m| m.status == status).count();

        Self {
            total_meetings: meetings.len(),
            completed_meetings: count_status(JobStatus::Completed),
            processing_meetings: count_status(JobStatus::Processing),
            this_week_meetings: meetings
                .iter()
                .filter(|m| m.uploaded_at().is_some_and(|at| at >= cutoff))
                .count(),
        }
    }
}
