//! Plain-text rendering of progress, history and dashboard data.
//!
//! Every function returns a `String`; printing is left to the caller.

use std::fmt::Write as _;

use scribe_core::meetings::{DashboardStats, MeetingDetail, MeetingSummary};
use scribe_core::processing::StepKind;
use scribe_core::progress::{ProgressView, StepBadge};

/// Width of the overall progress bar, in cells.
pub const BAR_WIDTH: usize = 30;

/// `[#########---------]  45%`
pub fn progress_bar(progress: f64, width: usize) -> String {
    let clamped = if progress.is_nan() { 0.0 } else { progress.clamp(0.0, 100.0) };
    let filled = ((clamped / 100.0) * width as f64).round() as usize;
    format!(
        "[{}{}] {:>3.0}%",
        "#".repeat(filled),
        "-".repeat(width - filled),
        clamped
    )
}

/// One line per step: label, status and the step's own percentage,
/// followed by the error for failed steps.
pub fn step_line(badge: &StepBadge) -> String {
    let mut line = format!(
        "  {:<20} {:<14} {:>3.0}%",
        badge.label, badge.status_label, badge.progress
    );
    if let Some(error) = &badge.error {
        let _ = write!(line, "\n      ! {error}");
    }
    line
}

/// Full progress panel for one applied snapshot.
pub fn progress_panel(view: &ProgressView) -> String {
    let mut out = format!(
        "Recording {} ({}) {}",
        view.recording_id,
        view.status,
        progress_bar(view.progress, BAR_WIDTH)
    );
    for badge in &view.steps {
        out.push('\n');
        out.push_str(&step_line(badge));
    }
    out
}

/// Error list shown when a job fails.
pub fn step_errors(errors: &[(StepKind, String)]) -> String {
    if errors.is_empty() {
        return "Processing failed without a step error".to_string();
    }
    errors
        .iter()
        .map(|(kind, message)| format!("{}: {message}", kind.label()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// History table, one meeting per row.
pub fn meeting_table(meetings: &[MeetingSummary]) -> String {
    if meetings.is_empty() {
        return "No meetings found".to_string();
    }

    let mut out = format!("{:>6}  {:<11} {:<19}  {}", "ID", "STATUS", "UPLOADED", "TITLE");
    for meeting in meetings {
        let uploaded = meeting
            .uploaded_at()
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        let notes = if meeting.notes_available() { " [notes]" } else { "" };
        let _ = write!(
            out,
            "\n{:>6}  {:<11} {:<19}  {}{notes}",
            meeting.id,
            meeting.status.as_str(),
            uploaded,
            meeting.title
        );
    }
    out
}

pub fn dashboard(stats: &DashboardStats) -> String {
    format!(
        "Total meetings:   {}\nCompleted:        {}\nProcessing:       {}\nThis week:        {}",
        stats.total_meetings,
        stats.completed_meetings,
        stats.processing_meetings,
        stats.this_week_meetings
    )
}

/// Header plus pretty-printed transcription and notes.
pub fn meeting_detail(meeting: &MeetingDetail) -> String {
    let mut out = format!(
        "{} (#{}, {})\nFile: {}\nUploaded: {}",
        meeting.title,
        meeting.id,
        meeting.status.as_str(),
        meeting.filename,
        meeting.upload_date
    );
    for (heading, value) in [("Notes", &meeting.notes), ("Transcription", &meeting.transcription)] {
        if value.is_null() {
            continue;
        }
        let body = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
        let _ = write!(out, "\n\n{heading}:\n{body}");
    }
    out
}
