//! End-to-end poll loop tests against the mock backend.

mod common;

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use common::{spawn_backend, status_body};
use scribe_client::events::{PollEvent, PollOutcome};
use scribe_client::poller::{ApiSnapshotSource, PollHandle, PollerConfig, StatusPoller};
use scribe_client::session::Session;
use scribe_core::processing::{StepKind, StepStatus};

fn fast_config() -> PollerConfig {
    PollerConfig {
        interval: Duration::from_millis(20),
        handoff_delay: Duration::from_millis(30),
    }
}

async fn collect(handle: &mut PollHandle) -> Vec<PollEvent> {
    let mut events = Vec::new();
    while let Some(event) = handle.next_event().await {
        events.push(event);
    }
    events
}

// ---------------------------------------------------------------------------
// Test: a full pipeline run reports monotone progress and hands off
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_poll_until_completed() {
    let backend = spawn_backend().await;
    backend.state.script_status(
        11,
        vec![
            status_body(11, "processing", &[("transcription", "in_progress")], Some(60.0)),
            status_body(
                11,
                "processing",
                &[("transcription", "success"), ("translation", "in_progress")],
                Some(10.0),
            ),
            status_body(
                11,
                "processing",
                &[
                    ("transcription", "success"),
                    ("translation", "success"),
                    ("optimization", "success"),
                    ("ai_generation", "in_progress"),
                ],
                Some(90.0),
            ),
            status_body(
                11,
                "completed",
                &[
                    ("transcription", "success"),
                    ("translation", "success"),
                    ("optimization", "success"),
                    ("ai_generation", "success"),
                ],
                None,
            ),
        ],
    );

    let source = Arc::new(ApiSnapshotSource::new(backend.api(), backend.session()));
    let mut handle = StatusPoller::new(source, fast_config()).start(11);
    let events = tokio::time::timeout(Duration::from_secs(5), collect(&mut handle))
        .await
        .expect("poll should finish");
    let outcome = handle.join().await.unwrap();

    assert_eq!(outcome, PollOutcome::Completed { recording_id: 11 });

    let progress: Vec<f64> = events
        .iter()
        .filter_map(|e| match e {
            PollEvent::Progress(view) => Some(view.progress),
            _ => None,
        })
        .collect();
    // The translation reading (25 + 10) is below the displayed 60 and is
    // floored; the last in-progress reading overshoots and is capped.
    assert_eq!(progress, vec![60.0, 60.0, 100.0, 100.0]);
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));
    assert_matches!(events.last(), Some(PollEvent::Handoff { recording_id: 11 }));

    let final_view = events
        .iter()
        .rev()
        .find_map(|e| match e {
            PollEvent::Progress(view) => Some(view),
            _ => None,
        })
        .unwrap();
    assert!(final_view
        .steps
        .iter()
        .all(|badge| badge.status == StepStatus::Success && badge.progress == 100.0));
    assert_eq!(backend.state.status_calls(), 4);
}

// ---------------------------------------------------------------------------
// Test: a failed job stops polling and carries the step error
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_poll_until_failed() {
    let backend = spawn_backend().await;
    let mut failed = status_body(
        12,
        "failed",
        &[("transcription", "success"), ("translation", "failed")],
        None,
    );
    failed["processing_steps"][1]["error"] = "Unsupported language".into();
    backend.state.script_status(12, vec![failed]);

    let source = Arc::new(ApiSnapshotSource::new(backend.api(), backend.session()));
    let handle = StatusPoller::new(source, fast_config()).start(12);
    let outcome = handle.join().await.unwrap();

    assert_matches!(
        outcome,
        PollOutcome::Failed { ref errors, .. }
            if errors == &vec![(StepKind::Translation, "Unsupported language".to_string())]
    );

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(backend.state.status_calls(), 1);
}

// ---------------------------------------------------------------------------
// Test: a rejected token ends the poll as unauthenticated
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_poll_with_expired_token() {
    let backend = spawn_backend().await;
    backend
        .state
        .script_status(13, vec![status_body(13, "processing", &[], None)]);

    let source = Arc::new(ApiSnapshotSource::new(
        backend.api(),
        Session::from_token("expired-token"),
    ));
    let handle = StatusPoller::new(source, fast_config()).start(13);
    let outcome = handle.join().await.unwrap();

    assert_matches!(outcome, PollOutcome::Unauthenticated { recording_id: 13, ref message }
        if message.contains("Token has expired"));
}

// ---------------------------------------------------------------------------
// Test: a 422 token rejection ends the poll instead of retrying
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_poll_with_malformed_token() {
    let backend = spawn_backend().await;
    backend
        .state
        .script_status(14, vec![status_body(14, "processing", &[], None)]);

    let source = Arc::new(ApiSnapshotSource::new(
        backend.api(),
        Session::from_token(common::MALFORMED_TOKEN),
    ));
    let mut handle = StatusPoller::new(source, fast_config()).start(14);
    let events = collect(&mut handle).await;
    let outcome = handle.join().await.unwrap();

    assert!(events.is_empty());
    assert_matches!(outcome, PollOutcome::Unauthenticated { recording_id: 14, .. });
    assert_eq!(backend.state.status_calls(), 0);
}

// ---------------------------------------------------------------------------
// Test: a missing recording is a soft error; polling continues until stopped
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_poll_soft_errors_until_stopped() {
    let backend = spawn_backend().await;

    let source = Arc::new(ApiSnapshotSource::new(backend.api(), backend.session()));
    let mut handle = StatusPoller::new(source, fast_config()).start(404);

    for _ in 0..3 {
        let event = tokio::time::timeout(Duration::from_secs(2), handle.next_event())
            .await
            .unwrap();
        assert_matches!(event, Some(PollEvent::SoftError { recording_id: 404, .. }));
    }

    let outcome = handle.stop().await.unwrap();
    assert_eq!(outcome, PollOutcome::Cancelled { recording_id: 404 });

    let calls = backend.state.status_calls();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(backend.state.status_calls(), calls);
}
