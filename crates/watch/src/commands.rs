//! Subcommand implementations.
//!
//! Each command takes an already-built [`BackendApi`] and an owned or
//! borrowed [`Session`]; nothing here reads the environment.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::Utc;
use scribe_client::api::{BackendApi, UploadRequest};
use scribe_client::config::ClientConfig;
use scribe_client::events::{PollEvent, PollOutcome};
use scribe_client::poller::{ApiSnapshotSource, PollerConfig, StatusPoller};
use scribe_client::session::Session;
use scribe_core::meetings::{DashboardStats, ExportFormat, HistoryQuery};
use scribe_core::types::DbId;

use crate::render;

/// Build a session from the configured token, or sign in with the
/// configured credentials.
pub async fn open_session(api: &BackendApi, config: &ClientConfig) -> anyhow::Result<Session> {
    if let Some(token) = &config.token {
        let session = Session::from_token(token.clone());
        let user = api
            .validate(&session)
            .await
            .context("SCRIBE_TOKEN was rejected by the backend")?;
        tracing::debug!(user_id = user.id, "Token validated");
        return Ok(session.with_user(user));
    }

    if let Some(credentials) = &config.credentials {
        return api
            .login(&credentials.email, &credentials.password)
            .await
            .context("Sign-in failed");
    }

    bail!("No session: set SCRIBE_TOKEN, or SCRIBE_EMAIL and SCRIBE_PASSWORD")
}

/// Poll a recording until it reaches a terminal state or the user
/// interrupts, printing a progress panel for every applied snapshot.
pub async fn watch(
    api: &BackendApi,
    session: Session,
    config: PollerConfig,
    recording_id: DbId,
) -> anyhow::Result<PollOutcome> {
    let source = Arc::new(ApiSnapshotSource::new(api.clone(), session));
    let mut handle = StatusPoller::new(source, config).start(recording_id);

    loop {
        tokio::select! {
            event = handle.next_event() => match event {
                Some(event) => print_event(&event),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!(recording_id, "Interrupted, stopping poll");
                handle.cancel();
            }
        }
    }

    Ok(handle.join().await?)
}

fn print_event(event: &PollEvent) {
    match event {
        PollEvent::Progress(view) => println!("{}\n", render::progress_panel(view)),
        PollEvent::SoftError { message, .. } => eprintln!("Status check failed: {message}"),
        PollEvent::Handoff { recording_id } => {
            println!("Notes are ready: scribe-watch show {recording_id}");
        }
    }
}

/// Turn a poll outcome into the process result.
pub fn report_outcome(outcome: PollOutcome) -> anyhow::Result<()> {
    match outcome {
        PollOutcome::Completed { .. } => Ok(()),
        PollOutcome::Cancelled { recording_id } => {
            println!("Stopped watching recording {recording_id}");
            Ok(())
        }
        PollOutcome::Failed {
            recording_id,
            errors,
        } => {
            eprintln!("{}", render::step_errors(&errors));
            bail!("Processing of recording {recording_id} failed")
        }
        PollOutcome::Unauthenticated { message, .. } => {
            bail!("Session rejected ({message}); sign in again")
        }
    }
}

/// Options for `upload`.
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    pub title: Option<String>,
    pub language: Option<String>,
    /// Start processing after the upload.
    pub process: bool,
}

/// Upload a file and optionally start processing it. Returns the new
/// recording id.
pub async fn upload(
    api: &BackendApi,
    session: &Session,
    path: &Path,
    options: UploadOptions,
) -> anyhow::Result<DbId> {
    let mut request = UploadRequest::from_path(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    request.title = options.title;
    request.language = options.language;

    let recording_id = api.upload_recording(session, request).await?;
    println!("Uploaded {} as recording {recording_id}", path.display());

    if options.process {
        api.start_processing(session, recording_id).await?;
        println!("Processing started");
    }
    Ok(recording_id)
}

/// Print the filtered and sorted history.
pub async fn list(
    api: &BackendApi,
    session: &Session,
    query: &HistoryQuery,
    limit: Option<u32>,
) -> anyhow::Result<()> {
    let meetings = api.list_meetings(session, limit).await?;
    let shown = query.apply(&meetings);
    tracing::debug!(fetched = meetings.len(), shown = shown.len(), sort = %query.sort, "History loaded");
    println!("{}", render::meeting_table(&shown));
    Ok(())
}

pub async fn stats(api: &BackendApi, session: &Session) -> anyhow::Result<()> {
    let meetings = api.list_meetings(session, None).await?;
    let stats = DashboardStats::from_meetings(&meetings, Utc::now());
    println!("{}", render::dashboard(&stats));
    Ok(())
}

pub async fn show(api: &BackendApi, session: &Session, recording_id: DbId) -> anyhow::Result<()> {
    let meeting = api.get_meeting(session, recording_id).await?;
    println!("{}", render::meeting_detail(&meeting));
    Ok(())
}

pub async fn delete(api: &BackendApi, session: &Session, recording_id: DbId) -> anyhow::Result<()> {
    api.delete_meeting(session, recording_id).await?;
    println!("Deleted recording {recording_id}");
    Ok(())
}

/// Where `export` writes: `out` when given, else the backend's download
/// name in the working directory.
pub fn export_path(out: Option<PathBuf>, recording_id: DbId, format: ExportFormat) -> PathBuf {
    out.unwrap_or_else(|| PathBuf::from(format.default_filename(recording_id)))
}

/// Download a meeting's notes as a document and write it to disk.
pub async fn export(
    api: &BackendApi,
    session: &Session,
    recording_id: DbId,
    format: ExportFormat,
    out: Option<PathBuf>,
) -> anyhow::Result<PathBuf> {
    let bytes = api.export_meeting(session, recording_id, format).await?;
    let path = export_path(out, recording_id, format);
    tokio::fs::write(&path, &bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Saved {} ({} bytes)", path.display(), bytes.len());
    Ok(path)
}

pub async fn translate(
    api: &BackendApi,
    session: &Session,
    text: &str,
    target_language: &str,
) -> anyhow::Result<()> {
    if text.trim().is_empty() {
        bail!("Nothing to translate");
    }
    let translated = api.translate(session, text, target_language).await?;
    println!("{translated}");
    Ok(())
}

pub async fn whoami(api: &BackendApi, session: &Session) -> anyhow::Result<()> {
    let user = match session.user() {
        Some(user) => user.clone(),
        None => api.validate(session).await?,
    };
    println!("{} <{}> (id {})", user.full_name, user.email, user.id);
    if let Some(expires_at) = session.expires_at() {
        println!("Session expires {}", expires_at.format("%Y-%m-%d %H:%M UTC"));
    }
    Ok(())
}
