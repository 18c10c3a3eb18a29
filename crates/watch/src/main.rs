//! `scribe-watch` -- command-line client for the meeting-processing backend.
//!
//! Uploads recordings, follows their processing pipeline with a live
//! progress panel, browses the meeting history and exports notes.
//!
//! # Environment variables
//!
//! | Variable                      | Required | Default                 | Description                            |
//! |-------------------------------|----------|-------------------------|----------------------------------------|
//! | `SCRIBE_API_URL`              | no       | `http://localhost:5000` | Backend base URL                       |
//! | `SCRIBE_TOKEN`                | no*      | --                      | Pre-issued bearer token                |
//! | `SCRIBE_EMAIL`                | no*      | --                      | Sign-in email, used without a token    |
//! | `SCRIBE_PASSWORD`             | no*      | --                      | Sign-in password                       |
//! | `SCRIBE_POLL_INTERVAL_MS`     | no       | `2000`                  | Milliseconds between status polls      |
//! | `SCRIBE_HANDOFF_DELAY_MS`     | no       | `2000`                  | Pause after completion before handoff  |
//! | `SCRIBE_REQUEST_TIMEOUT_SECS` | no       | `30`                    | HTTP request timeout                   |
//!
//! \* Either `SCRIBE_TOKEN` or both `SCRIBE_EMAIL` and `SCRIBE_PASSWORD`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use scribe_client::api::BackendApi;
use scribe_client::config::ClientConfig;
use scribe_client::poller::PollerConfig;
use scribe_core::meetings::{ExportFormat, HistoryQuery, SortOrder, StatusFilter};
use scribe_core::types::DbId;
use scribe_watch::commands::{self, UploadOptions};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "scribe-watch", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Follow a recording's processing until it completes or fails
    Watch {
        recording_id: DbId,
    },
    /// Upload a recording, start processing and follow it
    Upload(UploadArgs),
    /// List meetings, newest first by default
    List(ListArgs),
    /// Dashboard counters
    Stats,
    /// Show a meeting's notes and transcription
    Show {
        recording_id: DbId,
    },
    /// Delete a meeting and its recording
    Delete {
        recording_id: DbId,
    },
    /// Save a meeting's notes as a PDF or Word document
    Export {
        recording_id: DbId,
        /// pdf or word
        #[arg(long, default_value = "pdf")]
        format: ExportFormat,
        /// Output file (defaults to meeting_notes_<id>.<ext>)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Translate text with the backend's translation service
    Translate {
        text: String,
        /// Target language code
        #[arg(long, default_value = "es")]
        to: String,
    },
    /// Show the signed-in user
    Whoami,
}

#[derive(clap::Args)]
struct UploadArgs {
    /// Audio or video file to upload
    file: PathBuf,
    /// Display title (defaults to the filename)
    #[arg(long)]
    title: Option<String>,
    /// Spoken language code, e.g. `en`
    #[arg(long)]
    language: Option<String>,
    /// Upload only; don't start processing
    #[arg(long)]
    no_process: bool,
    /// Start processing but don't follow it
    #[arg(long)]
    no_watch: bool,
}

#[derive(clap::Args)]
struct ListArgs {
    /// Case-insensitive match on title or filename
    #[arg(long)]
    search: Option<String>,
    /// all, uploaded, processing, completed or failed
    #[arg(long, default_value = "all")]
    status: StatusFilter,
    /// date_desc, date_asc, title_asc or title_desc
    #[arg(long, default_value = "date_desc")]
    sort: SortOrder,
    /// Fetch at most this many meetings from the backend
    #[arg(long)]
    limit: Option<u32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scribe_watch=info,scribe_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = ClientConfig::from_env()?;
    let api = BackendApi::from_config(&config)?;

    tracing::debug!(api_url = %config.api_url, "Using backend");

    let session = commands::open_session(&api, &config).await?;
    let poller_config = PollerConfig::from(&config);

    match cli.command {
        Command::Watch { recording_id } => {
            let outcome = commands::watch(&api, session, poller_config, recording_id).await?;
            commands::report_outcome(outcome)
        }
        Command::Upload(args) => {
            let options = UploadOptions {
                title: args.title,
                language: args.language,
                process: !args.no_process,
            };
            let recording_id = commands::upload(&api, &session, &args.file, options).await?;
            if args.no_process || args.no_watch {
                return Ok(());
            }
            let outcome = commands::watch(&api, session, poller_config, recording_id).await?;
            commands::report_outcome(outcome)
        }
        Command::List(args) => {
            let query = HistoryQuery {
                search: args.search,
                status: args.status,
                sort: args.sort,
            };
            commands::list(&api, &session, &query, args.limit).await
        }
        Command::Stats => commands::stats(&api, &session).await,
        Command::Show { recording_id } => commands::show(&api, &session, recording_id).await,
        Command::Delete { recording_id } => commands::delete(&api, &session, recording_id).await,
        Command::Export {
            recording_id,
            format,
            out,
        } => commands::export(&api, &session, recording_id, format, out)
            .await
            .map(|_| ()),
        Command::Translate { text, to } => commands::translate(&api, &session, &text, &to).await,
        Command::Whoami => commands::whoami(&api, &session).await,
    }
}
