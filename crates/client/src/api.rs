//! REST API client for the meeting-processing backend.
//!
//! Wraps the backend's HTTP endpoints (auth, upload, processing control,
//! processing status, meeting history, export, translation) using
//! [`reqwest`]. Every authenticated call takes the caller's [`Session`]
//! explicitly.

use std::path::Path;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use scribe_core::meetings::{ExportFormat, MeetingDetail, MeetingSummary};
use scribe_core::processing::ProcessingSnapshot;
use scribe_core::types::DbId;

use crate::config::ClientConfig;
use crate::session::{AuthResponse, Session, UserProfile};

/// HTTP client for one backend.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct BackendApi {
    client: reqwest::Client,
    api_url: String,
}

/// A recording to upload.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub filename: String,
    pub bytes: Vec<u8>,
    /// Display title; the backend falls back to the filename.
    pub title: Option<String>,
    /// Spoken language code, e.g. `en`.
    pub language: Option<String>,
}

impl UploadRequest {
    /// Read a recording from disk.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "recording".to_string());
        Ok(Self {
            filename,
            bytes,
            title: None,
            language: None,
        })
    }
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    full_name: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct ValidateResponse {
    user: UserProfile,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    recording_id: DbId,
}

#[derive(Debug, Deserialize)]
struct MeetingListResponse {
    #[serde(default)]
    meetings: Vec<MeetingSummary>,
}

#[derive(Debug, Deserialize)]
struct MeetingResponse {
    meeting: MeetingDetail,
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    text: &'a str,
    target_language: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    translated_text: String,
}

/// Shape of the backend's error bodies (`{"error": ...}`, or `{"msg": ...}`
/// from its JWT layer).
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    msg: Option<String>,
}

/// Errors from the backend REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The token is missing, expired or rejected.
    #[error("Not authenticated: {0}")]
    Unauthorized(String),

    /// The backend returned another non-2xx status.
    #[error("Backend error ({status}): {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Error message from the body, or the raw body.
        message: String,
    },

    /// A 2xx body did not have the expected shape.
    #[error("Unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// Whether the caller should route the user to sign-in.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    /// Whether retrying the same request later could succeed: network
    /// failures, timeouts, 5xx, 408 and 429.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request(_) => true,
            Self::Status { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            Self::Unauthorized(_) | Self::Decode(_) => false,
        }
    }

    /// HTTP status, if the backend answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized(_) => Some(401),
            Self::Status { status, .. } => Some(*status),
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            Self::Decode(_) => None,
        }
    }
}

impl BackendApi {
    /// Create a client with default `reqwest` settings.
    ///
    /// * `api_url` - Base HTTP URL, e.g. `http://localhost:5000`.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), api_url)
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, api_url: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Create a client honouring the configured request timeout.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::with_client(client, config.api_url.clone()))
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    // ---- auth ----

    /// Sign in with email and password.
    ///
    /// Sends `POST /api/auth/login`.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ApiError> {
        let response = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&LoginRequest { email, password })
            .send()
            .await?;

        let auth: AuthResponse = Self::parse_response(response).await?;
        tracing::info!(user_id = auth.user.id, "Signed in");
        Ok(Session::from_auth_response(auth, Utc::now()))
    }

    /// Create an account and sign in to it.
    ///
    /// Sends `POST /api/auth/register`.
    pub async fn register(
        &self,
        full_name: &str,
        email: &str,
        password: &str,
    ) -> Result<Session, ApiError> {
        let response = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&RegisterRequest {
                full_name,
                email,
                password,
            })
            .send()
            .await?;

        let auth: AuthResponse = Self::parse_response(response).await?;
        tracing::info!(user_id = auth.user.id, "Account registered");
        Ok(Session::from_auth_response(auth, Utc::now()))
    }

    /// Exchange the session's token for a fresh one.
    ///
    /// Sends `POST /api/auth/refresh`. The old session stays valid until
    /// the caller drops it.
    pub async fn refresh(&self, session: &Session) -> Result<Session, ApiError> {
        let response = self
            .client
            .post(self.url("/api/auth/refresh"))
            .bearer_auth(session.token())
            .send()
            .await?;

        let auth: AuthResponse = Self::parse_response(response).await?;
        Ok(Session::from_auth_response(auth, Utc::now()))
    }

    /// Check the token and return its owner.
    ///
    /// Sends `GET /api/auth/validate`.
    pub async fn validate(&self, session: &Session) -> Result<UserProfile, ApiError> {
        let response = self
            .client
            .get(self.url("/api/auth/validate"))
            .bearer_auth(session.token())
            .send()
            .await?;

        let body: ValidateResponse = Self::parse_response(response).await?;
        Ok(body.user)
    }

    // ---- processing ----

    /// Upload a recording. Returns the new recording's id.
    ///
    /// Sends a multipart `POST /api/upload` with `file`, `title` and
    /// `language` parts.
    pub async fn upload_recording(
        &self,
        session: &Session,
        upload: UploadRequest,
    ) -> Result<DbId, ApiError> {
        let size = upload.bytes.len();
        let part = reqwest::multipart::Part::bytes(upload.bytes).file_name(upload.filename.clone());
        let mut form = reqwest::multipart::Form::new().part("file", part);
        if let Some(title) = upload.title {
            form = form.text("title", title);
        }
        if let Some(language) = upload.language {
            form = form.text("language", language);
        }

        let response = self
            .client
            .post(self.url("/api/upload"))
            .bearer_auth(session.token())
            .multipart(form)
            .send()
            .await?;

        let body: UploadResponse = Self::parse_response(response).await?;
        tracing::info!(
            recording_id = body.recording_id,
            filename = %upload.filename,
            size,
            "Recording uploaded",
        );
        Ok(body.recording_id)
    }

    /// Start the processing pipeline for an uploaded recording.
    ///
    /// Sends `POST /api/process/{id}`. The backend answers 400 if the
    /// recording has already been processed or is in progress.
    pub async fn start_processing(
        &self,
        session: &Session,
        recording_id: DbId,
    ) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.url(&format!("/api/process/{recording_id}")))
            .bearer_auth(session.token())
            .send()
            .await?;

        Self::check_status(response).await?;
        tracing::info!(recording_id, "Processing started");
        Ok(())
    }

    /// Fetch the current processing snapshot for a recording.
    ///
    /// Sends `GET /api/processing-status/{id}`.
    pub async fn processing_status(
        &self,
        session: &Session,
        recording_id: DbId,
    ) -> Result<ProcessingSnapshot, ApiError> {
        let response = self
            .client
            .get(self.url(&format!("/api/processing-status/{recording_id}")))
            .bearer_auth(session.token())
            .send()
            .await?;

        Self::parse_response(response).await
    }

    // ---- meetings ----

    /// List the user's recordings, newest upload first.
    ///
    /// Sends `GET /api/meetings?limit=N`. Without a limit the backend
    /// returns everything.
    pub async fn list_meetings(
        &self,
        session: &Session,
        limit: Option<u32>,
    ) -> Result<Vec<MeetingSummary>, ApiError> {
        let mut request = self
            .client
            .get(self.url("/api/meetings"))
            .bearer_auth(session.token());
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit)]);
        }

        let body: MeetingListResponse = Self::parse_response(request.send().await?).await?;
        Ok(body.meetings)
    }

    /// Fetch one recording with its transcription and notes.
    ///
    /// Sends `GET /api/meetings/{id}`.
    pub async fn get_meeting(
        &self,
        session: &Session,
        recording_id: DbId,
    ) -> Result<MeetingDetail, ApiError> {
        let response = self
            .client
            .get(self.url(&format!("/api/meetings/{recording_id}")))
            .bearer_auth(session.token())
            .send()
            .await?;

        let body: MeetingResponse = Self::parse_response(response).await?;
        Ok(body.meeting)
    }

    /// Delete a recording and its uploaded file.
    ///
    /// Sends `DELETE /api/meetings/{id}`.
    pub async fn delete_meeting(&self, session: &Session, recording_id: DbId) -> Result<(), ApiError> {
        let response = self
            .client
            .delete(self.url(&format!("/api/meetings/{recording_id}")))
            .bearer_auth(session.token())
            .send()
            .await?;

        Self::check_status(response).await?;
        tracing::info!(recording_id, "Recording deleted");
        Ok(())
    }

    /// Download a meeting's notes rendered as a document.
    ///
    /// Sends `GET /api/export/{id}/{format}` and returns the file bytes.
    pub async fn export_meeting(
        &self,
        session: &Session,
        recording_id: DbId,
        format: ExportFormat,
    ) -> Result<Vec<u8>, ApiError> {
        let response = self
            .client
            .get(self.url(&format!("/api/export/{recording_id}/{format}")))
            .bearer_auth(session.token())
            .send()
            .await?;

        let bytes = Self::ensure_success(response).await?.bytes().await?;
        tracing::info!(recording_id, %format, size = bytes.len(), "Notes exported");
        Ok(bytes.to_vec())
    }

    // ---- translation ----

    /// Translate free text into `target_language` (a language code such
    /// as `es`).
    ///
    /// Sends `POST /api/translate`.
    pub async fn translate(
        &self,
        session: &Session,
        text: &str,
        target_language: &str,
    ) -> Result<String, ApiError> {
        let response = self
            .client
            .post(self.url("/api/translate"))
            .bearer_auth(session.token())
            .json(&TranslateRequest {
                text,
                target_language,
            })
            .send()
            .await?;

        let body: TranslateResponse = Self::parse_response(response).await?;
        Ok(body.translated_text)
    }

    // ---- private helpers ----

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    /// Ensure the response has a success status code. On failure the
    /// backend's `error`/`msg` field is used as the message when present.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.error.or(b.msg))
            .unwrap_or(body);

        // The backend's JWT layer answers 422 for malformed tokens.
        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::UNPROCESSABLE_ENTITY
        {
            return Err(ApiError::Unauthorized(message));
        }

        Err(ApiError::Status {
            status: status.as_u16(),
            message,
        })
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let response = Self::ensure_success(response).await?;
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Assert the response has a success status code, discarding the body.
    async fn check_status(response: reqwest::Response) -> Result<(), ApiError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}
