//! In-process mock of the meeting-processing backend.
//!
//! Serves the subset of routes the client talks to on an ephemeral port,
//! with scripted processing-status responses and a bearer-token check
//! that mirrors the backend's JWT layer (`{"msg": ...}` bodies on 401).
#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Multipart, Path, Query, State};
use axum::http::header::{AUTHORIZATION, CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use scribe_client::api::BackendApi;
use scribe_client::session::Session;

pub const TEST_TOKEN: &str = "test-token";
pub const TEST_EMAIL: &str = "ana@example.com";
pub const TEST_PASSWORD: &str = "correct horse";
/// A token the mock's JWT layer cannot even decode (answered with 422).
pub const MALFORMED_TOKEN: &str = "not-a-jwt";

/// What the mock received for one upload.
#[derive(Debug, Clone)]
pub struct ReceivedUpload {
    pub filename: Option<String>,
    pub size: usize,
    pub title: Option<String>,
    pub language: Option<String>,
}

#[derive(Default)]
pub struct MockState {
    meetings: Mutex<Vec<Value>>,
    statuses: Mutex<HashMap<i64, VecDeque<Value>>>,
    started: Mutex<HashSet<i64>>,
    uploads: Mutex<Vec<ReceivedUpload>>,
    last_limit: Mutex<Option<usize>>,
    status_calls: AtomicUsize,
    next_id: AtomicUsize,
}

impl MockState {
    /// Queue processing-status bodies for a recording. The last one
    /// repeats once the queue is down to it.
    pub fn script_status(&self, recording_id: i64, bodies: Vec<Value>) {
        self.statuses
            .lock()
            .unwrap()
            .insert(recording_id, bodies.into());
    }

    pub fn add_meeting(&self, meeting: Value) {
        self.meetings.lock().unwrap().push(meeting);
    }

    pub fn uploads(&self) -> Vec<ReceivedUpload> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn last_limit(&self) -> Option<usize> {
        *self.last_limit.lock().unwrap()
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn meeting_ids(&self) -> Vec<i64> {
        self.meetings
            .lock()
            .unwrap()
            .iter()
            .filter_map(|m| m["id"].as_i64())
            .collect()
    }
}

/// A running mock backend.
pub struct MockBackend {
    pub url: String,
    pub state: Arc<MockState>,
}

impl MockBackend {
    pub fn api(&self) -> BackendApi {
        BackendApi::new(&self.url)
    }

    pub fn session(&self) -> Session {
        Session::from_token(TEST_TOKEN)
    }
}

/// Bind the mock on `127.0.0.1:0` and serve it in the background.
pub async fn spawn_backend() -> MockBackend {
    let state = Arc::new(MockState {
        next_id: AtomicUsize::new(100),
        ..Default::default()
    });

    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/register", post(register))
        .route("/api/auth/refresh", post(refresh))
        .route("/api/auth/validate", get(validate))
        .route("/api/upload", post(upload))
        .route("/api/process/{id}", post(start_processing))
        .route("/api/processing-status/{id}", get(processing_status))
        .route("/api/meetings", get(list_meetings))
        .route("/api/meetings/{id}", get(get_meeting).delete(delete_meeting))
        .route("/api/export/{id}/{format}", get(export_meeting))
        .route("/api/translate", post(translate))
        .with_state(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockBackend {
        url: format!("http://{addr}"),
        state,
    }
}

/// A processing-status body in the backend's wire shape.
pub fn status_body(
    recording_id: i64,
    status: &str,
    steps: &[(&str, &str)],
    current_step_progress: Option<f64>,
) -> Value {
    let steps: Vec<Value> = steps
        .iter()
        .map(|(step, status)| {
            json!({
                "step": step,
                "status": status,
                "error": null,
                "timestamp": "2026-03-02T10:15:00.123456",
            })
        })
        .collect();
    json!({
        "recording_id": recording_id,
        "status": status,
        "processing_steps": steps,
        "current_step_progress": current_step_progress,
    })
}

/// A meeting-list row in the backend's wire shape.
pub fn meeting_row(id: i64, title: &str, status: &str, upload_date: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "filename": format!("{}.mp3", title.to_lowercase().replace(' ', "-")),
        "upload_date": upload_date,
        "status": status,
        "has_transcription": status == "completed",
        "has_notes": status == "completed",
    })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

type Shared = State<Arc<MockState>>;

fn user_json() -> Value {
    json!({ "id": 5, "full_name": "Ana Lima", "email": TEST_EMAIL })
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn authorized(headers: &HeaderMap) -> Result<(), Response> {
    let expected = format!("Bearer {TEST_TOKEN}");
    match headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => Ok(()),
        Some(value) if value == format!("Bearer {MALFORMED_TOKEN}") => Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "msg": "Not enough segments" })),
        )
            .into_response()),
        Some(_) => Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "msg": "Token has expired" })),
        )
            .into_response()),
        None => Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "msg": "Missing Authorization Header" })),
        )
            .into_response()),
    }
}

#[derive(Deserialize)]
struct LoginBody {
    email: String,
    password: String,
}

async fn login(Json(body): Json<LoginBody>) -> Response {
    if body.email != TEST_EMAIL || body.password != TEST_PASSWORD {
        return error(StatusCode::UNAUTHORIZED, "Invalid email or password");
    }
    Json(json!({
        "access_token": TEST_TOKEN,
        "user": user_json(),
        "expires_in": 3600,
    }))
    .into_response()
}

#[derive(Deserialize)]
struct RegisterBody {
    full_name: String,
    email: String,
    password: String,
}

async fn register(Json(body): Json<RegisterBody>) -> Response {
    if body.email == TEST_EMAIL {
        return error(StatusCode::CONFLICT, "User already exists");
    }
    if body.password.len() < 6 {
        return error(StatusCode::BAD_REQUEST, "Password must be at least 6 characters");
    }
    (
        StatusCode::CREATED,
        Json(json!({
            "access_token": TEST_TOKEN,
            "user": { "id": 6, "full_name": body.full_name, "email": body.email },
            "expires_in": 3600,
        })),
    )
        .into_response()
}

async fn refresh(headers: HeaderMap) -> Response {
    if let Err(rejection) = authorized(&headers) {
        return rejection;
    }
    Json(json!({ "access_token": TEST_TOKEN, "user": user_json(), "expires_in": 7200 }))
        .into_response()
}

async fn validate(headers: HeaderMap) -> Response {
    if let Err(rejection) = authorized(&headers) {
        return rejection;
    }
    Json(json!({ "valid": true, "user": user_json() })).into_response()
}

async fn upload(State(state): Shared, headers: HeaderMap, mut multipart: Multipart) -> Response {
    if let Err(rejection) = authorized(&headers) {
        return rejection;
    }

    let mut received = ReceivedUpload {
        filename: None,
        size: 0,
        title: None,
        language: None,
    };
    while let Some(field) = multipart.next_field().await.unwrap() {
        match field.name() {
            Some("file") => {
                received.filename = field.file_name().map(str::to_string);
                received.size = field.bytes().await.unwrap().len();
            }
            Some("title") => received.title = Some(field.text().await.unwrap()),
            Some("language") => received.language = Some(field.text().await.unwrap()),
            _ => {}
        }
    }
    if received.filename.is_none() {
        return error(StatusCode::BAD_REQUEST, "No file provided");
    }

    let id = state.next_id.fetch_add(1, Ordering::SeqCst) as i64;
    let title = received
        .title
        .clone()
        .or_else(|| received.filename.clone())
        .unwrap_or_default();
    state.add_meeting(meeting_row(id, &title, "uploaded", "2026-03-02T10:00:00"));
    state.uploads.lock().unwrap().push(received);

    (
        StatusCode::CREATED,
        Json(json!({ "recording_id": id, "message": "File uploaded successfully" })),
    )
        .into_response()
}

async fn start_processing(State(state): Shared, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    if let Err(rejection) = authorized(&headers) {
        return rejection;
    }
    if !state.meeting_ids().contains(&id) {
        return error(StatusCode::NOT_FOUND, "Recording not found");
    }
    if !state.started.lock().unwrap().insert(id) {
        return error(StatusCode::BAD_REQUEST, "Recording already processed or in progress");
    }
    (
        StatusCode::ACCEPTED,
        Json(json!({ "message": "Processing started" })),
    )
        .into_response()
}

async fn processing_status(State(state): Shared, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    if let Err(rejection) = authorized(&headers) {
        return rejection;
    }
    state.status_calls.fetch_add(1, Ordering::SeqCst);

    let mut statuses = state.statuses.lock().unwrap();
    let Some(queue) = statuses.get_mut(&id) else {
        return error(StatusCode::NOT_FOUND, "Recording not found");
    };
    let body = if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    };
    match body {
        Some(body) => Json(body).into_response(),
        None => error(StatusCode::NOT_FOUND, "Recording not found"),
    }
}

#[derive(Deserialize)]
struct ListParams {
    limit: Option<usize>,
}

async fn list_meetings(
    State(state): Shared,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Response {
    if let Err(rejection) = authorized(&headers) {
        return rejection;
    }
    *state.last_limit.lock().unwrap() = params.limit;

    let meetings = state.meetings.lock().unwrap();
    let rows: Vec<Value> = match params.limit {
        Some(limit) => meetings.iter().take(limit).cloned().collect(),
        None => meetings.clone(),
    };
    Json(json!({ "meetings": rows })).into_response()
}

async fn get_meeting(State(state): Shared, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    if let Err(rejection) = authorized(&headers) {
        return rejection;
    }
    let meetings = state.meetings.lock().unwrap();
    let Some(row) = meetings.iter().find(|m| m["id"].as_i64() == Some(id)) else {
        return error(StatusCode::NOT_FOUND, "Meeting not found");
    };

    let mut meeting = row.clone();
    meeting["transcription"] = json!({ "text": "Welcome everyone." });
    meeting["notes"] = json!({ "summary": "Kickoff", "action_items": ["Send agenda"] });
    Json(json!({ "meeting": meeting })).into_response()
}

async fn delete_meeting(State(state): Shared, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    if let Err(rejection) = authorized(&headers) {
        return rejection;
    }
    let mut meetings = state.meetings.lock().unwrap();
    let before = meetings.len();
    meetings.retain(|m| m["id"].as_i64() != Some(id));
    if meetings.len() == before {
        return error(StatusCode::NOT_FOUND, "Meeting not found");
    }
    Json(json!({ "message": "Meeting deleted successfully" })).into_response()
}

/// First bytes of a PDF document as served by the mock.
pub const PDF_MAGIC: &[u8] = b"%PDF-1.4";
/// First bytes of a `.docx` (zip) document as served by the mock.
pub const DOCX_MAGIC: &[u8] = b"PK\x03\x04";

async fn export_meeting(
    State(state): Shared,
    headers: HeaderMap,
    Path((id, format)): Path<(i64, String)>,
) -> Response {
    if let Err(rejection) = authorized(&headers) {
        return rejection;
    }
    if !state.meeting_ids().contains(&id) {
        return error(StatusCode::NOT_FOUND, "Meeting not found");
    }
    let (magic, content_type, extension) = match format.as_str() {
        "pdf" => (PDF_MAGIC, "application/pdf", "pdf"),
        "word" => (
            DOCX_MAGIC,
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            "docx",
        ),
        _ => return error(StatusCode::BAD_REQUEST, "Invalid format"),
    };

    let mut body = magic.to_vec();
    body.extend_from_slice(format!(" notes for meeting {id}").as_bytes());
    (
        [
            (CONTENT_TYPE, content_type.to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=meeting_notes_{id}.{extension}"),
            ),
        ],
        body,
    )
        .into_response()
}

#[derive(Deserialize)]
struct TranslateBody {
    #[serde(default)]
    text: String,
    target_language: Option<String>,
}

async fn translate(headers: HeaderMap, Json(body): Json<TranslateBody>) -> Response {
    if let Err(rejection) = authorized(&headers) {
        return rejection;
    }
    let text = body.text.trim();
    if text.is_empty() {
        return error(StatusCode::BAD_REQUEST, "No text provided");
    }
    let target = body.target_language.unwrap_or_else(|| "es".to_string());
    Json(json!({ "translated_text": format!("[{target}] {text}") })).into_response()
}
