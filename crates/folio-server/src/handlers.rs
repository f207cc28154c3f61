//! HTTP request handlers for the notes API.

use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{FromRequest, Path, Query, Request, State};
use axum::http::header;
use axum::{Form, Json};
use axum::response::{IntoResponse, Response};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use folio_store::{
    DEFAULT_MAX_CHARS, DEFAULT_TARGET_LINES, Encoding, FileListing, ListQuery, PageMeta,
    PageRequest, StatusDocument, StatusUpdate,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// `payload_mode` of a read response.
pub const PAYLOAD_MODE: &str = "base64_text";

/// `payload_mime` of a read response.
pub const PAYLOAD_MIME: &str = "application/jsonl; charset=utf-8";

/// Request body read as JSON, or as a form when sent urlencoded.
#[derive(Debug)]
pub struct JsonOrForm<T>(pub T);

impl<S, T> FromRequest<S> for JsonOrForm<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| {
                ct.trim_start()
                    .to_ascii_lowercase()
                    .starts_with("application/x-www-form-urlencoded")
            });

        if is_form {
            let Form(value) = Form::<T>::from_request(req, state).await?;
            Ok(Self(value))
        } else {
            let Json(value) = Json::<T>::from_request(req, state).await?;
            Ok(Self(value))
        }
    }
}

/// Reads `newline` from a JSON bool or from form text.
///
/// Text is false only for `false`, `0`, `no` and `off`.
fn deserialize_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    Ok(Option::<Flag>::deserialize(deserializer)?.map(|flag| match flag {
        Flag::Bool(value) => value,
        Flag::Text(text) => !matches!(
            text.trim().to_ascii_lowercase().as_str(),
            "false" | "0" | "no" | "off"
        ),
    }))
}

/// Body of POST /api/upload.
#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    /// Target file name.
    #[serde(default)]
    pub filename: String,
    /// File content, text or base64.
    #[serde(default)]
    pub content: Option<String>,
    /// `utf8` (default) or `base64`.
    #[serde(default)]
    pub encoding: Option<String>,
}

/// Body of POST /api/append.
#[derive(Debug, Deserialize)]
pub struct AppendRequest {
    /// Target file name.
    #[serde(default)]
    pub filename: String,
    /// Content to append. Non-string JSON values are appended as JSON text.
    #[serde(default)]
    pub content: Option<Value>,
    /// Terminate the content with a newline (default true).
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub newline: Option<bool>,
}

/// Query parameters of the JSONL paging endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    /// File to page through.
    #[serde(default)]
    pub file: String,
    /// Record offset, default 0.
    pub cursor: Option<usize>,
    /// Records per page, default 300.
    pub target_lines: Option<usize>,
    /// Character budget per page, default 12000.
    pub max_chars: Option<usize>,
}

impl PageQuery {
    fn page_request(&self) -> ApiResult<PageRequest> {
        let target_lines = self.target_lines.unwrap_or(DEFAULT_TARGET_LINES);
        let max_chars = self.max_chars.unwrap_or(DEFAULT_MAX_CHARS);
        if target_lines == 0 || max_chars == 0 {
            return Err(ApiError::Validation(
                "targetLines and maxChars must be positive".to_string(),
            ));
        }
        let cursor = self.cursor.unwrap_or(0);
        if i64::try_from(cursor).is_err() {
            return Err(ApiError::Validation("cursor out of range".to_string()));
        }
        Ok(PageRequest::new(cursor)
            .with_target_lines(target_lines)
            .with_max_chars(max_chars))
    }
}

/// Acknowledgement for write operations.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Always true.
    pub ok: bool,
    /// Human-readable outcome.
    pub message: String,
}

/// Response of POST /api/status.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Always true.
    pub ok: bool,
    /// The document as written.
    pub status: StatusDocument,
}

/// Response of GET /api/jsonl/plan.
#[derive(Debug, Serialize)]
pub struct PlanResponse {
    /// Always true.
    pub ok: bool,
    /// Sanitized file name.
    pub file: String,
    /// Page metadata, inlined.
    #[serde(flatten)]
    pub meta: PageMeta,
}

/// Response of GET /api/jsonl/read.
#[derive(Debug, Serialize)]
pub struct ReadResponse {
    /// Always true.
    pub ok: bool,
    /// Page metadata.
    pub meta: PageMeta,
    /// Transport encoding of the payload.
    pub payload_mode: &'static str,
    /// Media type of the decoded payload.
    pub payload_mime: &'static str,
    /// Page records joined by `\n`, base64-encoded.
    pub payload_b64: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status message.
    pub status: String,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
}

/// Handle GET /api/health - health check endpoint.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs: state.uptime_secs(),
    })
}

/// Handle POST /api/upload - overwrite a file.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    JsonOrForm(req): JsonOrForm<UploadRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let encoding: Encoding = match req.encoding.as_deref() {
        Some(raw) => raw.parse()?,
        None => Encoding::default(),
    };
    let content = req.content.unwrap_or_default();

    let name = state
        .with_store(move |store| store.upload(&req.filename, &content, encoding))
        .await?;

    Ok(Json(MessageResponse {
        ok: true,
        message: format!("saved {name}"),
    }))
}

/// Handle POST /api/append - append to a file.
pub async fn append(
    State(state): State<Arc<AppState>>,
    JsonOrForm(req): JsonOrForm<AppendRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let content = match req.content {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
    };
    let newline = req.newline.unwrap_or(true);

    let name = state
        .with_store(move |store| store.append(&req.filename, &content, newline))
        .await?;

    Ok(Json(MessageResponse {
        ok: true,
        message: format!("appended {name}"),
    }))
}

/// Handle GET /api/download/{filename} - raw file bytes.
pub async fn download(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> ApiResult<Response> {
    let (name, bytes) = state
        .with_store(move |store| store.download(&filename))
        .await?;

    let disposition = format!("attachment; filename=\"{}\"", name.as_str().replace('"', ""));
    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// Handle GET /api/list - filtered directory listing.
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<FileListing>> {
    let Query(query) = query?;
    let listing = state.with_store(move |store| store.list(&query)).await?;
    Ok(Json(listing))
}

/// Handle GET /api/status - read the status document.
pub async fn get_status(State(state): State<Arc<AppState>>) -> ApiResult<Json<StatusDocument>> {
    let status = state.with_store(|store| store.status()).await?;
    Ok(Json(status))
}

/// Handle POST /api/status - merge into the status document.
pub async fn set_status(
    State(state): State<Arc<AppState>>,
    JsonOrForm(update): JsonOrForm<StatusUpdate>,
) -> ApiResult<Json<StatusResponse>> {
    let status = state.with_store(move |store| store.set_status(update)).await?;
    Ok(Json(StatusResponse { ok: true, status }))
}

/// Handle GET /api/jsonl/plan - page metadata only.
pub async fn plan_page(
    State(state): State<Arc<AppState>>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<Json<PlanResponse>> {
    let Query(query) = query?;
    let request = query.page_request()?;

    let (name, meta) = state
        .with_store(move |store| store.plan_page(&query.file, &request))
        .await?;

    Ok(Json(PlanResponse {
        ok: true,
        file: name.to_string(),
        meta,
    }))
}

/// Handle GET /api/jsonl/read - page metadata plus base64 payload.
pub async fn read_page(
    State(state): State<Arc<AppState>>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<Json<ReadResponse>> {
    let Query(query) = query?;
    let request = query.page_request()?;

    let (_, page) = state
        .with_store(move |store| store.read_page(&query.file, &request))
        .await?;

    Ok(Json(ReadResponse {
        ok: true,
        payload_mode: PAYLOAD_MODE,
        payload_mime: PAYLOAD_MIME,
        payload_b64: STANDARD.encode(page.text()),
        meta: page.meta,
    }))
}
