//! Error types for the API server.

use axum::extract::rejection::{FormRejection, JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use folio_store::StoreError;
use serde_json::json;
use thiserror::Error;

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors that can occur while serving the API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Failed to bind to the specified address.
    #[error("failed to bind to {0}: {1}")]
    BindFailed(std::net::SocketAddr, std::io::Error),

    /// Bad file name, encoding, query or body.
    #[error("{0}")]
    Validation(String),

    /// The requested file does not exist.
    #[error("file not found")]
    NotFound(String),

    /// Missing or wrong API key.
    #[error("unauthorized")]
    Unauthorized,

    /// The status document on disk is corrupt.
    #[error("status parse error: {0}")]
    StatusParse(String),

    /// Any other store failure, reported to the caller as-is.
    #[error("{0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::Validation(msg) | Self::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, json!({ "ok": false, "error": msg }))
            }
            Self::NotFound(_) => (
                StatusCode::NOT_FOUND,
                json!({ "ok": false, "error": "file not found" }),
            ),
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, json!({ "error": "unauthorized" })),
            Self::StatusParse(detail) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "status parse error", "detail": detail }),
            ),
            Self::BindFailed(_, _) | Self::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "ok": false, "error": self.to_string() }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidFilename(_)
            | StoreError::UnsupportedEncoding(_)
            | StoreError::InvalidPayload(_) => Self::Validation(err.to_string()),
            StoreError::NotFound(name) => Self::NotFound(name),
            StoreError::StatusParse(e) => Self::StatusParse(e.to_string()),
            StoreError::Serialization(_) | StoreError::Io(_) => Self::BadRequest(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<FormRejection> for ApiError {
    fn from(rejection: FormRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}
