//! Shared-secret check for API routes.

use std::sync::Arc;

use axum::extract::{Query, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use serde::Deserialize;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Query parameter accepted in place of the header.
pub const API_KEY_PARAM: &str = "key";

#[derive(Debug, Deserialize)]
struct KeyParam {
    key: Option<String>,
}

/// Rejects API requests that do not present the configured key.
///
/// With no key configured every request passes. The header wins over the
/// query parameter when both are present.
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    let Some(expected) = state.config().api_key.as_deref() else {
        return Ok(next.run(request).await);
    };

    let presented = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .or_else(|| {
            Query::<KeyParam>::try_from_uri(request.uri())
                .ok()
                .and_then(|Query(param)| param.key)
        });

    match presented {
        Some(key) if keys_match(&key, expected) => Ok(next.run(request).await),
        _ => {
            warn!(path = %request.uri().path(), "rejected request without valid api key");
            Err(ApiError::Unauthorized)
        }
    }
}

fn keys_match(presented: &str, expected: &str) -> bool {
    presented.as_bytes().ct_eq(expected.as_bytes()).into()
}
