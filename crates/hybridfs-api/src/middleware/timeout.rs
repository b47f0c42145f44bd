//! Per-request deadline for producing a response.
//!
//! Covers the handler up to the response head; streamed download bodies
//! keep flowing after it.

use std::time::Duration;

use axum::Json;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use crate::state::AppState;

/// Fail with `408` when the handler does not respond in time.
pub async fn request_timeout(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let limit = Duration::from_secs(state.config.server.request_timeout_seconds.max(1));
    let path = request.uri().path().to_string();

    match tokio::time::timeout(limit, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            warn!(path = %path, timeout_secs = limit.as_secs(), "Request timed out");
            (
                StatusCode::REQUEST_TIMEOUT,
                Json(serde_json::json!({
                    "success": false,
                    "error": "TIMEOUT",
                    "message": "Request timed out",
                })),
            )
                .into_response()
        }
    }
}
