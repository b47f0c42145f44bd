//! Maps domain `AppError` to HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use hybridfs_core::error::{AppError, ErrorKind};

/// Standard API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Always `false`.
    pub success: bool,
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable message.
    pub message: String,
}

/// Status and error code for a kind.
///
/// An unreachable bridge looks like a missing file to clients. A
/// reconciliation gap is never a client-facing failure.
pub fn status_for(kind: ErrorKind) -> (StatusCode, &'static str) {
    match kind {
        ErrorKind::Validation => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        ErrorKind::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        ErrorKind::Conflict => (StatusCode::CONFLICT, "CONFLICT"),
        ErrorKind::BackendUnavailable => (StatusCode::NOT_FOUND, "BACKEND_UNAVAILABLE"),
        ErrorKind::ReconciliationGap => (StatusCode::OK, "ALREADY_CONSISTENT"),
        ErrorKind::Database => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
        ErrorKind::Storage => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
        ErrorKind::Configuration => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIGURATION_ERROR"),
        ErrorKind::Serialization => (StatusCode::INTERNAL_SERVER_ERROR, "SERIALIZATION_ERROR"),
        ErrorKind::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    }
}

/// Response wrapper so handlers can `?` an [`AppError`].
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let (status, code) = status_for(err.kind);

        if err.kind == ErrorKind::ReconciliationGap {
            tracing::warn!(error = %err, "Reconciliation gap reached the API layer");
            return (
                status,
                Json(serde_json::json!({ "success": true, "message": err.message })),
            )
                .into_response();
        }

        if err.is_server_fault() {
            tracing::error!(kind = %err.kind, error = ?err, "Request failed");
        } else {
            tracing::debug!(kind = %err.kind, message = %err.message, "Request rejected");
        }

        let body = ApiErrorResponse {
            success: false,
            error: code.to_string(),
            message: err.message,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(ErrorKind::Validation).0, StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::Conflict).0, StatusCode::CONFLICT);
        assert_eq!(
            status_for(ErrorKind::BackendUnavailable).0,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(ErrorKind::Database).0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_gap_is_reported_as_success() {
        let response = ApiError(AppError::reconciliation_gap("gone")).into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
