use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

/// Errors surfaced by registry handlers, mapped onto the endpoint status
/// codes.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Forbidden(message) => (StatusCode::FORBIDDEN, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, message),
            ApiError::Unavailable(message) => (StatusCode::SERVICE_UNAVAILABLE, message),
            ApiError::Database(e) => {
                // Internal detail stays in the log, keyed by a correlation id
                let correlation_id = Uuid::new_v4();
                error!(%correlation_id, error = %e, "Database failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("internal error ({})", correlation_id),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
