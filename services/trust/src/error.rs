use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

/// Errors surfaced by trust graph handlers, mapped onto the endpoint
/// status codes.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("identity not found — register first: {0}")]
    IdentityNotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("circuit breaker open")]
    CircuitOpen,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Validation(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::IdentityNotFound(did) => (
                StatusCode::BAD_REQUEST,
                format!("identity not found — register first: {}", did),
            ),
            ApiError::Forbidden(message) => (StatusCode::FORBIDDEN, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::CircuitOpen => (
                StatusCode::SERVICE_UNAVAILABLE,
                "circuit breaker open".to_string(),
            ),
            ApiError::Database(e) => {
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
