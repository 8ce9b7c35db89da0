use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub database_connection: bool,
    pub version: String,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health_check))
}

/// Liveness plus database reachability.
async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let database_connection = sqlx::query("SELECT 1").execute(&state.pool).await.is_ok();

    let health = HealthResponse {
        status: if database_connection { "ok" } else { "degraded" }.to_string(),
        database_connection,
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    let status = if database_connection {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(health))
}
