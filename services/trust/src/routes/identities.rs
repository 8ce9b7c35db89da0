use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};

use crate::error::ApiError;
use crate::models::{IdentityRow, IdentityResponse};
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/v1/identities/:did", get(get_identity))
}

/// This service's local view of an identity.
async fn get_identity(
    State(state): State<Arc<AppState>>,
    Path(did): Path<String>,
) -> Result<Json<IdentityResponse>, ApiError> {
    let row = sqlx::query_as::<_, IdentityRow>(
        "SELECT did, public_key, metadata, first_seen, last_seen
         FROM identities WHERE did = $1",
    )
    .bind(&did)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(ApiError::NotFound(format!("identity not found: {}", did)))?;

    Ok(Json(row.into()))
}
