use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::models::{IdentityRow, IdentityResponse};
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/.well-known/fides.json", get(well_known_document))
}

/// This registry's own discovery document: the service banner plus the
/// identities registered under its configured domain.
async fn well_known_document(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, ApiError> {
    let identities: Vec<IdentityResponse> = match &state.service_domain {
        Some(domain) => sqlx::query_as::<_, IdentityRow>(
            "SELECT did, public_key, metadata, domain, first_seen, last_seen
             FROM identities WHERE domain = $1 ORDER BY first_seen",
        )
        .bind(domain)
        .fetch_all(&state.pool)
        .await?
        .into_iter()
        .map(IdentityResponse::from)
        .collect(),
        None => Vec::new(),
    };

    Ok(Json(json!({
        "service": "fides-discovery",
        "version": env!("CARGO_PKG_VERSION"),
        "domain": state.service_domain,
        "identities": identities,
    })))
}
