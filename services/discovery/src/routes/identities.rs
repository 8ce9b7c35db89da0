use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use fides_crypto::hex_decode;
use fides_identity::parse_did;

use crate::error::ApiError;
use crate::models::{IdentityRow, IdentityResponse};
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/identities", post(register_identity).get(list_identities))
        .route("/identities/:did", get(get_identity))
}

struct ValidatedRegistration {
    did: String,
    public_key: Vec<u8>,
    metadata: Option<Value>,
    domain: Option<String>,
}

/// Validate a registration body: the identifier must parse, the public key
/// must be 64 hex characters, and the key embedded in the identifier must
/// equal the submitted key (the defense against identity hijacking).
fn validate_registration(body: &Value) -> Result<ValidatedRegistration, ApiError> {
    let did = body
        .get("did")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::BadRequest("did must be a string".to_string()))?;

    let embedded_key = parse_did(did)
        .map_err(|e| ApiError::BadRequest(format!("invalid identifier: {}", e)))?;

    let public_key_hex = body
        .get("publicKey")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::BadRequest("publicKey must be a string".to_string()))?;

    if public_key_hex.len() != 64 {
        return Err(ApiError::BadRequest(
            "publicKey must be 64 hex characters".to_string(),
        ));
    }
    let public_key = hex_decode(public_key_hex)
        .map_err(|_| ApiError::BadRequest("publicKey is not valid hex".to_string()))?;

    if embedded_key.as_slice() != public_key.as_slice() {
        return Err(ApiError::Forbidden(
            "identifier does not match public key".to_string(),
        ));
    }

    let domain = match body.get("domain") {
        None | Some(Value::Null) => None,
        Some(Value::String(domain)) => Some(domain.clone()),
        Some(_) => return Err(ApiError::BadRequest("domain must be a string".to_string())),
    };

    Ok(ValidatedRegistration {
        did: did.to_string(),
        public_key,
        metadata: body.get("metadata").filter(|m| !m.is_null()).cloned(),
        domain,
    })
}

async fn register_identity(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<IdentityResponse>), ApiError> {
    let registration = validate_registration(&body)?;

    let inserted = sqlx::query_as::<_, IdentityRow>(
        "INSERT INTO identities (did, public_key, metadata, domain)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (did) DO NOTHING
         RETURNING did, public_key, metadata, domain, first_seen, last_seen",
    )
    .bind(&registration.did)
    .bind(&registration.public_key)
    .bind(&registration.metadata)
    .bind(&registration.domain)
    .fetch_optional(&state.pool)
    .await?;

    match inserted {
        Some(row) => {
            info!(did = %row.did, "Registered identity");
            Ok((StatusCode::CREATED, Json(row.into())))
        }
        None => Err(ApiError::Conflict("identity already registered".to_string())),
    }
}

async fn get_identity(
    State(state): State<Arc<AppState>>,
    Path(did): Path<String>,
) -> Result<Json<IdentityResponse>, ApiError> {
    let row = sqlx::query_as::<_, IdentityRow>(
        "SELECT did, public_key, metadata, domain, first_seen, last_seen
         FROM identities WHERE did = $1",
    )
    .bind(&did)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(ApiError::NotFound(format!("identity not found: {}", did)))?;

    Ok(Json(row.into()))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    domain: Option<String>,
}

async fn list_identities(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<IdentityResponse>>, ApiError> {
    let rows = match query.domain {
        Some(domain) => {
            sqlx::query_as::<_, IdentityRow>(
                "SELECT did, public_key, metadata, domain, first_seen, last_seen
                 FROM identities WHERE domain = $1 ORDER BY first_seen",
            )
            .bind(domain)
            .fetch_all(&state.pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, IdentityRow>(
                "SELECT did, public_key, metadata, domain, first_seen, last_seen
                 FROM identities ORDER BY first_seen",
            )
            .fetch_all(&state.pool)
            .await?
        }
    };

    Ok(Json(rows.into_iter().map(IdentityResponse::from).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fides_crypto::{hex_encode, KeyPair};
    use fides_identity::derive_did;
    use serde_json::json;

    fn registration_body() -> (Value, KeyPair) {
        let keypair = KeyPair::generate();
        let did = derive_did(&keypair.public_key_bytes()).unwrap();
        let body = json!({
            "did": did,
            "publicKey": hex_encode(&keypair.public_key_bytes()),
        });
        (body, keypair)
    }

    #[test]
    fn valid_registration_passes() {
        let (body, keypair) = registration_body();
        let validated = validate_registration(&body).unwrap();
        assert_eq!(validated.public_key, keypair.public_key_bytes());
    }

    #[test]
    fn missing_fields_are_bad_requests() {
        assert!(matches!(
            validate_registration(&json!({})),
            Err(ApiError::BadRequest(_))
        ));

        let (mut body, _) = registration_body();
        body.as_object_mut().unwrap().remove("publicKey");
        assert!(matches!(
            validate_registration(&body),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn malformed_identifier_is_a_bad_request() {
        let body = json!({
            "did": "did:fides:0OIl",
            "publicKey": "ab".repeat(32),
        });
        assert!(matches!(
            validate_registration(&body),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn short_key_is_a_bad_request() {
        let (mut body, _) = registration_body();
        body["publicKey"] = json!("abcd");
        assert!(matches!(
            validate_registration(&body),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn hijacked_identifier_is_forbidden() {
        // Valid DID, valid key, but the key belongs to someone else
        let (mut body, _) = registration_body();
        let other = KeyPair::generate();
        body["publicKey"] = json!(hex_encode(&other.public_key_bytes()));

        assert!(matches!(
            validate_registration(&body),
            Err(ApiError::Forbidden(_))
        ));
    }
}
