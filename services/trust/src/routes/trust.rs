use std::sync::Arc;

use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use fides_crypto::{hex_decode, hex_encode, verify_signature, SIGNATURE_LENGTH};
use fides_identity::is_valid_did;
use fides_trust_graph::{find_path, reputation, PathOptions, ReputationOptions, TrustEdge};

use crate::auth::VerifiedCaller;
use crate::error::ApiError;
use crate::models::{EdgeRow, ScoreResponse, ScoreRow};
use crate::state::AppState;

/// Cached scores stay valid for one hour.
fn score_cache_ttl() -> Duration {
    Duration::hours(1)
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/v1/trust", post(create_trust))
        .route("/v1/trust/:did/score", get(get_score))
        .route("/v1/trust/:did/:to", get(get_path).delete(revoke_trust))
}

struct CreateTrustInput {
    issuer_did: String,
    subject_did: String,
    trust_level: i64,
    signature: Vec<u8>,
    payload: String,
    expires_at: Option<DateTime<Utc>>,
}

/// Syntactic validation of a create-trust body.
fn validate_create_trust(body: &Value) -> Result<CreateTrustInput, ApiError> {
    let issuer_did = body
        .get("issuerDid")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::Validation("issuerDid must be a string".to_string()))?;
    if !is_valid_did(issuer_did) {
        return Err(ApiError::Validation(format!(
            "issuerDid is not a valid identifier: {}",
            issuer_did
        )));
    }

    let subject_did = body
        .get("subjectDid")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::Validation("subjectDid must be a string".to_string()))?;
    if !is_valid_did(subject_did) {
        return Err(ApiError::Validation(format!(
            "subjectDid is not a valid identifier: {}",
            subject_did
        )));
    }

    let trust_level = body
        .get("trustLevel")
        .and_then(Value::as_i64)
        .ok_or_else(|| ApiError::Validation("trustLevel must be an integer".to_string()))?;
    if !(0..=100).contains(&trust_level) {
        return Err(ApiError::Validation(
            "trustLevel must be between 0 and 100".to_string(),
        ));
    }

    let signature_hex = body
        .get("signature")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::Validation("signature must be a string".to_string()))?;
    let signature = hex_decode(signature_hex)
        .map_err(|_| ApiError::Validation("signature is not valid hex".to_string()))?;
    if signature.len() != SIGNATURE_LENGTH {
        return Err(ApiError::Validation(format!(
            "signature must be {} bytes",
            SIGNATURE_LENGTH
        )));
    }

    let payload = body
        .get("payload")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::Validation("payload must be a string".to_string()))?;

    let expires_at = match body.get("expiresAt") {
        None | Some(Value::Null) => None,
        Some(Value::String(raw)) => Some(
            DateTime::parse_from_rfc3339(raw)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|_| {
                    ApiError::Validation("expiresAt is not an ISO-8601 timestamp".to_string())
                })?,
        ),
        Some(_) => {
            return Err(ApiError::Validation(
                "expiresAt must be a string".to_string(),
            ))
        }
    };

    Ok(CreateTrustInput {
        issuer_did: issuer_did.to_string(),
        subject_did: subject_did.to_string(),
        trust_level,
        signature,
        payload: payload.to_string(),
        expires_at,
    })
}

/// The signed payload must state exactly what the request states.
fn check_payload_binding(input: &CreateTrustInput) -> Result<(), ApiError> {
    let payload: Value = serde_json::from_str(&input.payload)
        .map_err(|_| ApiError::Validation("payload is not valid JSON".to_string()))?;

    if payload.get("issuerDid").and_then(Value::as_str) != Some(input.issuer_did.as_str()) {
        return Err(ApiError::Validation(
            "payload issuerDid does not match request".to_string(),
        ));
    }
    if payload.get("subjectDid").and_then(Value::as_str) != Some(input.subject_did.as_str()) {
        return Err(ApiError::Validation(
            "payload subjectDid does not match request".to_string(),
        ));
    }
    if payload.get("trustLevel").and_then(Value::as_i64) != Some(input.trust_level) {
        return Err(ApiError::Validation(
            "payload trustLevel does not match request".to_string(),
        ));
    }

    Ok(())
}

/// Materialize an identity locally, fetching it from the registry through
/// the circuit breaker when it is not yet known.
async fn ensure_identity(state: &AppState, did: &str) -> Result<(), ApiError> {
    if state.is_known(did) {
        return Ok(());
    }

    let local = sqlx::query_scalar::<_, String>("SELECT did FROM identities WHERE did = $1")
        .bind(did)
        .fetch_optional(&state.pool)
        .await?;
    if local.is_some() {
        state.mark_known(did);
        return Ok(());
    }

    if !state.breaker.allow() {
        return Err(ApiError::CircuitOpen);
    }

    let identity = match state.registry.fetch_identity(did).await {
        Ok(identity) => {
            state.breaker.record_success();
            identity
        }
        Err(e) => {
            state.breaker.record_failure();
            warn!(did, error = %e, "Registry fetch failed");
            return Err(ApiError::IdentityNotFound(did.to_string()));
        }
    };

    let identity = identity.ok_or_else(|| ApiError::IdentityNotFound(did.to_string()))?;

    let public_key = hex_decode(&identity.public_key)
        .map_err(|_| ApiError::IdentityNotFound(did.to_string()))?;

    sqlx::query(
        "INSERT INTO identities (did, public_key, metadata)
         VALUES ($1, $2, $3)
         ON CONFLICT (did) DO UPDATE SET last_seen = now()",
    )
    .bind(did)
    .bind(&public_key)
    .bind(&identity.metadata)
    .execute(&state.pool)
    .await?;

    state.mark_known(did);
    Ok(())
}

async fn create_trust(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let input = validate_create_trust(&body)?;

    // Materialize both endpoints in parallel
    let (issuer, subject) = tokio::join!(
        ensure_identity(&state, &input.issuer_did),
        ensure_identity(&state, &input.subject_did),
    );
    issuer?;
    subject?;

    let issuer_key =
        sqlx::query_scalar::<_, Vec<u8>>("SELECT public_key FROM identities WHERE did = $1")
            .bind(&input.issuer_did)
            .fetch_optional(&state.pool)
            .await?
            .ok_or_else(|| ApiError::IdentityNotFound(input.issuer_did.clone()))?;

    match verify_signature(input.payload.as_bytes(), &input.signature, &issuer_key) {
        Ok(true) => {}
        _ => return Err(ApiError::Validation("invalid signature".to_string())),
    }

    check_payload_binding(&input)?;

    sqlx::query("UPDATE identities SET last_seen = now() WHERE did = $1 OR did = $2")
        .bind(&input.issuer_did)
        .bind(&input.subject_did)
        .execute(&state.pool)
        .await?;

    let edge_id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO trust_edges (id, source, target, trust_level, attestation, signature, expires_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         ON CONFLICT (source, target) DO UPDATE
         SET trust_level = EXCLUDED.trust_level,
             attestation = EXCLUDED.attestation,
             signature = EXCLUDED.signature,
             expires_at = EXCLUDED.expires_at
         RETURNING id",
    )
    .bind(Uuid::new_v4())
    .bind(&input.issuer_did)
    .bind(&input.subject_did)
    .bind(input.trust_level as i16)
    .bind(&input.payload)
    .bind(hex_encode(&input.signature))
    .bind(input.expires_at)
    .fetch_one(&state.pool)
    .await?;

    // The subject's cached score is stale now
    sqlx::query("UPDATE reputation_cache SET last_computed = to_timestamp(0) WHERE did = $1")
        .bind(&input.subject_did)
        .execute(&state.pool)
        .await?;

    info!(
        source = %input.issuer_did,
        target = %input.subject_did,
        level = input.trust_level,
        "Trust edge upserted"
    );

    Ok((StatusCode::CREATED, Json(json!({ "id": edge_id }))))
}

/// Every edge, in the deterministic enumeration order the engine expects.
async fn load_edges(state: &AppState) -> Result<Vec<TrustEdge>, ApiError> {
    let rows = sqlx::query_as::<_, EdgeRow>(
        "SELECT id, source, target, trust_level, attestation, signature,
                created_at, expires_at, revoked_at
         FROM trust_edges ORDER BY created_at ASC, id ASC",
    )
    .fetch_all(&state.pool)
    .await?;

    Ok(rows.into_iter().map(TrustEdge::from).collect())
}

async fn get_score(
    State(state): State<Arc<AppState>>,
    Path(did): Path<String>,
) -> Result<Json<ScoreResponse>, ApiError> {
    let cached = sqlx::query_as::<_, ScoreRow>(
        "SELECT did, score, direct_trusters, transitive_trusters, last_computed
         FROM reputation_cache WHERE did = $1",
    )
    .bind(&did)
    .fetch_optional(&state.pool)
    .await?;

    if let Some(row) = cached {
        if Utc::now() - row.last_computed < score_cache_ttl() {
            return Ok(Json(row.into()));
        }
    }

    let edges = load_edges(&state).await?;
    let summary = reputation(&edges, &did, &ReputationOptions::default());
    let now = Utc::now();

    sqlx::query(
        "INSERT INTO reputation_cache (did, score, direct_trusters, transitive_trusters, last_computed)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (did) DO UPDATE
         SET score = EXCLUDED.score,
             direct_trusters = EXCLUDED.direct_trusters,
             transitive_trusters = EXCLUDED.transitive_trusters,
             last_computed = EXCLUDED.last_computed",
    )
    .bind(&did)
    .bind(summary.score)
    .bind(summary.direct_trusters as i32)
    .bind(summary.transitive_trusters as i32)
    .bind(now)
    .execute(&state.pool)
    .await?;

    Ok(Json(ScoreResponse {
        did,
        score: summary.score,
        direct_trusters: summary.direct_trusters as i32,
        transitive_trusters: summary.transitive_trusters as i32,
        last_computed: now,
    }))
}

async fn get_path(
    State(state): State<Arc<AppState>>,
    Path((from, to)): Path<(String, String)>,
) -> Result<Json<fides_trust_graph::PathResult>, ApiError> {
    let edges = load_edges(&state).await?;
    let result = find_path(&edges, &from, &to, &PathOptions::default());
    Ok(Json(result))
}

/// Revoke an edge. Only the edge's source may revoke it, proven by a
/// verified request signature; revocation is terminal and idempotent.
async fn revoke_trust(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<VerifiedCaller>,
    Path((source, target)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    match caller.0 {
        Some(ref did) if *did == source => {}
        Some(_) => {
            return Err(ApiError::Forbidden(
                "only the edge source may revoke it".to_string(),
            ))
        }
        None => {
            return Err(ApiError::Forbidden(
                "revocation requires a signed request".to_string(),
            ))
        }
    }

    let existing = sqlx::query_as::<_, (Uuid, Option<DateTime<Utc>>)>(
        "SELECT id, revoked_at FROM trust_edges WHERE source = $1 AND target = $2",
    )
    .bind(&source)
    .bind(&target)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| ApiError::NotFound("trust edge not found".to_string()))?;

    let (edge_id, revoked_at) = existing;

    if revoked_at.is_none() {
        sqlx::query("UPDATE trust_edges SET revoked_at = now() WHERE id = $1")
            .bind(edge_id)
            .execute(&state.pool)
            .await?;

        sqlx::query("UPDATE reputation_cache SET last_computed = to_timestamp(0) WHERE did = $1")
            .bind(&target)
            .execute(&state.pool)
            .await?;

        info!(%source, %target, "Trust edge revoked");
    }

    Ok(Json(json!({ "id": edge_id })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fides_crypto::{hex_encode, KeyPair};
    use fides_identity::derive_did;

    fn dids() -> (String, String, KeyPair) {
        let issuer = KeyPair::generate();
        let issuer_did = derive_did(&issuer.public_key_bytes()).unwrap();
        let subject_did = derive_did(&KeyPair::generate().public_key_bytes()).unwrap();
        (issuer_did, subject_did, issuer)
    }

    fn valid_body() -> (Value, KeyPair) {
        let (issuer_did, subject_did, keypair) = dids();
        let payload = json!({
            "id": "b2f9f3c0-0000-0000-0000-000000000000",
            "issuerDid": issuer_did,
            "subjectDid": subject_did,
            "trustLevel": 80,
            "issuedAt": "2026-01-01T00:00:00.000Z",
        })
        .to_string();
        let signature = hex_encode(&keypair.sign(payload.as_bytes()));

        (
            json!({
                "issuerDid": issuer_did,
                "subjectDid": subject_did,
                "trustLevel": 80,
                "signature": signature,
                "payload": payload,
            }),
            keypair,
        )
    }

    #[test]
    fn valid_body_passes_validation_and_binding() {
        let (body, keypair) = valid_body();
        let input = validate_create_trust(&body).unwrap();

        assert_eq!(input.trust_level, 80);
        check_payload_binding(&input).unwrap();

        let verified =
            verify_signature(input.payload.as_bytes(), &input.signature, &keypair.public_key_bytes())
                .unwrap();
        assert!(verified);
    }

    #[test]
    fn boundary_levels_are_accepted_and_rejected() {
        let (mut body, _) = valid_body();

        body["trustLevel"] = json!(0);
        assert!(validate_create_trust(&body).is_ok());

        body["trustLevel"] = json!(100);
        assert!(validate_create_trust(&body).is_ok());

        body["trustLevel"] = json!(-1);
        assert!(matches!(
            validate_create_trust(&body),
            Err(ApiError::Validation(_))
        ));

        body["trustLevel"] = json!(101);
        assert!(matches!(
            validate_create_trust(&body),
            Err(ApiError::Validation(_))
        ));

        body["trustLevel"] = json!(80.5);
        assert!(matches!(
            validate_create_trust(&body),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn malformed_signature_is_rejected() {
        let (mut body, _) = valid_body();

        body["signature"] = json!("zz");
        assert!(matches!(
            validate_create_trust(&body),
            Err(ApiError::Validation(_))
        ));

        body["signature"] = json!("ab".repeat(10));
        assert!(matches!(
            validate_create_trust(&body),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn invalid_identifiers_are_rejected() {
        let (mut body, _) = valid_body();
        body["issuerDid"] = json!("did:web:example.com");
        assert!(matches!(
            validate_create_trust(&body),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn payload_binding_catches_mismatches() {
        let (body, _) = valid_body();
        let mut input = validate_create_trust(&body).unwrap();

        input.trust_level = 90;
        assert!(matches!(
            check_payload_binding(&input),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn bad_expiry_is_rejected() {
        let (mut body, _) = valid_body();
        body["expiresAt"] = json!("tomorrow");
        assert!(matches!(
            validate_create_trust(&body),
            Err(ApiError::Validation(_))
        ));

        body["expiresAt"] = json!("2027-01-01T00:00:00Z");
        assert!(validate_create_trust(&body).is_ok());
    }
}
