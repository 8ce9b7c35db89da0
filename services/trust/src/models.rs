use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use fides_crypto::hex_encode;
use fides_trust_graph::TrustEdge;

/// A trust edge row as stored in Postgres.
#[derive(Debug, Clone, FromRow)]
pub struct EdgeRow {
    pub id: Uuid,
    pub source: String,
    pub target: String,
    pub trust_level: i16,
    pub attestation: String,
    pub signature: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl From<EdgeRow> for TrustEdge {
    fn from(row: EdgeRow) -> Self {
        TrustEdge {
            id: row.id,
            source: row.source,
            target: row.target,
            trust_level: row.trust_level.clamp(0, 100) as u8,
            attestation: row.attestation,
            signature: row.signature,
            created_at: row.created_at,
            expires_at: row.expires_at,
            revoked_at: row.revoked_at,
        }
    }
}

/// A cached reputation row.
#[derive(Debug, Clone, FromRow)]
pub struct ScoreRow {
    pub did: String,
    pub score: f64,
    pub direct_trusters: i32,
    pub transitive_trusters: i32,
    pub last_computed: DateTime<Utc>,
}

/// The wire form of a reputation score.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResponse {
    pub did: String,
    pub score: f64,
    pub direct_trusters: i32,
    pub transitive_trusters: i32,
    pub last_computed: DateTime<Utc>,
}

impl From<ScoreRow> for ScoreResponse {
    fn from(row: ScoreRow) -> Self {
        Self {
            did: row.did,
            score: row.score,
            direct_trusters: row.direct_trusters,
            transitive_trusters: row.transitive_trusters,
            last_computed: row.last_computed,
        }
    }
}

/// An identity row in this service's local view.
#[derive(Debug, Clone, FromRow)]
pub struct IdentityRow {
    pub did: String,
    pub public_key: Vec<u8>,
    pub metadata: Option<serde_json::Value>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityResponse {
    pub did: String,
    pub public_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl From<IdentityRow> for IdentityResponse {
    fn from(row: IdentityRow) -> Self {
        Self {
            did: row.did,
            public_key: hex_encode(&row.public_key),
            metadata: row.metadata,
            first_seen: row.first_seen,
            last_seen: row.last_seen,
        }
    }
}
