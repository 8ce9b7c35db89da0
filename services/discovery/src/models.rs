use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use fides_crypto::hex_encode;

/// An identity row as stored in Postgres.
#[derive(Debug, Clone, FromRow)]
pub struct IdentityRow {
    pub did: String,
    pub public_key: Vec<u8>,
    pub metadata: Option<serde_json::Value>,
    pub domain: Option<String>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// The wire form of an identity record.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityResponse {
    pub did: String,
    pub public_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl From<IdentityRow> for IdentityResponse {
    fn from(row: IdentityRow) -> Self {
        Self {
            did: row.did,
            public_key: hex_encode(&row.public_key),
            metadata: row.metadata,
            domain: row.domain,
            first_seen: row.first_seen,
            last_seen: row.last_seen,
        }
    }
}
