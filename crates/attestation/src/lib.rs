//! Signed trust statements between Fides agents.
//!
//! An attestation binds an issuer to a statement of trust in a subject at
//! an integer level from 0 to 100. The signed payload bytes are
//! authoritative: the envelope repeats the payload fields for convenience,
//! and verification re-checks every one of them against the payload in
//! constant time, so an attestation cannot sign one statement and present
//! another.

pub mod error;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use fides_crypto::{constant_time_eq_str, verify_signature, KeyPair, SIGNATURE_LENGTH};
use fides_identity::Did;

pub use error::{TrustError, TrustResult};

/// Maximum trust level.
pub const MAX_TRUST_LEVEL: u8 = 100;

/// The canonical payload that gets signed. Field order here is the
/// serialization order, and the serialized string must not be regenerated
/// after signing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttestationPayload {
    pub id: String,
    pub issuer_did: String,
    pub subject_did: String,
    pub trust_level: u8,
    pub issued_at: String,
}

/// A signed trust statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attestation {
    pub id: String,
    pub issuer_did: String,
    pub subject_did: String,
    pub trust_level: u8,
    pub issued_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Hex-encoded 64-byte Ed25519 signature over `payload`.
    pub signature: String,
    /// The exact JSON string that was signed.
    pub payload: String,
}

/// Create and sign an attestation from issuer to subject.
pub fn create_attestation(
    issuer_did: &str,
    subject_did: &str,
    trust_level: u8,
    keypair: &KeyPair,
) -> TrustResult<Attestation> {
    let issuer = Did::new(issuer_did)
        .map_err(|e| TrustError::InvalidIdentifier(format!("issuer: {}", e)))?;
    let subject = Did::new(subject_did)
        .map_err(|e| TrustError::InvalidIdentifier(format!("subject: {}", e)))?;

    if trust_level > MAX_TRUST_LEVEL {
        return Err(TrustError::InvalidTrustLevel(format!(
            "{} is outside 0..=100",
            trust_level
        )));
    }

    let payload = AttestationPayload {
        id: Uuid::new_v4().to_string(),
        issuer_did: issuer.to_string(),
        subject_did: subject.to_string(),
        trust_level,
        issued_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    };

    let payload_json = serde_json::to_string(&payload)
        .map_err(|e| TrustError::Serialization(e.to_string()))?;

    let signature = keypair.sign(payload_json.as_bytes());

    Ok(Attestation {
        id: payload.id,
        issuer_did: payload.issuer_did,
        subject_did: payload.subject_did,
        trust_level: payload.trust_level,
        issued_at: payload.issued_at,
        expires_at: None,
        signature: hex::encode(signature),
        payload: payload_json,
    })
}

/// Verify an attestation against the issuer's public key.
///
/// Checks the Ed25519 signature over the stored payload bytes, then
/// requires every envelope field to equal its payload counterpart (string
/// fields compared in constant time). Any failure, including malformed
/// inputs, yields `false`.
pub fn verify_attestation(attestation: &Attestation, public_key: &[u8]) -> bool {
    let signature = match hex::decode(&attestation.signature) {
        Ok(bytes) if bytes.len() == SIGNATURE_LENGTH => bytes,
        _ => return false,
    };

    match verify_signature(attestation.payload.as_bytes(), &signature, public_key) {
        Ok(true) => {}
        _ => return false,
    }

    let payload: AttestationPayload = match serde_json::from_str(&attestation.payload) {
        Ok(payload) => payload,
        Err(_) => return false,
    };

    constant_time_eq_str(&attestation.id, &payload.id)
        && constant_time_eq_str(&attestation.issuer_did, &payload.issuer_did)
        && constant_time_eq_str(&attestation.subject_did, &payload.subject_did)
        && attestation.trust_level == payload.trust_level
        && constant_time_eq_str(&attestation.issued_at, &payload.issued_at)
}
