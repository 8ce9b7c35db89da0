use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use fides_attestation::Attestation;
use fides_signature::RequestMessage;
use fides_trust_graph::PathResult;

use crate::config::AgentConfig;
use crate::error::{AgentError, AgentResult};
use crate::identity::AgentIdentity;

/// Registration payload for the discovery registry.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest<'a> {
    did: &'a str,
    public_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    domain: Option<&'a str>,
}

/// Create-trust payload for the trust graph service.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateTrustRequest<'a> {
    issuer_did: &'a str,
    subject_did: &'a str,
    trust_level: u8,
    signature: &'a str,
    payload: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct CreateTrustResponse {
    id: String,
}

/// A subject's reputation as served by the trust graph service.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreView {
    pub did: String,
    pub score: f64,
    pub direct_trusters: i64,
    pub transitive_trusters: i64,
    #[serde(default)]
    pub last_computed: Option<DateTime<Utc>>,
}

/// HTTP client for the two backend services. Outbound requests are signed
/// with the calling identity.
pub struct AgentClient {
    http: reqwest::Client,
    discovery_url: String,
    trust_url: String,
}

impl AgentClient {
    pub fn from_config(config: &AgentConfig) -> AgentResult<Self> {
        Ok(Self {
            http: reqwest::Client::new(),
            discovery_url: config.discovery_url.trim_end_matches('/').to_string(),
            trust_url: config.trust_url.trim_end_matches('/').to_string(),
        })
    }

    /// Register an identity with the discovery registry.
    pub async fn register(
        &self,
        identity: &AgentIdentity,
        domain: Option<&str>,
        metadata: Option<Value>,
    ) -> AgentResult<()> {
        let body = serde_json::to_vec(&RegisterRequest {
            did: identity.did().as_str(),
            public_key: identity.public_key_hex(),
            metadata,
            domain,
        })
        .map_err(|e| AgentError::Serialization(e.to_string()))?;

        let url = format!("{}/identities", self.discovery_url);
        let response = self
            .signed_post(identity, &url, body)
            .await?;

        Self::expect_success(response).await?;
        debug!(did = identity.did().as_str(), "Registered identity");
        Ok(())
    }

    /// Submit an attestation as a trust edge. Returns the edge id.
    pub async fn submit_attestation(
        &self,
        identity: &AgentIdentity,
        attestation: &Attestation,
    ) -> AgentResult<String> {
        let body = serde_json::to_vec(&CreateTrustRequest {
            issuer_did: &attestation.issuer_did,
            subject_did: &attestation.subject_did,
            trust_level: attestation.trust_level,
            signature: &attestation.signature,
            payload: &attestation.payload,
            expires_at: attestation.expires_at,
        })
        .map_err(|e| AgentError::Serialization(e.to_string()))?;

        let url = format!("{}/v1/trust", self.trust_url);
        let response = self.signed_post(identity, &url, body).await?;
        let response = Self::expect_success(response).await?;

        let created: CreateTrustResponse = response.json().await?;
        Ok(created.id)
    }

    /// Revoke a previously submitted trust edge toward a subject.
    pub async fn revoke_trust(
        &self,
        identity: &AgentIdentity,
        subject_did: &str,
    ) -> AgentResult<()> {
        let url = format!(
            "{}/v1/trust/{}/{}",
            self.trust_url,
            identity.did(),
            subject_did
        );

        let mut message = RequestMessage::new("DELETE", &url)
            .with_header("content-type", "application/json");
        identity.sign_request(&mut message)?;

        let mut request = self.http.delete(&url);
        for (name, value) in message.headers() {
            request = request.header(name, value);
        }

        Self::expect_success(request.send().await?).await?;
        debug!(subject_did, "Revoked trust edge");
        Ok(())
    }

    /// Fetch a subject's reputation score.
    pub async fn fetch_score(&self, did: &str) -> AgentResult<ScoreView> {
        let url = format!("{}/v1/trust/{}/score", self.trust_url, did);
        let response = self.http.get(&url).send().await?;
        let response = Self::expect_success(response).await?;
        Ok(response.json().await?)
    }

    /// Fetch the shortest trust path between two identifiers.
    pub async fn fetch_path(&self, from: &str, to: &str) -> AgentResult<PathResult> {
        let url = format!("{}/v1/trust/{}/{}", self.trust_url, from, to);
        let response = self.http.get(&url).send().await?;
        let response = Self::expect_success(response).await?;
        Ok(response.json().await?)
    }

    /// Sign a JSON POST and transfer the signature headers onto the wire.
    async fn signed_post(
        &self,
        identity: &AgentIdentity,
        url: &str,
        body: Vec<u8>,
    ) -> AgentResult<reqwest::Response> {
        let mut message = RequestMessage::new("POST", url)
            .with_header("content-type", "application/json")
            .with_body(body.clone());
        identity.sign_request(&mut message)?;

        let mut request = self.http.post(url).body(body);
        for (name, value) in message.headers() {
            request = request.header(name, value);
        }

        Ok(request.send().await?)
    }

    async fn expect_success(response: reqwest::Response) -> AgentResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
            .unwrap_or_else(|| status.to_string());

        Err(AgentError::Service {
            status: status.as_u16(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_trust_request_uses_wire_names() {
        let request = CreateTrustRequest {
            issuer_did: "did:fides:a",
            subject_did: "did:fides:b",
            trust_level: 80,
            signature: "ab",
            payload: "{}",
            expires_at: None,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("issuerDid").is_some());
        assert!(json.get("subjectDid").is_some());
        assert!(json.get("trustLevel").is_some());
        assert!(json.get("expiresAt").is_none());
    }
}
