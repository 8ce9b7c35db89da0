use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Deadline for a single registry lookup.
pub const REGISTRY_FETCH_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Registry returned {0}")]
    Status(u16),

    #[error("Failed to decode registry response: {0}")]
    Decode(String),
}

/// An identity record as served by the discovery registry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryIdentity {
    pub did: String,
    /// Hex-encoded public key.
    pub public_key: String,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// Thin client for the discovery registry, used to materialize identities
/// the trust service has not seen yet.
pub struct RegistryClient {
    http: reqwest::Client,
    base_url: String,
}

impl RegistryClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, RegistryError> {
        let http = reqwest::Client::builder()
            .timeout(REGISTRY_FETCH_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Fetch an identity. `Ok(None)` means the registry is healthy but does
    /// not know the identifier.
    pub async fn fetch_identity(
        &self,
        did: &str,
    ) -> Result<Option<RegistryIdentity>, RegistryError> {
        let url = format!("{}/identities/{}", self.base_url, did);
        let response = self.http.get(&url).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response
                .json::<RegistryIdentity>()
                .await
                .map(Some)
                .map_err(|e| RegistryError::Decode(e.to_string())),
            status => Err(RegistryError::Status(status.as_u16())),
        }
    }
}
