//! Client-side identity resolution.
//!
//! Resolves an identifier or a bare domain to a public identity record:
//! domains are tried against their own `/.well-known/fides.json` first and
//! fall back to the configured registry; identifiers go straight to the
//! registry. Positive results are cached in memory with a TTL.

pub mod error;

use std::collections::HashMap;
use std::time::{Duration, Instant};

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use fides_crypto::{hex_decode, PUBLIC_KEY_LENGTH};
use fides_identity::{parse_did, DID_PREFIX};

pub use error::{DiscoveryError, DiscoveryResult};

/// Default lifetime of a cached resolution.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Default deadline for a single registry or well-known fetch.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

/// A public identity record as served by the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedIdentity {
    pub did: String,
    /// Hex-encoded Ed25519 public key.
    pub public_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

/// Shape of a self-hosted `/.well-known/fides.json` document.
#[derive(Debug, Deserialize)]
struct WellKnownDocument {
    #[serde(default)]
    identities: Vec<ResolvedIdentity>,
}

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub registry_url: String,
    pub cache_ttl: Duration,
    pub request_timeout: Duration,
}

impl ResolverConfig {
    pub fn new(registry_url: impl Into<String>) -> Self {
        Self {
            registry_url: registry_url.into(),
            cache_ttl: DEFAULT_CACHE_TTL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

struct CacheEntry {
    identity: ResolvedIdentity,
    fetched_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

/// Resolves identities with an in-memory positive cache.
pub struct Resolver {
    config: ResolverConfig,
    client: reqwest::Client,
    cache: RwLock<HashMap<String, CacheEntry>>,
}

impl Resolver {
    pub fn new(config: ResolverConfig) -> DiscoveryResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            config,
            client,
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// Resolve an identifier or a bare domain to an identity record.
    pub async fn resolve(&self, input: &str) -> DiscoveryResult<ResolvedIdentity> {
        {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.get(input) {
                if entry.is_fresh(self.config.cache_ttl) {
                    debug!(input, "Resolved from cache");
                    return Ok(entry.identity.clone());
                }
            }
        }

        let identity = if input.starts_with(DID_PREFIX) {
            self.resolve_did(input).await?
        } else {
            self.resolve_domain(input).await?
        };

        let mut cache = self.cache.write().await;
        cache.insert(
            input.to_string(),
            CacheEntry {
                identity: identity.clone(),
                fetched_at: Instant::now(),
            },
        );

        Ok(identity)
    }

    /// Resolve an identifier and return its public key bytes, checking the
    /// registry's answer against the self-certifying identifier.
    pub async fn resolve_key(&self, did: &str) -> DiscoveryResult<[u8; PUBLIC_KEY_LENGTH]> {
        let identity = self.resolve(did).await?;

        let registry_key = hex_decode(&identity.public_key)
            .map_err(|e| DiscoveryError::Decode(e.to_string()))?;
        let embedded_key =
            parse_did(did).map_err(|e| DiscoveryError::Decode(e.to_string()))?;

        if registry_key != embedded_key {
            return Err(DiscoveryError::KeyMismatch(did.to_string()));
        }

        Ok(embedded_key)
    }

    /// Drop every cached entry.
    pub async fn clear_cache(&self) {
        self.cache.write().await.clear();
    }

    async fn resolve_did(&self, did: &str) -> DiscoveryResult<ResolvedIdentity> {
        let url = format!("{}/identities/{}", self.config.registry_url.trim_end_matches('/'), did);
        let response = self.client.get(&url).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(DiscoveryError::NotFound(did.to_string())),
            status if status.is_success() => response
                .json::<ResolvedIdentity>()
                .await
                .map_err(|e| DiscoveryError::Decode(e.to_string())),
            status => Err(DiscoveryError::Status {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            }),
        }
    }

    async fn resolve_domain(&self, domain: &str) -> DiscoveryResult<ResolvedIdentity> {
        match self.fetch_well_known(domain).await {
            Ok(Some(identity)) => return Ok(identity),
            Ok(None) => debug!(domain, "Well-known document has no identities"),
            Err(e) => warn!(domain, error = %e, "Well-known lookup failed, falling back to registry"),
        }

        let url = format!(
            "{}/identities?domain={}",
            self.config.registry_url.trim_end_matches('/'),
            domain
        );
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(DiscoveryError::Status {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let identities = response
            .json::<Vec<ResolvedIdentity>>()
            .await
            .map_err(|e| DiscoveryError::Decode(e.to_string()))?;

        identities
            .into_iter()
            .next()
            .ok_or_else(|| DiscoveryError::NotFound(domain.to_string()))
    }

    async fn fetch_well_known(
        &self,
        domain: &str,
    ) -> DiscoveryResult<Option<ResolvedIdentity>> {
        let url = format!("https://{}/.well-known/fides.json", domain);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(DiscoveryError::Status {
                status: response.status().as_u16(),
                message: String::new(),
            });
        }

        let document = response
            .json::<WellKnownDocument>()
            .await
            .map_err(|e| DiscoveryError::Decode(e.to_string()))?;

        Ok(document.identities.into_iter().next())
    }
}
