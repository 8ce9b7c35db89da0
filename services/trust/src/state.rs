use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use fides_signature::NonceStore;
use sqlx::PgPool;
use tokio::time::Instant;

use crate::breaker::CircuitBreaker;
use crate::registry::RegistryClient;

/// How long a "known identity" marker stays valid.
pub const KNOWN_IDENTITY_TTL: Duration = Duration::from_secs(30 * 60);

/// Shared application state across all routes.
pub struct AppState {
    /// Database connection pool
    pub pool: PgPool,

    /// Client for the discovery registry
    pub registry: RegistryClient,

    /// Guard in front of registry fetches
    pub breaker: CircuitBreaker,

    /// Replay protection for inbound signed requests
    pub nonce_store: NonceStore,

    /// Identifiers known to exist locally, to skip redundant lookups
    known_identities: Mutex<HashMap<String, Instant>>,
}

impl AppState {
    pub fn new(pool: PgPool, registry: RegistryClient, breaker: CircuitBreaker) -> Self {
        Self {
            pool,
            registry,
            breaker,
            nonce_store: NonceStore::new(),
            known_identities: Mutex::new(HashMap::new()),
        }
    }

    /// Whether the identifier was marked known within the TTL.
    pub fn is_known(&self, did: &str) -> bool {
        let known = self.known_identities.lock().expect("identity cache poisoned");
        known
            .get(did)
            .map_or(false, |at| at.elapsed() < KNOWN_IDENTITY_TTL)
    }

    /// Mark an identifier as known.
    pub fn mark_known(&self, did: &str) {
        let mut known = self.known_identities.lock().expect("identity cache poisoned");
        known.insert(did.to_string(), Instant::now());
    }
}
