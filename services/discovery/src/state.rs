use fides_signature::NonceStore;
use sqlx::PgPool;

/// Shared application state across all routes.
pub struct AppState {
    /// Database connection pool
    pub pool: PgPool,

    /// Domain this registry serves its own well-known document for
    pub service_domain: Option<String>,

    /// Replay protection for inbound signed requests
    pub nonce_store: NonceStore,
}

impl AppState {
    pub fn new(pool: PgPool, service_domain: Option<String>) -> Self {
        Self {
            pool,
            service_domain,
            nonce_store: NonceStore::new(),
        }
    }
}
