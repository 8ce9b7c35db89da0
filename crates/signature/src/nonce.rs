use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

/// Default lifetime of a seen nonce.
pub const DEFAULT_NONCE_TTL: Duration = Duration::from_secs(300);

/// How often the eviction task sweeps expired nonces.
const EVICTION_INTERVAL: Duration = Duration::from_secs(60);

/// Bounded set of recently seen signature nonces.
///
/// `check` is atomic insert-if-absent: the first caller for a nonce gets
/// `true`, every caller within the TTL after that gets `false`. A background
/// task evicts expired entries; `dispose` (or dropping the store) cancels it.
pub struct NonceStore {
    seen: Arc<Mutex<HashMap<String, Instant>>>,
    ttl: Duration,
    eviction: JoinHandle<()>,
}

impl NonceStore {
    /// Create a store with the default 300 second TTL.
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_NONCE_TTL)
    }

    /// Create a store with a custom TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        let seen: Arc<Mutex<HashMap<String, Instant>>> = Arc::new(Mutex::new(HashMap::new()));

        let eviction = {
            let seen = Arc::clone(&seen);
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(EVICTION_INTERVAL);
                interval.tick().await;
                loop {
                    interval.tick().await;
                    let now = Instant::now();
                    let mut map = seen.lock().expect("nonce store poisoned");
                    let before = map.len();
                    map.retain(|_, inserted| now.duration_since(*inserted) < ttl);
                    let evicted = before - map.len();
                    if evicted > 0 {
                        debug!(evicted, remaining = map.len(), "Evicted expired nonces");
                    }
                }
            })
        };

        Self { seen, ttl, eviction }
    }

    /// Record a nonce. Returns `false` when the nonce was already seen
    /// within the TTL (a replay), `true` when it is fresh.
    pub fn check(&self, nonce: &str) -> bool {
        let now = Instant::now();
        let mut map = self.seen.lock().expect("nonce store poisoned");

        match map.get(nonce) {
            Some(inserted) if now.duration_since(*inserted) < self.ttl => false,
            _ => {
                map.insert(nonce.to_string(), now);
                true
            }
        }
    }

    /// Number of nonces currently tracked.
    pub fn len(&self) -> usize {
        self.seen.lock().expect("nonce store poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear the set and cancel the eviction task.
    pub fn dispose(&self) {
        self.eviction.abort();
        self.seen.lock().expect("nonce store poisoned").clear();
    }
}

impl Default for NonceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for NonceStore {
    fn drop(&mut self) {
        self.eviction.abort();
    }
}
