use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use fides_crypto::{KeyError, KeyPair, KeyResult};

use crate::KeyStore;

/// In-memory keystore for tests and short-lived processes.
///
/// Holds secret seeds only in process memory; nothing is persisted.
#[derive(Default)]
pub struct MemoryKeyStore {
    keys: RwLock<HashMap<String, [u8; 32]>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn save(&self, did: &str, keypair: &KeyPair) -> KeyResult<()> {
        let mut keys = self.keys.write().await;
        keys.insert(did.to_string(), keypair.secret_key_bytes());
        Ok(())
    }

    async fn load(&self, did: &str) -> KeyResult<KeyPair> {
        let keys = self.keys.read().await;
        let seed = keys
            .get(did)
            .ok_or_else(|| KeyError::NotFound(did.to_string()))?;
        KeyPair::from_seed(seed)
    }

    async fn contains(&self, did: &str) -> KeyResult<bool> {
        Ok(self.keys.read().await.contains_key(did))
    }

    async fn list(&self) -> KeyResult<Vec<String>> {
        let mut dids: Vec<String> = self.keys.read().await.keys().cloned().collect();
        dids.sort();
        Ok(dids)
    }
}
