//! Local key storage for Fides agents.
//!
//! Two keystores implement the same capability set: an in-memory store for
//! tests and short-lived processes, and a file-backed store that is the
//! default for long-lived agents. File records follow the documented JSON
//! shape and seal secrets with PBKDF2-SHA256 + AES-256-GCM when a
//! passphrase is configured.

pub mod envelope;
pub mod file;
pub mod memory;
pub mod record;

use async_trait::async_trait;

use fides_crypto::{KeyPair, KeyResult};

pub use envelope::{CipherEnvelope, PBKDF2_ITERATIONS};
pub use file::FileKeyStore;
pub use memory::MemoryKeyStore;
pub use record::{KeyMaterial, KeyRecord};

/// Storage operations shared by every keystore variant.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Persist a keypair under an identifier.
    async fn save(&self, did: &str, keypair: &KeyPair) -> KeyResult<()>;

    /// Load the keypair stored under an identifier.
    async fn load(&self, did: &str) -> KeyResult<KeyPair>;

    /// Whether a keypair is stored under an identifier.
    async fn contains(&self, did: &str) -> KeyResult<bool>;

    /// All stored identifiers, sorted.
    async fn list(&self) -> KeyResult<Vec<String>>;
}
