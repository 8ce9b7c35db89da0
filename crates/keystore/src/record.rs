use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use fides_crypto::{base64_decode, base64_encode, KeyError, KeyPair, KeyResult};

use crate::envelope::{self, CipherEnvelope};

/// Secret key material as persisted inside a key record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyMaterial {
    /// Passphrase-protected AES-256-GCM envelope.
    Encrypted(CipherEnvelope),
    /// Base64 plaintext secret, used only when no passphrase is configured.
    Plain {
        #[serde(rename = "privateKey")]
        private_key: String,
    },
}

/// The on-disk representation of a stored keypair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyRecord {
    pub did: String,
    pub public_key: String,
    pub encrypted: bool,
    pub data: KeyMaterial,
    pub created_at: DateTime<Utc>,
}

impl KeyRecord {
    /// Build a record for a keypair, sealing the secret when a passphrase is
    /// configured.
    pub fn seal(did: &str, keypair: &KeyPair, passphrase: Option<&str>) -> KeyResult<Self> {
        let mut secret = keypair.secret_key_bytes();

        let (encrypted, data) = match passphrase {
            Some(passphrase) => {
                let envelope = envelope::seal(&secret, passphrase)?;
                (true, KeyMaterial::Encrypted(envelope))
            }
            None => (
                false,
                KeyMaterial::Plain {
                    private_key: base64_encode(&secret),
                },
            ),
        };
        secret.zeroize();

        Ok(Self {
            did: did.to_string(),
            public_key: base64_encode(&keypair.public_key_bytes()),
            encrypted,
            data,
            created_at: Utc::now(),
        })
    }

    /// Recover the keypair from this record.
    pub fn open(&self, passphrase: Option<&str>) -> KeyResult<KeyPair> {
        let mut secret = match (&self.data, passphrase) {
            (KeyMaterial::Encrypted(envelope), Some(passphrase)) => {
                envelope::open(envelope, passphrase)?
            }
            (KeyMaterial::Encrypted(_), None) => {
                return Err(KeyError::Decryption(
                    "Record is encrypted but no passphrase is configured".to_string(),
                ))
            }
            (KeyMaterial::Plain { private_key }, _) => base64_decode(private_key)?,
        };

        let keypair = KeyPair::from_seed(&secret);
        secret.zeroize();
        keypair
    }
}
