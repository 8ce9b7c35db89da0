use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use hmac::Hmac;
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroize;

use fides_crypto::{base64_decode, base64_encode, KeyError, KeyResult};

/// PBKDF2-HMAC-SHA256 iteration count. Mandatory; lowering it would weaken
/// every record written afterwards.
pub const PBKDF2_ITERATIONS: u32 = 600_000;

const SALT_LENGTH: usize = 32;
const IV_LENGTH: usize = 12;
const TAG_LENGTH: usize = 16;
const KEY_LENGTH: usize = 32;

/// The AES-256-GCM ciphertext envelope persisted for an encrypted secret.
///
/// All fields are base64. The GCM authentication tag is stored detached from
/// the ciphertext.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CipherEnvelope {
    pub iv: String,
    pub salt: String,
    pub auth_tag: String,
    pub ciphertext: String,
}

fn derive_key(passphrase: &str, salt: &[u8]) -> KeyResult<[u8; KEY_LENGTH]> {
    let mut key = [0u8; KEY_LENGTH];
    pbkdf2::pbkdf2::<Hmac<Sha256>>(passphrase.as_bytes(), salt, PBKDF2_ITERATIONS, &mut key)
        .map_err(|e| KeyError::Encryption(format!("Key derivation failed: {}", e)))?;
    Ok(key)
}

/// Encrypt a secret under a passphrase, producing a fresh salt and IV.
pub fn seal(secret: &[u8], passphrase: &str) -> KeyResult<CipherEnvelope> {
    let mut salt = [0u8; SALT_LENGTH];
    let mut iv = [0u8; IV_LENGTH];
    OsRng.fill_bytes(&mut salt);
    OsRng.fill_bytes(&mut iv);

    let mut key = derive_key(passphrase, &salt)?;

    let cipher = Aes256Gcm::new_from_slice(&key)
        .map_err(|e| KeyError::Encryption(format!("Failed to create cipher: {}", e)));
    key.zeroize();
    let cipher = cipher?;

    let nonce = Nonce::from_slice(&iv);
    let mut sealed = cipher
        .encrypt(nonce, secret)
        .map_err(|e| KeyError::Encryption(format!("Encryption failed: {}", e)))?;

    // aes-gcm appends the tag; the record format keeps it detached
    let tag = sealed.split_off(sealed.len() - TAG_LENGTH);

    Ok(CipherEnvelope {
        iv: base64_encode(&iv),
        salt: base64_encode(&salt),
        auth_tag: base64_encode(&tag),
        ciphertext: base64_encode(&sealed),
    })
}

/// Decrypt an envelope with a passphrase.
///
/// A wrong passphrase, a truncated record, or any tampering with the
/// ciphertext or tag surfaces as [`KeyError::Decryption`].
pub fn open(envelope: &CipherEnvelope, passphrase: &str) -> KeyResult<Vec<u8>> {
    let iv = base64_decode(&envelope.iv)?;
    let salt = base64_decode(&envelope.salt)?;
    let tag = base64_decode(&envelope.auth_tag)?;
    let ciphertext = base64_decode(&envelope.ciphertext)?;

    if iv.len() != IV_LENGTH {
        return Err(KeyError::Decryption(format!(
            "Invalid IV length: {}",
            iv.len()
        )));
    }
    if tag.len() != TAG_LENGTH {
        return Err(KeyError::Decryption(format!(
            "Invalid auth tag length: {}",
            tag.len()
        )));
    }

    let mut key = derive_key(passphrase, &salt)?;
    let cipher = Aes256Gcm::new_from_slice(&key)
        .map_err(|e| KeyError::Decryption(format!("Failed to create cipher: {}", e)));
    key.zeroize();
    let cipher = cipher?;

    let mut sealed = ciphertext;
    sealed.extend_from_slice(&tag);

    let nonce = Nonce::from_slice(&iv);
    cipher
        .decrypt(nonce, sealed.as_ref())
        .map_err(|_| KeyError::Decryption("Decryption failed: wrong passphrase or corrupted record".to_string()))
}
