use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;

use crate::error::{KeyError, KeyResult};

/// Length in bytes of an Ed25519 public key.
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// Length in bytes of an Ed25519 secret seed.
pub const SECRET_KEY_LENGTH: usize = 32;

/// Length in bytes of an Ed25519 signature.
pub const SIGNATURE_LENGTH: usize = 64;

/// An exclusively owned Ed25519 keypair.
///
/// The secret seed never leaves this struct unencrypted except through
/// [`KeyPair::secret_key_bytes`], which exists for the keystore to persist
/// it inside an encrypted envelope.
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl KeyPair {
    /// Generate a new random keypair from the operating system RNG.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        let verifying_key = VerifyingKey::from(&signing_key);

        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Reconstruct a keypair from a 32-byte secret seed.
    pub fn from_seed(seed: &[u8]) -> KeyResult<Self> {
        let seed: [u8; SECRET_KEY_LENGTH] = seed
            .try_into()
            .map_err(|_| KeyError::InvalidSeedLength(seed.len()))?;

        let signing_key = SigningKey::from_bytes(&seed);
        let verifying_key = VerifyingKey::from(&signing_key);

        Ok(Self {
            signing_key,
            verifying_key,
        })
    }

    /// Get the public key as raw bytes.
    pub fn public_key_bytes(&self) -> [u8; PUBLIC_KEY_LENGTH] {
        self.verifying_key.to_bytes()
    }

    /// Get the secret seed as raw bytes.
    ///
    /// Callers must not let the returned bytes escape process memory
    /// unencrypted; the keystore wraps them in an AES-256-GCM envelope.
    pub fn secret_key_bytes(&self) -> [u8; SECRET_KEY_LENGTH] {
        self.signing_key.to_bytes()
    }

    /// Sign an arbitrary message, returning the 64-byte signature.
    pub fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_LENGTH] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The secret half is intentionally not printed.
        f.debug_struct("KeyPair")
            .field("public_key", &hex::encode(self.public_key_bytes()))
            .finish()
    }
}

/// Verify an Ed25519 signature over a message.
///
/// Length mismatches on the key or signature are reported as errors so
/// callers can distinguish malformed inputs from a signature that simply
/// does not verify; an intact but wrong signature returns `Ok(false)`.
pub fn verify_signature(message: &[u8], signature: &[u8], public_key: &[u8]) -> KeyResult<bool> {
    let key_bytes: [u8; PUBLIC_KEY_LENGTH] = public_key
        .try_into()
        .map_err(|_| KeyError::InvalidPublicKeyLength(public_key.len()))?;

    let sig_bytes: [u8; SIGNATURE_LENGTH] = signature
        .try_into()
        .map_err(|_| KeyError::InvalidSignatureLength(signature.len()))?;

    let verifying_key = match VerifyingKey::from_bytes(&key_bytes) {
        Ok(key) => key,
        // Not a valid curve point
        Err(_) => return Ok(false),
    };

    let signature = Signature::from_bytes(&sig_bytes);

    Ok(verifying_key.verify(message, &signature).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_round_trip() {
        let keypair = KeyPair::generate();
        let message = b"agent-to-agent message";

        let signature = keypair.sign(message);

        let valid = verify_signature(message, &signature, &keypair.public_key_bytes()).unwrap();
        assert!(valid);
    }

    #[test]
    fn verify_rejects_tampered_message() {
        let keypair = KeyPair::generate();
        let signature = keypair.sign(b"original");

        let valid = verify_signature(b"tampered", &signature, &keypair.public_key_bytes()).unwrap();
        assert!(!valid);
    }

    #[test]
    fn verify_rejects_wrong_key() {
        let keypair = KeyPair::generate();
        let other = KeyPair::generate();
        let signature = keypair.sign(b"message");

        let valid = verify_signature(b"message", &signature, &other.public_key_bytes()).unwrap();
        assert!(!valid);
    }

    #[test]
    fn length_mismatches_are_errors() {
        let keypair = KeyPair::generate();
        let signature = keypair.sign(b"message");

        let short_key = verify_signature(b"message", &signature, &[0u8; 16]);
        assert!(matches!(short_key, Err(KeyError::InvalidPublicKeyLength(16))));

        let short_sig = verify_signature(b"message", &[0u8; 10], &keypair.public_key_bytes());
        assert!(matches!(short_sig, Err(KeyError::InvalidSignatureLength(10))));
    }

    #[test]
    fn from_seed_restores_keypair() {
        let keypair = KeyPair::generate();
        let restored = KeyPair::from_seed(&keypair.secret_key_bytes()).unwrap();

        assert_eq!(keypair.public_key_bytes(), restored.public_key_bytes());

        let signature = restored.sign(b"same keys");
        assert!(verify_signature(b"same keys", &signature, &keypair.public_key_bytes()).unwrap());
    }

    #[test]
    fn from_seed_rejects_short_seed() {
        let result = KeyPair::from_seed(&[1u8; 31]);
        assert!(matches!(result, Err(KeyError::InvalidSeedLength(31))));
    }
}
