use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use fides_crypto::{base58_decode, base58_encode, constant_time_eq_str, KeyError, KeyResult};
use fides_crypto::PUBLIC_KEY_LENGTH;

/// Prefix shared by every Fides identifier.
pub const DID_PREFIX: &str = "did:fides:";

/// Derive the self-certifying identifier for an Ed25519 public key.
pub fn derive_did(public_key: &[u8]) -> KeyResult<String> {
    if public_key.len() != PUBLIC_KEY_LENGTH {
        return Err(KeyError::InvalidPublicKeyLength(public_key.len()));
    }
    Ok(format!("{}{}", DID_PREFIX, base58_encode(public_key)))
}

/// Recover the public key bytes embedded in an identifier.
pub fn parse_did(did: &str) -> KeyResult<[u8; PUBLIC_KEY_LENGTH]> {
    let suffix = did
        .strip_prefix(DID_PREFIX)
        .ok_or_else(|| KeyError::InvalidIdentifier(format!("missing {} prefix: {}", DID_PREFIX, did)))?;

    let bytes = base58_decode(suffix)
        .map_err(|_| KeyError::InvalidIdentifier(format!("invalid base58 suffix: {}", did)))?;

    bytes
        .as_slice()
        .try_into()
        .map_err(|_| KeyError::InvalidIdentifier(format!(
            "decoded key is {} bytes, expected {}",
            bytes.len(),
            PUBLIC_KEY_LENGTH
        )))
}

/// Boolean variant of [`parse_did`] that never raises.
pub fn is_valid_did(did: &str) -> bool {
    parse_did(did).is_ok()
}

/// A validated `did:fides` identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Did(String);

impl Did {
    /// Wrap an identifier string, validating its shape.
    pub fn new(did: impl Into<String>) -> KeyResult<Self> {
        let did = did.into();
        parse_did(&did)?;
        Ok(Self(did))
    }

    /// Derive the identifier owned by a public key.
    pub fn from_public_key(public_key: &[u8]) -> KeyResult<Self> {
        Ok(Self(derive_did(public_key)?))
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Recover the embedded public key bytes.
    pub fn public_key(&self) -> [u8; PUBLIC_KEY_LENGTH] {
        // Validated at construction, so this cannot fail.
        parse_did(&self.0).expect("Did invariant violated")
    }

    /// Constant-time equality against another identifier string.
    pub fn matches(&self, other: &str) -> bool {
        constant_time_eq_str(&self.0, other)
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Did {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for Did {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
