//! Cryptographic primitives for the Fides protocol.
//!
//! Ed25519 signing and verification, SHA-2 digests, the base58/base64/hex
//! codecs used by identifiers and wire formats, and constant-time equality
//! for secret-adjacent comparisons.

pub mod codec;
pub mod error;
pub mod hash;
pub mod keypair;

pub use codec::{
    base58_decode, base58_encode, base64_decode, base64_encode, constant_time_eq,
    constant_time_eq_str, hex_decode, hex_encode,
};
pub use error::{KeyError, KeyResult};
pub use hash::{sha256, sha512};
pub use keypair::{
    verify_signature, KeyPair, PUBLIC_KEY_LENGTH, SECRET_KEY_LENGTH, SIGNATURE_LENGTH,
};
