use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use subtle::ConstantTimeEq;

use crate::error::{KeyError, KeyResult};

/// Encode bytes with the base58 Bitcoin alphabet.
pub fn base58_encode(bytes: &[u8]) -> String {
    bs58::encode(bytes).into_string()
}

/// Decode a base58 (Bitcoin alphabet) string.
pub fn base58_decode(input: &str) -> KeyResult<Vec<u8>> {
    bs58::decode(input)
        .into_vec()
        .map_err(|e| KeyError::Decode(format!("Invalid base58: {}", e)))
}

/// Encode bytes as standard base64.
pub fn base64_encode(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// Decode a standard base64 string.
pub fn base64_decode(input: &str) -> KeyResult<Vec<u8>> {
    BASE64
        .decode(input)
        .map_err(|e| KeyError::Decode(format!("Invalid base64: {}", e)))
}

/// Encode bytes as lowercase hex.
pub fn hex_encode(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Decode a hex string.
pub fn hex_decode(input: &str) -> KeyResult<Vec<u8>> {
    hex::decode(input).map_err(|e| KeyError::Decode(format!("Invalid hex: {}", e)))
}

/// Compare two byte slices in constant time.
///
/// Slices of different lengths compare unequal; the length check itself is
/// not secret. Used for signatures, digests, and identifier comparisons.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Constant-time equality over UTF-8 strings.
pub fn constant_time_eq_str(a: &str, b: &str) -> bool {
    constant_time_eq(a.as_bytes(), b.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base58_round_trip() {
        let bytes = [7u8; 32];
        let encoded = base58_encode(&bytes);
        assert_eq!(base58_decode(&encoded).unwrap(), bytes);
    }

    #[test]
    fn base58_rejects_invalid_alphabet() {
        // 0, O, I and l are not in the Bitcoin alphabet
        assert!(base58_decode("0OIl").is_err());
    }

    #[test]
    fn base64_round_trip() {
        let bytes = b"fides payload";
        let encoded = base64_encode(bytes);
        assert_eq!(base64_decode(&encoded).unwrap(), bytes);
    }

    #[test]
    fn hex_round_trip() {
        let bytes = [0xde, 0xad, 0xbe, 0xef];
        assert_eq!(hex_decode(&hex_encode(&bytes)).unwrap(), bytes);
    }

    #[test]
    fn constant_time_eq_behaviour() {
        assert!(constant_time_eq(b"same", b"same"));
        assert!(!constant_time_eq(b"same", b"diff"));
        assert!(!constant_time_eq(b"short", b"longer input"));
        assert!(constant_time_eq_str("did:fides:abc", "did:fides:abc"));
        assert!(!constant_time_eq_str("did:fides:abc", "did:fides:abd"));
    }
}
