use sha2::{Digest, Sha256, Sha512};

/// SHA-256 digest of arbitrary bytes.
pub fn sha256(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// SHA-512 digest of arbitrary bytes.
pub fn sha512(bytes: &[u8]) -> [u8; 64] {
    let mut hasher = Sha512::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_known_vector() {
        // SHA-256 of the empty string
        let digest = sha256(b"");
        assert_eq!(
            hex::encode(digest),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn sha512_length() {
        assert_eq!(sha512(b"fides").len(), 64);
    }
}
