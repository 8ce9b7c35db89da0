use thiserror::Error;

/// Errors raised by key generation, encoding, and key storage operations.
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Key generation error: {0}")]
    Generation(String),

    #[error("Invalid secret key length: expected 32 bytes, got {0}")]
    InvalidSeedLength(usize),

    #[error("Invalid public key length: expected 32 bytes, got {0}")]
    InvalidPublicKeyLength(usize),

    #[error("Invalid signature length: expected 64 bytes, got {0}")]
    InvalidSignatureLength(usize),

    #[error("Decoding error: {0}")]
    Decode(String),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Decryption error: {0}")]
    Decryption(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("Stored identifier {stored} does not match requested identifier {requested}")]
    IdentifierMismatch { stored: String, requested: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type KeyResult<T> = Result<T, KeyError>;
