use thiserror::Error;

/// Errors raised while canonicalizing, signing, or verifying HTTP messages.
#[derive(Error, Debug)]
pub enum SignatureError {
    #[error("Canonicalization error: {0}")]
    Canonicalization(String),

    #[error("Missing required header: {0}")]
    MissingHeader(String),

    #[error("Malformed Signature-Input header: {0}")]
    MalformedSignatureInput(String),

    #[error("Malformed Signature header: {0}")]
    MalformedSignature(String),

    #[error("Key error: {0}")]
    Key(#[from] fides_crypto::KeyError),

    #[error("Invalid request URI: {0}")]
    InvalidUri(String),
}

pub type SignatureResult<T> = Result<T, SignatureError>;
