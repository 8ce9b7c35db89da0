use thiserror::Error;

/// Errors raised while resolving identities from the registry or a
/// self-hosted well-known document.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Registry returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Identity not found: {0}")]
    NotFound(String),

    #[error("Failed to decode registry response: {0}")]
    Decode(String),

    #[error("Registry key does not match the self-certifying identifier {0}")]
    KeyMismatch(String),
}

pub type DiscoveryResult<T> = Result<T, DiscoveryError>;
