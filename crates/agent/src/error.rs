use thiserror::Error;

/// Errors surfaced by the agent client layer.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Key error: {0}")]
    Key(#[from] fides_crypto::KeyError),

    #[error("Signature error: {0}")]
    Signature(#[from] fides_signature::SignatureError),

    #[error("Trust error: {0}")]
    Trust(#[from] fides_attestation::TrustError),

    #[error("Discovery error: {0}")]
    Discovery(#[from] fides_resolver::DiscoveryError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Service returned {status}: {message}")]
    Service { status: u16, message: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("No active identity configured")]
    NoActiveIdentity,
}

pub type AgentResult<T> = Result<T, AgentError>;
