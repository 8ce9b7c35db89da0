use thiserror::Error;

/// Errors raised while creating or validating trust statements.
#[derive(Error, Debug)]
pub enum TrustError {
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Invalid trust level: {0}")]
    InvalidTrustLevel(String),

    #[error("Signature error: {0}")]
    Signature(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type TrustResult<T> = Result<T, TrustError>;
