//! HTTP message signatures between Fides agents, per RFC 9421.
//!
//! The canonicalizer builds the signature base string over derived
//! components and headers; the signer and verifier bind requests to an
//! agent's Ed25519 key with body-digest binding, timestamp freshness, and
//! optional nonce replay protection.

pub mod canonical;
pub mod error;
pub mod nonce;
pub mod request;
pub mod sign;
pub mod verify;

pub use canonical::{
    build_signature_base, default_components, parse_signature_input, serialize_signature_input,
    ParsedSignatureInput, SignatureParams,
};
pub use error::{SignatureError, SignatureResult};
pub use nonce::{NonceStore, DEFAULT_NONCE_TTL};
pub use request::{CanonicalRequest, RequestMessage};
pub use sign::{content_digest, sign_request, SignOptions, DEFAULT_LABEL, DEFAULT_SIGNATURE_TTL};
pub use verify::{verify_request, VerificationOutcome, VerifyOptions, DEFAULT_CLOCK_DRIFT};
