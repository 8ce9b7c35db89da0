//! Self-certifying identifiers for Fides agents.
//!
//! A `did:fides` identifier is the base58 encoding of the agent's Ed25519
//! public key behind a fixed prefix, so resolving an identifier never
//! requires trusting a directory: parsing it recovers the exact key bytes.

pub mod did;
pub mod document;

pub use did::{derive_did, is_valid_did, parse_did, Did, DID_PREFIX};
pub use document::agent_document;
