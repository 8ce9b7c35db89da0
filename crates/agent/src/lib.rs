//! The client surface of the Fides protocol.
//!
//! An agent mints a self-sovereign identity, signs its outbound HTTP
//! requests, verifies inbound ones by resolving the peer's key, and issues
//! trust attestations to the graph service.

pub mod client;
pub mod config;
pub mod error;
pub mod identity;

use fides_resolver::Resolver;
use fides_signature::{verify_request, CanonicalRequest, VerificationOutcome, VerifyOptions};

pub use client::{AgentClient, ScoreView};
pub use config::AgentConfig;
pub use error::{AgentError, AgentResult};
pub use identity::AgentIdentity;

/// Verify an inbound signed request by resolving the signer's key.
///
/// The `keyid` parameter names the peer identity; its public key is
/// resolved through the registry (with the resolver's cache) and
/// cross-checked against the self-certifying identifier before the
/// signature itself is verified.
pub async fn verify_incoming(
    resolver: &Resolver,
    request: &impl CanonicalRequest,
    options: &VerifyOptions<'_>,
) -> VerificationOutcome {
    let input_header = match request.header("signature-input") {
        Some(header) => header,
        None => {
            return verify_request(request, &[0u8; 32], options);
        }
    };

    let key_id = match fides_signature::parse_signature_input(input_header) {
        Ok(parsed) => parsed.params.key_id,
        Err(e) => {
            return VerificationOutcome {
                valid: false,
                key_id: None,
                error: Some(e.to_string()),
            }
        }
    };

    let public_key = match resolver.resolve_key(&key_id).await {
        Ok(key) => key,
        Err(e) => {
            return VerificationOutcome {
                valid: false,
                key_id: Some(key_id),
                error: Some(e.to_string()),
            }
        }
    };

    verify_request(request, &public_key, options)
}
