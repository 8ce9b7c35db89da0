use regex::Regex;

use fides_crypto::{base64_decode, constant_time_eq_str, verify_signature, PUBLIC_KEY_LENGTH};

use crate::canonical::{build_signature_base, parse_signature_input};
use crate::nonce::NonceStore;
use crate::request::CanonicalRequest;
use crate::sign::{content_digest, unix_now};

/// Default tolerated clock drift in seconds, applied on the expiry side.
pub const DEFAULT_CLOCK_DRIFT: u64 = 30;

/// Options accepted by [`verify_request`].
#[derive(Default)]
pub struct VerifyOptions<'a> {
    /// Replay protection; strongly recommended for server-side verification.
    pub nonce_store: Option<&'a NonceStore>,
    /// Clock drift tolerance in seconds (`None` uses the default of 30).
    pub clock_drift_seconds: Option<u64>,
}

/// Result of verifying a signed request. Routine failures are values, not
/// errors, so callers branch without catching anything.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationOutcome {
    pub valid: bool,
    pub key_id: Option<String>,
    pub error: Option<String>,
}

impl VerificationOutcome {
    fn success(key_id: String) -> Self {
        Self {
            valid: true,
            key_id: Some(key_id),
            error: None,
        }
    }

    fn failure(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            key_id: None,
            error: Some(error.into()),
        }
    }

    fn failure_for(key_id: &str, error: impl Into<String>) -> Self {
        Self {
            valid: false,
            key_id: Some(key_id.to_string()),
            error: Some(error.into()),
        }
    }
}

/// Verify the HTTP message signature on a request against a public key.
///
/// Enforces the `ed25519` algorithm, expiry freshness with drift tolerance,
/// optional nonce replay protection, the signature over the re-canonicalized
/// base string, and body/digest binding when both are present.
pub fn verify_request(
    request: &impl CanonicalRequest,
    public_key: &[u8],
    options: &VerifyOptions<'_>,
) -> VerificationOutcome {
    if public_key.len() != PUBLIC_KEY_LENGTH {
        return VerificationOutcome::failure("invalid public key length");
    }

    let signature_header = match request.header("signature") {
        Some(header) => header,
        None => return VerificationOutcome::failure("missing signature"),
    };
    let input_header = match request.header("signature-input") {
        Some(header) => header,
        None => return VerificationOutcome::failure("missing signature"),
    };

    let parsed = match parse_signature_input(input_header) {
        Ok(parsed) => parsed,
        Err(e) => return VerificationOutcome::failure(e.to_string()),
    };
    let key_id = parsed.params.key_id.clone();

    // Downgrade defense: only ed25519 signatures are acceptable.
    if parsed.params.alg != "ed25519" {
        return VerificationOutcome::failure_for(
            &key_id,
            format!("unsupported signature algorithm: {}", parsed.params.alg),
        );
    }

    let drift = options.clock_drift_seconds.unwrap_or(DEFAULT_CLOCK_DRIFT);
    if parsed.params.expires + drift < unix_now() {
        return VerificationOutcome::failure_for(&key_id, "signature expired");
    }

    if let (Some(store), Some(nonce)) = (options.nonce_store, parsed.params.nonce.as_deref()) {
        if !store.check(nonce) {
            return VerificationOutcome::failure_for(&key_id, "replay detected");
        }
    }

    let pattern = format!(r"{}=:([A-Za-z0-9+/=]+):", regex::escape(&parsed.label));
    let signature_bytes = Regex::new(&pattern)
        .ok()
        .and_then(|re| {
            re.captures(signature_header)
                .map(|caps| caps[1].to_string())
        })
        .and_then(|b64| base64_decode(&b64).ok());

    let signature_bytes = match signature_bytes {
        Some(bytes) => bytes,
        None => return VerificationOutcome::failure_for(&key_id, "malformed signature header"),
    };

    let base = match build_signature_base(request, &parsed.params) {
        Ok(base) => base,
        Err(e) => return VerificationOutcome::failure_for(&key_id, e.to_string()),
    };

    match verify_signature(base.as_bytes(), &signature_bytes, public_key) {
        Ok(true) => {}
        Ok(false) => {
            return VerificationOutcome::failure_for(&key_id, "signature verification failed")
        }
        Err(e) => return VerificationOutcome::failure_for(&key_id, e.to_string()),
    }

    if let (Some(header), Some(body)) = (request.header("content-digest"), request.body()) {
        let expected = content_digest(body);
        if !constant_time_eq_str(header, &expected) {
            return VerificationOutcome::failure_for(&key_id, "Content-Digest mismatch");
        }
    }

    VerificationOutcome::success(key_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::{
        default_components, serialize_signature_input, SignatureParams,
    };
    use crate::request::RequestMessage;
    use crate::sign::{sign_request, SignOptions};
    use fides_crypto::{base64_encode, KeyPair};

    fn signed_request(keypair: &KeyPair) -> RequestMessage {
        let mut request = RequestMessage::new("POST", "https://api.example.com/v1/trust")
            .with_header("content-type", "application/json")
            .with_body(br#"{"x":1}"#.to_vec());
        sign_request(&mut request, keypair, SignOptions::new("did:fides:tester")).unwrap();
        request
    }

    #[test]
    fn round_trip_verifies() {
        let keypair = KeyPair::generate();
        let request = signed_request(&keypair);

        let outcome = verify_request(
            &request,
            &keypair.public_key_bytes(),
            &VerifyOptions::default(),
        );
        assert!(outcome.valid, "{:?}", outcome.error);
        assert_eq!(outcome.key_id.as_deref(), Some("did:fides:tester"));
    }

    #[test]
    fn mutated_component_fails() {
        let keypair = KeyPair::generate();
        let mut request = signed_request(&keypair);
        request.set_header("content-type", "text/plain");

        let outcome = verify_request(
            &request,
            &keypair.public_key_bytes(),
            &VerifyOptions::default(),
        );
        assert!(!outcome.valid);
        assert_eq!(outcome.error.as_deref(), Some("signature verification failed"));
    }

    #[test]
    fn tampered_body_is_a_digest_mismatch() {
        let keypair = KeyPair::generate();
        let mut request = signed_request(&keypair);
        request.set_body(br#"{"x":2}"#.to_vec());

        let outcome = verify_request(
            &request,
            &keypair.public_key_bytes(),
            &VerifyOptions::default(),
        );
        assert!(!outcome.valid);
        assert_eq!(outcome.error.as_deref(), Some("Content-Digest mismatch"));
    }

    #[test]
    fn wrong_key_fails() {
        let keypair = KeyPair::generate();
        let other = KeyPair::generate();
        let request = signed_request(&keypair);

        let outcome = verify_request(
            &request,
            &other.public_key_bytes(),
            &VerifyOptions::default(),
        );
        assert!(!outcome.valid);
    }

    #[test]
    fn missing_signature_headers() {
        let request = RequestMessage::new("GET", "https://example.com/")
            .with_header("content-type", "application/json");

        let outcome = verify_request(&request, &[0u8; 32], &VerifyOptions::default());
        assert!(!outcome.valid);
        assert_eq!(outcome.error.as_deref(), Some("missing signature"));
    }

    #[test]
    fn invalid_public_key_length() {
        let keypair = KeyPair::generate();
        let request = signed_request(&keypair);

        let outcome = verify_request(&request, &[0u8; 31], &VerifyOptions::default());
        assert!(!outcome.valid);
        assert_eq!(outcome.error.as_deref(), Some("invalid public key length"));
    }

    #[test]
    fn replay_is_detected() {
        let keypair = KeyPair::generate();
        let request = signed_request(&keypair);

        let runtime = tokio::runtime::Runtime::new().unwrap();
        let _guard = runtime.enter();
        let store = NonceStore::new();

        let options = VerifyOptions {
            nonce_store: Some(&store),
            clock_drift_seconds: None,
        };

        let first = verify_request(&request, &keypair.public_key_bytes(), &options);
        assert!(first.valid, "{:?}", first.error);

        let second = verify_request(&request, &keypair.public_key_bytes(), &options);
        assert!(!second.valid);
        assert_eq!(second.error.as_deref(), Some("replay detected"));
    }

    fn hand_signed(keypair: &KeyPair, params: &SignatureParams) -> RequestMessage {
        let mut request = RequestMessage::new("GET", "https://example.com/resource")
            .with_header("content-type", "application/json");

        let base = build_signature_base(&request, params).unwrap();
        let signature = keypair.sign(base.as_bytes());
        request.set_header("signature-input", serialize_signature_input("sig1", params));
        request.set_header("signature", format!("sig1=:{}:", base64_encode(&signature)));
        request
    }

    #[test]
    fn expired_signature_fails() {
        let keypair = KeyPair::generate();
        let params = SignatureParams {
            components: default_components(),
            created: 1_000,
            expires: 1_300,
            key_id: "did:fides:tester".to_string(),
            alg: "ed25519".to_string(),
            nonce: None,
        };
        let request = hand_signed(&keypair, &params);

        let outcome = verify_request(
            &request,
            &keypair.public_key_bytes(),
            &VerifyOptions::default(),
        );
        assert!(!outcome.valid);
        assert_eq!(outcome.error.as_deref(), Some("signature expired"));
    }

    #[test]
    fn expiry_on_the_boundary_is_accepted() {
        let keypair = KeyPair::generate();
        let now = unix_now();
        let params = SignatureParams {
            components: default_components(),
            created: now - 300,
            expires: now,
            key_id: "did:fides:tester".to_string(),
            alg: "ed25519".to_string(),
            nonce: None,
        };
        let request = hand_signed(&keypair, &params);

        let options = VerifyOptions {
            nonce_store: None,
            clock_drift_seconds: Some(0),
        };
        let outcome = verify_request(&request, &keypair.public_key_bytes(), &options);
        assert!(outcome.valid, "{:?}", outcome.error);
    }

    #[test]
    fn algorithm_downgrade_is_rejected() {
        let keypair = KeyPair::generate();
        let params = SignatureParams {
            components: default_components(),
            created: unix_now(),
            expires: unix_now() + 300,
            key_id: "did:fides:tester".to_string(),
            alg: "rsa-pss-sha512".to_string(),
            nonce: None,
        };
        let request = hand_signed(&keypair, &params);

        let outcome = verify_request(
            &request,
            &keypair.public_key_bytes(),
            &VerifyOptions::default(),
        );
        assert!(!outcome.valid);
        assert_eq!(
            outcome.error.as_deref(),
            Some("unsupported signature algorithm: rsa-pss-sha512")
        );
    }
}
