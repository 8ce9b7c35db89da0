use std::time::{SystemTime, UNIX_EPOCH};

use uuid::Uuid;

use fides_crypto::{base64_encode, sha256, KeyPair};

use crate::canonical::{
    build_signature_base, default_components, serialize_signature_input, SignatureParams,
};
use crate::error::SignatureResult;
use crate::request::{CanonicalRequest, RequestMessage};

/// Default signature lifetime in seconds.
pub const DEFAULT_SIGNATURE_TTL: u64 = 300;

/// Default signature label.
pub const DEFAULT_LABEL: &str = "sig1";

/// Options accepted by [`sign_request`].
#[derive(Debug, Clone)]
pub struct SignOptions {
    /// Identifier placed in the `keyid` parameter.
    pub key_id: String,
    /// Ordered component list; defaults to
    /// `@method, @target-uri, @authority, content-type`.
    pub components: Vec<String>,
    /// Signature lifetime in seconds.
    pub expiry_seconds: u64,
    /// Signature label.
    pub label: String,
}

impl SignOptions {
    pub fn new(key_id: impl Into<String>) -> Self {
        Self {
            key_id: key_id.into(),
            components: default_components(),
            expiry_seconds: DEFAULT_SIGNATURE_TTL,
            label: DEFAULT_LABEL.to_string(),
        }
    }
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// `Content-Digest` header value for a request body.
pub fn content_digest(body: &[u8]) -> String {
    format!("sha-256=:{}:", base64_encode(&sha256(body)))
}

/// Sign a request in place, attaching `Signature-Input`, `Signature`, and
/// (for requests with a body) `Content-Digest` headers.
pub fn sign_request(
    request: &mut RequestMessage,
    keypair: &KeyPair,
    options: SignOptions,
) -> SignatureResult<()> {
    let created = unix_now();
    let expires = created + options.expiry_seconds;
    let nonce = Uuid::new_v4().to_string();

    let mut components = options.components;

    let digest = request.body().map(content_digest);
    if let Some(digest) = digest {
        request.set_header("content-digest", digest);
        if !components.iter().any(|c| c == "content-digest") {
            components.push("content-digest".to_string());
        }
    }

    let params = SignatureParams {
        components,
        created,
        expires,
        key_id: options.key_id,
        alg: "ed25519".to_string(),
        nonce: Some(nonce),
    };

    let base = build_signature_base(request, &params)?;
    let signature = keypair.sign(base.as_bytes());

    request.set_header(
        "signature-input",
        serialize_signature_input(&options.label, &params),
    );
    request.set_header(
        "signature",
        format!("{}=:{}:", options.label, base64_encode(&signature)),
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signing_attaches_headers() {
        let keypair = KeyPair::generate();
        let mut request = RequestMessage::new("POST", "https://example.com/v1/trust")
            .with_header("content-type", "application/json")
            .with_body(br#"{"x":1}"#.to_vec());

        sign_request(&mut request, &keypair, SignOptions::new("did:fides:abc")).unwrap();

        let input = request.header("signature-input").unwrap();
        assert!(input.starts_with("sig1=(\"@method\""));
        assert!(input.contains("\"content-digest\""));
        assert!(input.contains("keyid=\"did:fides:abc\""));
        assert!(input.contains("alg=\"ed25519\""));

        assert!(request.header("signature").unwrap().starts_with("sig1=:"));
        assert!(request.header("content-digest").unwrap().starts_with("sha-256=:"));
    }

    #[test]
    fn bodyless_request_has_no_digest() {
        let keypair = KeyPair::generate();
        let mut request = RequestMessage::new("GET", "https://example.com/v1/agents")
            .with_header("content-type", "application/json");

        sign_request(&mut request, &keypair, SignOptions::new("did:fides:abc")).unwrap();

        assert!(request.header("content-digest").is_none());
        assert!(!request.header("signature-input").unwrap().contains("content-digest"));
    }

    #[test]
    fn custom_label_and_expiry() {
        let keypair = KeyPair::generate();
        let mut request = RequestMessage::new("GET", "https://example.com/")
            .with_header("content-type", "application/json");

        let mut options = SignOptions::new("did:fides:abc");
        options.label = "auth".to_string();
        options.expiry_seconds = 60;

        sign_request(&mut request, &keypair, options).unwrap();

        let input = request.header("signature-input").unwrap();
        assert!(input.starts_with("auth=("));

        let parsed = crate::canonical::parse_signature_input(input).unwrap();
        assert_eq!(parsed.params.expires - parsed.params.created, 60);
    }
}
