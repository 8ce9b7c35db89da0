use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{debug, warn};

use fides_identity::parse_did;
use fides_signature::{verify_request, RequestMessage, VerifyOptions};

use crate::state::AppState;

/// The verified signer of a request, injected into request extensions.
#[derive(Debug, Clone)]
pub struct VerifiedCaller(pub Option<String>);

/// Verify the HTTP message signature on inbound requests.
///
/// Signatures are optional on the wire contract; when the headers are
/// present they must verify. The `keyid` names a self-certifying
/// identifier, so the public key comes straight out of it, and the shared
/// nonce store rejects replays.
pub async fn verify_signatures(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let (parts, body) = request.into_parts();

    let body_bytes = match to_bytes(body, 1024 * 1024).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "request body too large" })),
            )
                .into_response()
        }
    };

    let has_signature = parts.headers.contains_key("signature")
        || parts.headers.contains_key("signature-input");

    let caller = if has_signature {
        let message = message_from_parts(&parts, &body_bytes);

        let key_id = match fides_signature::parse_signature_input(
            message.headers().get("signature-input").map(String::as_str).unwrap_or(""),
        ) {
            Ok(parsed) => parsed.params.key_id,
            Err(e) => {
                return (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "error": e.to_string() })),
                )
                    .into_response()
            }
        };

        let public_key = match parse_did(&key_id) {
            Ok(key) => key,
            Err(e) => {
                return (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "error": format!("invalid keyid: {}", e) })),
                )
                    .into_response()
            }
        };

        let options = VerifyOptions {
            nonce_store: Some(&state.nonce_store),
            clock_drift_seconds: None,
        };
        let outcome = verify_request(&message, &public_key, &options);

        if !outcome.valid {
            let reason = outcome.error.unwrap_or_else(|| "invalid signature".to_string());
            warn!(%key_id, %reason, "Rejected signed request");
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": reason })),
            )
                .into_response();
        }

        debug!(%key_id, "Verified request signature");
        outcome.key_id
    } else {
        None
    };

    let mut request = Request::from_parts(parts, Body::from(body_bytes));
    request.extensions_mut().insert(VerifiedCaller(caller));

    next.run(request).await
}

/// Rebuild the signed message from the inbound request parts.
///
/// The target URI is reconstructed from the Host header and the
/// forwarded-proto hint, since the server only sees the origin form.
fn message_from_parts(parts: &axum::http::request::Parts, body: &[u8]) -> RequestMessage {
    let proto = parts
        .headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    let host = parts
        .headers
        .get("host")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");

    let target = format!("{}://{}{}", proto, host, parts.uri);

    let mut message = RequestMessage::new(parts.method.as_str(), target);
    for (name, value) in &parts.headers {
        if let Ok(value) = value.to_str() {
            message.set_header(name.as_str(), value);
        }
    }
    if !body.is_empty() {
        message.set_body(body.to_vec());
    }

    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request as HttpRequest;
    use fides_signature::CanonicalRequest;

    #[test]
    fn message_reconstruction_uses_host_and_proto() {
        let request = HttpRequest::builder()
            .method("POST")
            .uri("/v1/trust?x=1")
            .header("host", "trust.example.com")
            .header("x-forwarded-proto", "https")
            .header("content-type", "application/json")
            .body(())
            .unwrap();
        let (parts, _) = request.into_parts();

        let message = message_from_parts(&parts, b"{}");

        assert_eq!(message.method(), "POST");
        assert_eq!(
            message.target_uri(),
            "https://trust.example.com/v1/trust?x=1"
        );
        assert_eq!(message.header("content-type"), Some("application/json"));
        assert_eq!(message.body(), Some(b"{}".as_ref()));
    }
}
