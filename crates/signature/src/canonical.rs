use url::Url;

use crate::error::{SignatureError, SignatureResult};
use crate::request::CanonicalRequest;

/// Signature parameters carried in the `@signature-params` line and the
/// `Signature-Input` header.
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureParams {
    pub components: Vec<String>,
    pub created: u64,
    pub expires: u64,
    pub key_id: String,
    pub alg: String,
    pub nonce: Option<String>,
}

/// A parsed `Signature-Input` header: the label plus its parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSignatureInput {
    pub label: String,
    pub params: SignatureParams,
}

/// Default component set for signed requests.
pub fn default_components() -> Vec<String> {
    vec![
        "@method".to_string(),
        "@target-uri".to_string(),
        "@authority".to_string(),
        "content-type".to_string(),
    ]
}

fn derived_component_value(name: &str, req: &impl CanonicalRequest) -> SignatureResult<String> {
    match name {
        "@method" => Ok(req.method().to_ascii_uppercase()),
        "@target-uri" => Ok(req.target_uri().to_string()),
        "@authority" => {
            let url = Url::parse(req.target_uri())
                .map_err(|e| SignatureError::InvalidUri(format!("{}: {}", req.target_uri(), e)))?;
            let host = url
                .host_str()
                .ok_or_else(|| SignatureError::InvalidUri(format!("no host in {}", req.target_uri())))?;
            // Url::port() is None for the scheme's default port
            match url.port() {
                Some(port) => Ok(format!("{}:{}", host, port)),
                None => Ok(host.to_string()),
            }
        }
        "@path" => {
            let url = Url::parse(req.target_uri())
                .map_err(|e| SignatureError::InvalidUri(format!("{}: {}", req.target_uri(), e)))?;
            match url.query() {
                Some(query) => Ok(format!("{}?{}", url.path(), query)),
                None => Ok(url.path().to_string()),
            }
        }
        other => Err(SignatureError::Canonicalization(format!(
            "unknown derived component: {}",
            other
        ))),
    }
}

/// Serialize the parameter list exactly as it appears both in the
/// `@signature-params` base line and after the label in `Signature-Input`.
pub fn serialize_params(params: &SignatureParams) -> String {
    let components = params
        .components
        .iter()
        .map(|c| format!("\"{}\"", c))
        .collect::<Vec<_>>()
        .join(" ");

    let mut out = format!(
        "({});created={};expires={}",
        components, params.created, params.expires
    );
    if let Some(nonce) = &params.nonce {
        out.push_str(&format!(";nonce=\"{}\"", nonce));
    }
    out.push_str(&format!(";keyid=\"{}\";alg=\"{}\"", params.key_id, params.alg));
    out
}

/// Build the RFC 9421 signature base string for a request.
///
/// One line per component, then the `@signature-params` line. Referencing a
/// header the request does not carry is a hard error.
pub fn build_signature_base(
    req: &impl CanonicalRequest,
    params: &SignatureParams,
) -> SignatureResult<String> {
    let mut lines = Vec::with_capacity(params.components.len() + 1);

    for name in &params.components {
        let value = if name.starts_with('@') {
            derived_component_value(name, req)?
        } else {
            req.header(name)
                .ok_or_else(|| SignatureError::MissingHeader(name.clone()))?
                .to_string()
        };
        lines.push(format!("\"{}\": {}", name, value));
    }

    lines.push(format!(
        "\"@signature-params\": {}",
        serialize_params(params)
    ));

    Ok(lines.join("\n"))
}

/// Serialize a full `Signature-Input` header value.
pub fn serialize_signature_input(label: &str, params: &SignatureParams) -> String {
    format!("{}={}", label, serialize_params(params))
}

/// Parse a `Signature-Input` header of the form
/// `label=(c1 c2 ...);k1=v1;...` into its label and parameters.
pub fn parse_signature_input(header: &str) -> SignatureResult<ParsedSignatureInput> {
    let malformed = |reason: &str| SignatureError::MalformedSignatureInput(reason.to_string());

    let eq = header.find('=').ok_or_else(|| malformed("missing label"))?;
    let label = header[..eq].trim().to_string();
    if label.is_empty() {
        return Err(malformed("empty label"));
    }

    let rest = &header[eq + 1..];
    if !rest.starts_with('(') {
        return Err(malformed("missing component list"));
    }
    let close = rest
        .find(')')
        .ok_or_else(|| malformed("unterminated component list"))?;

    let components = rest[1..close]
        .split_whitespace()
        .map(|c| c.trim_matches('"').to_string())
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>();

    let mut created = None;
    let mut expires = None;
    let mut key_id = None;
    let mut alg = None;
    let mut nonce = None;

    for pair in rest[close + 1..].split(';').filter(|p| !p.is_empty()) {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| malformed(&format!("invalid parameter: {}", pair)))?;

        match key.trim() {
            "created" => {
                created = Some(value.parse::<u64>().map_err(|_| {
                    malformed(&format!("created is not an integer: {}", value))
                })?)
            }
            "expires" => {
                expires = Some(value.parse::<u64>().map_err(|_| {
                    malformed(&format!("expires is not an integer: {}", value))
                })?)
            }
            "keyid" => key_id = Some(value.trim_matches('"').to_string()),
            "alg" => alg = Some(value.trim_matches('"').to_string()),
            "nonce" => nonce = Some(value.trim_matches('"').to_string()),
            // Unknown parameters are ignored for forward compatibility
            _ => {}
        }
    }

    Ok(ParsedSignatureInput {
        label,
        params: SignatureParams {
            components,
            created: created.ok_or_else(|| malformed("missing created"))?,
            expires: expires.ok_or_else(|| malformed("missing expires"))?,
            key_id: key_id.ok_or_else(|| malformed("missing keyid"))?,
            alg: alg.ok_or_else(|| malformed("missing alg"))?,
            nonce,
        },
    })
}
