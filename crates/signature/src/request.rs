use std::collections::HashMap;

/// Capability exposed by anything the canonicalizer can sign or verify:
/// a method, a target URI, case-insensitive headers, and an optional body.
pub trait CanonicalRequest {
    fn method(&self) -> &str;
    fn target_uri(&self) -> &str;
    fn header(&self, name: &str) -> Option<&str>;
    fn body(&self) -> Option<&[u8]>;
}

/// A concrete HTTP message, used by clients building outbound requests and
/// by services adapting inbound ones for verification.
#[derive(Debug, Clone)]
pub struct RequestMessage {
    method: String,
    url: String,
    headers: HashMap<String, String>,
    body: Option<Vec<u8>>,
}

impl RequestMessage {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: HashMap::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set a header; names are stored lowercase so lookups are
    /// case-insensitive.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
    }

    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) {
        self.body = Some(body.into());
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }
}

impl CanonicalRequest for RequestMessage {
    fn method(&self) -> &str {
        &self.method
    }

    fn target_uri(&self) -> &str {
        &self.url
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(|v| v.as_str())
    }

    fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_is_case_insensitive() {
        let request = RequestMessage::new("POST", "https://example.com/api")
            .with_header("Content-Type", "application/json");

        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.header("CONTENT-TYPE"), Some("application/json"));
        assert_eq!(request.header("x-missing"), None);
    }
}
