//! Canonical webhook message.
//!
//! Every inbound request is normalized into an [`Envelope`]: the full header
//! set plus the JSON-decoded body. Handlers only ever see this shape, no
//! matter which webhook sender produced the request.

use std::collections::BTreeMap;

use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Envelope key holding the request headers.
pub const HEADER: &str = "header";

/// Envelope key holding the decoded request payload.
pub const BODY: &str = "body";

/// Errors produced while normalizing a request.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("request does not have a body")]
    EmptyBody,

    #[error("unable to parse json body: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("json body must be an object, got {0}")]
    NotAnObject(&'static str),

    #[error("unable to encode envelope as json: {0}")]
    Encode(#[source] serde_json::Error),
}

/// The canonical per-request message handed to listener handlers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Header name → values, in the order they arrived.
    pub header: BTreeMap<String, Vec<String>>,
    /// Decoded JSON payload: an object, or `null` when the sender posted a
    /// literal `null`.
    pub body: Value,
}

impl Envelope {
    /// Build an envelope from request headers and the raw body bytes.
    pub fn from_request(headers: &HeaderMap, body: &[u8]) -> Result<Self, EnvelopeError> {
        Ok(Self {
            header: collect_headers(headers),
            body: parse_body(body)?,
        })
    }

    /// First value of a header. Lookup is case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.header_values(name).first().map(String::as_str)
    }

    /// All values of a header, empty when absent. Lookup is case-insensitive.
    pub fn header_values(&self, name: &str) -> &[String] {
        self.header
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Top-level body field. Always `None` for a `null` body.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }

    /// Encode the envelope as JSON bytes.
    pub fn to_json(&self) -> Result<Vec<u8>, EnvelopeError> {
        serde_json::to_vec(self).map_err(EnvelopeError::Encode)
    }
}

/// Collect every header value, grouping repeated names.
///
/// Values that are not valid UTF-8 are decoded lossily.
pub fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, Vec<String>> {
    headers
        .keys()
        .map(|name| {
            let values = headers
                .get_all(name)
                .iter()
                .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
                .collect();
            (name.as_str().to_string(), values)
        })
        .collect()
}

/// Decode a request body, accepting a JSON object or a literal `null`.
pub fn parse_body(bytes: &[u8]) -> Result<Value, EnvelopeError> {
    if bytes.is_empty() {
        return Err(EnvelopeError::EmptyBody);
    }

    match serde_json::from_slice(bytes).map_err(EnvelopeError::InvalidJson)? {
        body @ (Value::Object(_) | Value::Null) => Ok(body),
        Value::Bool(_) => Err(EnvelopeError::NotAnObject("boolean")),
        Value::Number(_) => Err(EnvelopeError::NotAnObject("number")),
        Value::String(_) => Err(EnvelopeError::NotAnObject("string")),
        Value::Array(_) => Err(EnvelopeError::NotAnObject("array")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use serde_json::json;

    #[test]
    fn body_matches_parsed_json() {
        let raw = br#"{"action":"opened","number":7,"pull_request":{"labels":["a","b"],"draft":false,"merged_at":null}}"#;
        let envelope = Envelope::from_request(&HeaderMap::new(), raw).unwrap();

        let expected: Value = serde_json::from_slice(raw).unwrap();
        assert_eq!(envelope.body, expected);
        assert_eq!(envelope.field("action"), Some(&json!("opened")));
    }

    #[test]
    fn multi_value_headers_are_preserved_in_order() {
        let mut headers = HeaderMap::new();
        headers.append("x-github-event", HeaderValue::from_static("push"));
        headers.append("accept", HeaderValue::from_static("text/plain"));
        headers.append("accept", HeaderValue::from_static("application/json"));

        let envelope = Envelope::from_request(&headers, b"{}").unwrap();

        assert_eq!(envelope.header.len(), 2);
        assert_eq!(envelope.header("x-github-event"), Some("push"));
        assert_eq!(envelope.header("X-GitHub-Event"), Some("push"));
        assert_eq!(
            envelope.header_values("accept"),
            &["text/plain".to_string(), "application/json".to_string()]
        );
        assert!(envelope.header_values("missing").is_empty());
    }

    #[test]
    fn empty_body_is_rejected() {
        assert!(matches!(parse_body(b""), Err(EnvelopeError::EmptyBody)));
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(matches!(
            parse_body(b"not-json"),
            Err(EnvelopeError::InvalidJson(_))
        ));
    }

    #[test]
    fn non_object_json_is_rejected() {
        assert!(matches!(
            parse_body(b"[1,2,3]"),
            Err(EnvelopeError::NotAnObject("array"))
        ));
        assert!(matches!(
            parse_body(b"\"text\""),
            Err(EnvelopeError::NotAnObject("string"))
        ));
    }

    #[test]
    fn null_body_is_kept_as_null() {
        let envelope = Envelope::from_request(&HeaderMap::new(), b"null").unwrap();

        assert_eq!(envelope.body, Value::Null);
        assert_eq!(envelope.field("action"), None);

        let encoded: Value = serde_json::from_slice(&envelope.to_json().unwrap()).unwrap();
        assert_eq!(encoded[BODY], Value::Null);
        assert!(encoded.as_object().unwrap().contains_key(BODY));
    }

    #[test]
    fn encodes_with_header_and_body_keys() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        let envelope = Envelope::from_request(&headers, br#"{"zeta":1,"alpha":2}"#).unwrap();

        let encoded: Value = serde_json::from_slice(&envelope.to_json().unwrap()).unwrap();
        assert_eq!(encoded.as_object().unwrap().len(), 2);
        assert_eq!(encoded[HEADER], json!({ "content-type": ["application/json"] }));
        assert_eq!(encoded[BODY], json!({ "zeta": 1, "alpha": 2 }));

        let keys: Vec<_> = envelope.body.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
    }
}
