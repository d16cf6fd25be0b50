use std::collections::BTreeMap;

use bytes::Bytes;
use regex::Regex;
use serde_json::Value;

use super::validator::BodyValidator;

/// Expected value of a response header.
#[derive(Debug, Clone)]
pub enum ExpectedHeader {
    Exact(String),
    Pattern(Regex),
}

impl From<&str> for ExpectedHeader {
    fn from(value: &str) -> Self {
        ExpectedHeader::Exact(value.to_string())
    }
}

impl From<String> for ExpectedHeader {
    fn from(value: String) -> Self {
        ExpectedHeader::Exact(value)
    }
}

impl From<Regex> for ExpectedHeader {
    fn from(pattern: Regex) -> Self {
        ExpectedHeader::Pattern(pattern)
    }
}

/// Expected response body.
///
/// The variants are checked in declaration order when a loosely typed value
/// is classified: a pattern is never treated as text and raw bytes are never
/// treated as a structured value.
#[derive(Debug, Clone)]
pub enum ExpectedBody {
    /// The stringified body must match.
    Pattern(Regex),
    /// The stringified body must be equal.
    Text(String),
    /// Byte-exact comparison.
    Bytes(Bytes),
    /// Custom check of the raw body.
    Validator(BodyValidator),
    /// Structural equality with the body parsed as JSON.
    Json(Value),
}

impl ExpectedBody {
    /// Classifies an untyped JSON expectation: `null` means the body is not
    /// checked and strings compare as text.
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::String(text) => Some(ExpectedBody::Text(text)),
            other => Some(ExpectedBody::Json(other)),
        }
    }
}

impl From<Regex> for ExpectedBody {
    fn from(pattern: Regex) -> Self {
        ExpectedBody::Pattern(pattern)
    }
}

impl From<&str> for ExpectedBody {
    fn from(text: &str) -> Self {
        ExpectedBody::Text(text.to_string())
    }
}

impl From<String> for ExpectedBody {
    fn from(text: String) -> Self {
        ExpectedBody::Text(text)
    }
}

impl From<Bytes> for ExpectedBody {
    fn from(bytes: Bytes) -> Self {
        ExpectedBody::Bytes(bytes)
    }
}

impl From<Vec<u8>> for ExpectedBody {
    fn from(bytes: Vec<u8>) -> Self {
        ExpectedBody::Bytes(Bytes::from(bytes))
    }
}

impl From<BodyValidator> for ExpectedBody {
    fn from(validator: BodyValidator) -> Self {
        ExpectedBody::Validator(validator)
    }
}

impl From<Value> for ExpectedBody {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => ExpectedBody::Text(text),
            other => ExpectedBody::Json(other),
        }
    }
}

/// Declared outcome of an endpoint test.
#[derive(Debug, Clone)]
pub struct Expectations {
    pub status: u16,
    pub headers: BTreeMap<String, ExpectedHeader>,
    pub body: Option<ExpectedBody>,
}

impl Default for Expectations {
    fn default() -> Self {
        Self::new(200)
    }
}

impl Expectations {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<ExpectedHeader>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<ExpectedBody>) -> Self {
        self.body = Some(body.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_json_classifies_values() {
        assert!(ExpectedBody::from_json(Value::Null).is_none());
        assert!(matches!(
            ExpectedBody::from_json(json!("ok")),
            Some(ExpectedBody::Text(text)) if text == "ok"
        ));
        assert!(matches!(
            ExpectedBody::from_json(json!({"a": 1})),
            Some(ExpectedBody::Json(_))
        ));
        assert!(matches!(
            ExpectedBody::from_json(json!(5)),
            Some(ExpectedBody::Json(_))
        ));
    }

    #[test]
    fn builder_collects_headers() {
        let expectations = Expectations::new(201)
            .with_header("content-type", "application/json")
            .with_header("x-request-id", Regex::new("^[0-9a-f-]+$").unwrap())
            .with_body(json!({"id": 1}));

        assert_eq!(expectations.status, 201);
        assert_eq!(expectations.headers.len(), 2);
        assert!(matches!(
            expectations.headers.get("x-request-id"),
            Some(ExpectedHeader::Pattern(_))
        ));
        assert!(matches!(expectations.body, Some(ExpectedBody::Json(_))));
    }
}
