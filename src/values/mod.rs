//! # Value Normalization
//!
//! Deterministic coercion of arbitrary values into strings and byte buffers.
//! The search-form produced by [`to_search_string`] is only used by the filter
//! helper functions; assertions always compare [`as_string`] / [`as_buffer`]
//! output.

use std::borrow::Cow;

use bytes::Bytes;
use serde_json::{Number, Value};

/// A raw value that has not been serialized yet, e.g. a request body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Bytes(Bytes),
    Text(String),
    Json(Value),
}

impl Payload {
    pub fn as_string(&self) -> String {
        match self {
            Payload::Bytes(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            Payload::Text(text) => text.clone(),
            Payload::Json(value) => as_string(value),
        }
    }

    /// Bytes of the payload; text and JSON values are UTF-8 encoded.
    pub fn as_buffer(&self) -> Cow<'_, [u8]> {
        match self {
            Payload::Bytes(bytes) => Cow::Borrowed(bytes.as_ref()),
            Payload::Text(text) => Cow::Borrowed(text.as_bytes()),
            Payload::Json(value) => Cow::Owned(as_string(value).into_bytes()),
        }
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Payload::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Bytes(Bytes::from(bytes))
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Json(value)
    }
}

/// Textual form of a value: `null` is empty, strings are kept, objects become
/// JSON and everything else uses its default textual form.
pub fn to_string_safe(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number_text(number),
        Value::Array(items) => items
            .iter()
            .map(to_string_safe)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => value.to_string(),
    }
}

/// [`to_string_safe`] converted into the search-form.
pub fn to_search_string(value: &Value) -> String {
    search_form(&to_string_safe(value))
}

/// Lower-cases, flattens German umlauts, normalizes tabs and line breaks and
/// trims the result.
pub fn search_form(text: &str) -> String {
    text.to_lowercase()
        .replace('ä', "ae")
        .replace('ö', "oe")
        .replace('ü', "ue")
        .replace('ß', "ss")
        .replace('\t', "  ")
        .replace('\n', " ")
        .replace('\r', "")
        .trim()
        .to_string()
}

/// Like [`to_string_safe`], but arrays become a JSON array of their
/// stringified elements.
pub fn as_string(value: &Value) -> String {
    match value {
        Value::Array(items) => {
            let items = items
                .iter()
                .map(|item| Value::String(as_string(item)))
                .collect();
            Value::Array(items).to_string()
        }
        other => to_string_safe(other),
    }
}

/// Resolves a deferred value and stringifies it.
pub fn as_string_with<F, V>(producer: F) -> String
where
    F: FnOnce() -> V,
    V: Into<Payload>,
{
    producer().into().as_string()
}

pub fn as_buffer(payload: &Payload) -> Cow<'_, [u8]> {
    payload.as_buffer()
}

// Integral floats print without a fraction, like `1` instead of `1.0`.
fn number_text(number: &Number) -> String {
    if let Some(float) = number.as_f64().filter(|_| number.is_f64()) {
        if float.is_finite() && float.fract() == 0.0 && float.abs() < 1e21 {
            return format!("{float:.0}");
        }
        return float.to_string();
    }
    number.to_string()
}
