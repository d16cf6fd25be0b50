//! # Testing & Assertions
//!
//! Compares an actual HTTP response with the expectations declared for an
//! endpoint. Checks run in a fixed order (status, headers, body) and the
//! first failing check ends the assertion.

mod expectation;
mod validator;

pub use expectation::{ExpectedBody, ExpectedHeader, Expectations};
pub use validator::{BodyValidationContext, BodyValidator, Validation};

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, SET_COOKIE};
use serde_json::Value;

use crate::error::AssertionError;
use crate::http::response::HttpResponse;

/// Asserts `response` against `expectations`.
pub async fn assert_response(
    response: &HttpResponse,
    expectations: &Expectations,
) -> Result<(), AssertionError> {
    assert_status(response.status, expectations.status)?;

    for (name, expected) in &expectations.headers {
        assert_header(&response.headers, name, expected)?;
    }

    if let Some(expected) = &expectations.body {
        assert_body(&response.body, expected).await?;
    }

    Ok(())
}

pub fn assert_status(actual: u16, expected: u16) -> Result<(), AssertionError> {
    if actual != expected {
        return Err(AssertionError::Status { expected, actual });
    }
    Ok(())
}

pub fn assert_header(
    headers: &HeaderMap,
    name: &str,
    expected: &ExpectedHeader,
) -> Result<(), AssertionError> {
    let actual = header_text(headers, name).map_err(|kind| AssertionError::HeaderType {
        name: name.to_string(),
        kind,
    })?;

    match expected {
        ExpectedHeader::Exact(expected) => {
            if &actual != expected {
                return Err(AssertionError::HeaderValue {
                    name: name.to_string(),
                    expected: expected.clone(),
                    actual,
                });
            }
        }
        ExpectedHeader::Pattern(pattern) => {
            if !pattern.is_match(&actual) {
                return Err(AssertionError::HeaderPattern {
                    name: name.to_string(),
                    actual,
                    pattern: pattern.as_str().to_string(),
                });
            }
        }
    }
    Ok(())
}

pub async fn assert_body(actual: &Bytes, expected: &ExpectedBody) -> Result<(), AssertionError> {
    match expected {
        ExpectedBody::Pattern(pattern) => {
            let body = body_text(actual);
            if !pattern.is_match(&body) {
                return Err(AssertionError::BodyPattern {
                    body,
                    pattern: pattern.as_str().to_string(),
                });
            }
        }
        ExpectedBody::Text(expected) => {
            let body = body_text(actual);
            if &body != expected {
                return Err(AssertionError::BodyText {
                    expected: expected.clone(),
                    actual: body,
                });
            }
        }
        ExpectedBody::Bytes(expected) => {
            if expected != actual {
                return Err(AssertionError::BodyBytes {
                    expected: hex::encode(expected),
                    actual: hex::encode(actual),
                });
            }
        }
        ExpectedBody::Validator(validator) => match validator.validate(actual.clone()).await {
            Validation::Accepted => {}
            Validation::Rejected => {
                return Err(AssertionError::BodyRejected {
                    body: body_text(actual),
                });
            }
            Validation::RejectedWith(detail) => {
                return Err(AssertionError::BodyRejectedWith {
                    body: body_text(actual),
                    detail,
                });
            }
        },
        ExpectedBody::Json(Value::Null) => {}
        ExpectedBody::Json(expected @ (Value::Object(_) | Value::Array(_))) => {
            let parsed: Value =
                serde_json::from_slice(actual).map_err(AssertionError::InvalidJson)?;
            if !json_equal(&parsed, expected) {
                return Err(AssertionError::BodyObject {
                    expected: expected.to_string(),
                    actual: parsed.to_string(),
                });
            }
        }
        ExpectedBody::Json(_) => return Err(AssertionError::UnsupportedExpectation),
    }
    Ok(())
}

fn body_text(body: &Bytes) -> String {
    String::from_utf8_lossy(body).into_owned()
}

/// Single textual value of a header, or the kind of value found instead.
fn header_text(headers: &HeaderMap, name: &str) -> Result<String, &'static str> {
    let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| "undefined")?;

    let values: Vec<_> = headers.get_all(&name).iter().collect();
    if values.is_empty() {
        return Err("undefined");
    }
    // always a list, even with a single cookie
    if name == SET_COOKIE {
        return Err("object");
    }

    let texts = values
        .into_iter()
        .map(|value| value.to_str().map_err(|_| "binary"))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(texts.join(", "))
}

/// Deep structural equality; numbers compare by value.
fn json_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => {
            if a.is_f64() || b.is_f64() {
                a.as_f64() == b.as_f64()
            } else {
                a == b
            }
        }
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| json_equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a
                    .iter()
                    .all(|(key, x)| b.get(key).is_some_and(|y| json_equal(x, y)))
        }
        _ => left == right,
    }
}
