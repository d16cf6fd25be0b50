use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::HashMap;

use crate::error::TestError;
use crate::values::Payload;

use super::encoding::BodyEncoding;
use super::request::RequestInput;
use super::response::HttpResponse;

pub fn build_headers(input: &HashMap<String, String>) -> Result<HeaderMap, TestError> {
    let mut headers = HeaderMap::new();

    for (key, value) in input {
        if key.is_empty() {
            continue;
        }

        let header_name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|err| TestError::Request(format!("Invalid header name `{key}`: {err}")))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|err| TestError::Request(format!("Invalid header value for `{key}`: {err}")))?;
        headers.insert(header_name, header_value);
    }

    Ok(headers)
}

/// Builds the outgoing request. Nothing is sent yet, so the caller can start
/// its timer right before [`send_request`].
pub fn prepare_request(
    client: &reqwest::Client,
    request: &RequestInput,
) -> Result<reqwest::RequestBuilder, TestError> {
    let method: reqwest::Method = request.method.into();
    let url = reqwest::Url::parse(&request.url)
        .map_err(|e| TestError::Request(format!("Invalid URL `{}`: {e}", request.url)))?;

    let mut req_builder = client
        .request(method, url)
        .headers(build_headers(&request.headers)?);

    match &request.body {
        None => {}
        Some(Payload::Bytes(bytes)) => req_builder = req_builder.body(bytes.clone()),
        Some(Payload::Text(text)) => req_builder = req_builder.body(text.clone()),
        Some(Payload::Json(value)) => req_builder = req_builder.json(value),
    }

    Ok(req_builder)
}

pub async fn send_request(
    req_builder: reqwest::RequestBuilder,
    encoding: BodyEncoding,
) -> Result<HttpResponse, TestError> {
    let response = req_builder.send().await?;

    let status = response.status().as_u16();
    let headers = response.headers().clone();
    let bytes = response.bytes().await?;

    Ok(HttpResponse {
        status,
        headers,
        body: encoding.decode(bytes),
    })
}
