use std::collections::HashMap;

use super::method::HttpMethod;
use crate::context::TestEventContext;
use crate::values::Payload;

#[derive(Debug, Clone)]
pub struct RequestInput {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Payload>,
}

impl RequestInput {
    /// The request described by a test event, sent to `base_url`.
    pub fn for_event(base_url: &str, context: &TestEventContext) -> Self {
        let url = format!(
            "{}{}?{}",
            base_url.trim_end_matches('/'),
            context.escaped_route,
            context.escaped_query
        );

        Self {
            method: context.http_method,
            url,
            headers: context.headers.clone(),
            body: context.body.clone(),
        }
    }
}
