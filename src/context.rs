//! The description of one endpoint test, as emitted by the host with its
//! `test` event.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::Value;

use crate::BoxFuture;
use crate::http::method::HttpMethod;
use crate::testing::Expectations;
use crate::values::Payload;

/// A logical run of test events sharing one id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TestSession {
    pub id: String,
}

impl TestSession {
    /// A session with a fresh random id.
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl Default for TestSession {
    fn default() -> Self {
        Self::new()
    }
}

type CountFn = dyn Fn() -> BoxFuture<'static, ()> + Send + Sync;

/// Lets the host tally a failed test. Invoked once per failure.
#[derive(Clone)]
pub struct FailureCounter(Arc<CountFn>);

impl FailureCounter {
    pub fn noop() -> Self {
        Self::from_fn(|| {})
    }

    pub fn from_fn<F>(count: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self(Arc::new(move || {
            count();
            Box::pin(async {})
        }))
    }

    pub fn from_async<F, Fut>(count: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self(Arc::new(move || Box::pin(count())))
    }

    /// A counter backed by an atomic, returned alongside it.
    pub fn tally() -> (Self, Arc<AtomicUsize>) {
        let failures = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&failures);
        let this = Self::from_fn(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (this, failures)
    }

    pub async fn count(&self) {
        (self.0)().await
    }
}

impl Default for FailureCounter {
    fn default() -> Self {
        Self::noop()
    }
}

impl fmt::Debug for FailureCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FailureCounter")
    }
}

/// Everything the host knows about one endpoint test.
#[derive(Debug, Clone)]
pub struct TestEventContext {
    pub description: String,
    pub route: String,
    pub escaped_route: String,
    pub http_method: HttpMethod,
    pub query: BTreeMap<String, String>,
    pub escaped_query: String,
    pub group: Option<String>,
    pub headers: HashMap<String, String>,
    pub body: Option<Payload>,
    pub expectations: Expectations,
    pub session: TestSession,
    pub index: usize,
    pub total_count: usize,
    pub count_failure: FailureCounter,
    /// Opaque handler context, only visible to filters.
    pub context: Value,
    pub file: String,
    pub method_name: String,
    pub parameters: BTreeMap<String, String>,
}

impl TestEventContext {
    pub fn builder(method: HttpMethod, route: impl Into<String>) -> TestEventContextBuilder {
        TestEventContextBuilder::new(method, route)
    }

    /// Whether this is the last event of its session.
    pub fn is_last(&self) -> bool {
        self.total_count.checked_sub(1) == Some(self.index)
    }
}

/// Fluent construction of a [`TestEventContext`].
#[derive(Debug)]
pub struct TestEventContextBuilder {
    context: TestEventContext,
    escaped_route: Option<String>,
}

impl TestEventContextBuilder {
    pub fn new(method: HttpMethod, route: impl Into<String>) -> Self {
        let route = route.into();
        Self {
            context: TestEventContext {
                description: String::new(),
                route,
                escaped_route: String::new(),
                http_method: method,
                query: BTreeMap::new(),
                escaped_query: String::new(),
                group: None,
                headers: HashMap::new(),
                body: None,
                expectations: Expectations::default(),
                session: TestSession::new(),
                index: 0,
                total_count: 1,
                count_failure: FailureCounter::noop(),
                context: Value::Null,
                file: String::new(),
                method_name: String::new(),
                parameters: BTreeMap::new(),
            },
            escaped_route: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.context.description = description.into();
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.context.group = Some(group.into());
        self
    }

    /// Overrides the escaped route; by default the route is percent-encoded.
    pub fn escaped_route(mut self, escaped: impl Into<String>) -> Self {
        self.escaped_route = Some(escaped.into());
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.query.insert(key.into(), value.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.headers.insert(name.into(), value.into());
        self
    }

    pub fn body(mut self, body: impl Into<Payload>) -> Self {
        self.context.body = Some(body.into());
        self
    }

    pub fn expectations(mut self, expectations: Expectations) -> Self {
        self.context.expectations = expectations;
        self
    }

    pub fn session(mut self, session: TestSession, index: usize, total_count: usize) -> Self {
        self.context.session = session;
        self.context.index = index;
        self.context.total_count = total_count;
        self
    }

    pub fn count_failure(mut self, counter: FailureCounter) -> Self {
        self.context.count_failure = counter;
        self
    }

    pub fn handler_context(mut self, context: Value) -> Self {
        self.context.context = context;
        self
    }

    pub fn file(mut self, file: impl Into<String>) -> Self {
        self.context.file = file.into();
        self
    }

    pub fn method_name(mut self, name: impl Into<String>) -> Self {
        self.context.method_name = name.into();
        self
    }

    pub fn parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.parameters.insert(name.into(), value.into());
        self
    }

    pub fn build(self) -> TestEventContext {
        let mut context = self.context;
        context.escaped_route = self
            .escaped_route
            .unwrap_or_else(|| escape_path(&context.route));
        context.escaped_query = escape_query(&context.query);
        context
    }
}

fn escape_path(route: &str) -> String {
    let Ok(mut url) = reqwest::Url::parse("http://localhost/") else {
        return route.to_string();
    };
    url.set_path(route);
    url.path().to_string()
}

fn escape_query(query: &BTreeMap<String, String>) -> String {
    if query.is_empty() {
        return String::new();
    }
    let Ok(mut url) = reqwest::Url::parse("http://localhost/") else {
        return String::new();
    };
    url.query_pairs_mut().extend_pairs(query);
    url.query().unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builder_escapes_route_and_query() {
        let context = TestEventContext::builder(HttpMethod::Get, "/users/john doe")
            .query("q", "a&b")
            .query("page", "2")
            .build();

        assert_eq!(context.escaped_route, "/users/john%20doe");
        assert_eq!(context.escaped_query, "page=2&q=a%26b");
    }

    #[test]
    fn last_event_detection() {
        let session = TestSession::with_id("s1");
        let first = TestEventContext::builder(HttpMethod::Get, "/")
            .session(session.clone(), 0, 2)
            .build();
        let last = TestEventContext::builder(HttpMethod::Get, "/")
            .session(session, 1, 2)
            .build();

        assert!(!first.is_last());
        assert!(last.is_last());
    }

    #[test]
    fn empty_session_has_no_last_event() {
        let context = TestEventContext::builder(HttpMethod::Get, "/")
            .session(TestSession::with_id("s"), 0, 0)
            .build();
        assert!(!context.is_last());
    }

    #[tokio::test]
    async fn tally_counts_failures() {
        let (counter, failures) = FailureCounter::tally();
        counter.count().await;
        counter.count().await;
        assert_eq!(failures.load(Ordering::SeqCst), 2);
    }
}
