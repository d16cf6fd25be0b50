use std::fmt;
use std::future::Future;
use std::sync::Arc;

use rhai::{AST, Dynamic, Engine, Scope};

use super::engine::{create_engine, is_truthy};
use crate::BoxFuture;
use crate::context::TestEventContext;
use crate::error::FilterError;

/// Environment variable holding the default filter expression.
pub const FILTER_ENV_VAR: &str = "EGO_TEST_FILTER";

/// Where the listener gets its filter from.
#[derive(Clone, Default)]
pub enum FilterSource {
    /// Expression read from [`FILTER_ENV_VAR`] at setup.
    #[default]
    Environment,
    Expression(String),
    Custom(TestFilter),
}

impl FilterSource {
    /// Reads the expression through `lookup` instead of the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: FnOnce(&str) -> Option<String>,
    {
        FilterSource::Expression(lookup(FILTER_ENV_VAR).unwrap_or_default())
    }

    pub fn resolve(&self) -> Result<TestFilter, FilterError> {
        match self {
            FilterSource::Environment => create_default_predicate(),
            FilterSource::Expression(expression) => TestFilter::from_expression(expression),
            FilterSource::Custom(filter) => Ok(filter.clone()),
        }
    }
}

impl fmt::Debug for FilterSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterSource::Environment => f.write_str("Environment"),
            FilterSource::Expression(expression) => {
                f.debug_tuple("Expression").field(expression).finish()
            }
            FilterSource::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// A filter expression compiled once and evaluated per event.
#[derive(Clone)]
pub struct CompiledFilter {
    engine: Arc<Engine>,
    ast: AST,
    expression: String,
}

impl CompiledFilter {
    pub fn compile(expression: &str) -> Result<Self, FilterError> {
        let engine = create_engine();
        let ast = engine
            .compile_expression(expression)
            .map_err(|err| FilterError::Compile {
                expression: expression.to_string(),
                message: err.to_string(),
            })?;

        tracing::debug!(expression, "compiled test filter");

        Ok(Self {
            engine: Arc::new(engine),
            ast,
            expression: expression.to_string(),
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn evaluate(&self, context: &TestEventContext) -> Result<bool, FilterError> {
        let mut scope = bind_symbols(context)?;
        let result = self
            .engine
            .eval_ast_with_scope::<Dynamic>(&mut scope, &self.ast)
            .map_err(|err| FilterError::Evaluate {
                message: err.to_string(),
            })?;
        Ok(is_truthy(&result))
    }
}

/// The symbols a filter expression can refer to, taken from one event.
fn bind_symbols(context: &TestEventContext) -> Result<Scope<'static>, FilterError> {
    let evaluate_error = |message: String| FilterError::Evaluate { message };

    let handler_context = rhai::serde::to_dynamic(&context.context)
        .map_err(|err| evaluate_error(err.to_string()))?;
    let parameters = serde_json::to_string(&context.parameters)
        .map_err(|err| evaluate_error(err.to_string()))?;
    let query =
        serde_json::to_string(&context.query).map_err(|err| evaluate_error(err.to_string()))?;
    let group = match &context.group {
        Some(group) => Dynamic::from(group.clone()),
        None => Dynamic::UNIT,
    };

    let mut scope = Scope::new();
    scope
        .push_constant_dynamic("context", handler_context)
        // only the host can count a failure
        .push_constant_dynamic("countFailure", Dynamic::UNIT)
        .push_constant("description", context.description.clone())
        .push_constant("escapedQuery", context.escaped_query.clone())
        .push_constant("escapedRoute", context.escaped_route.clone())
        .push_constant("file", context.file.clone())
        .push_constant_dynamic("group", group)
        .push_constant("httpMethod", context.http_method.as_lower().to_string())
        .push_constant("methodName", context.method_name.clone())
        .push_constant("parameters", parameters)
        .push_constant("query", query)
        .push_constant("route", context.route.clone());
    Ok(scope)
}

type FilterFn =
    dyn Fn(Arc<TestEventContext>) -> BoxFuture<'static, Result<bool, FilterError>> + Send + Sync;

/// Decides whether a test event runs. Synchronous and asynchronous filters
/// are invoked the same way.
#[derive(Clone)]
pub struct TestFilter(Arc<FilterFn>);

impl TestFilter {
    pub fn admit_all() -> Self {
        Self::from_fn(|_| true)
    }

    pub fn from_fn<F>(filter: F) -> Self
    where
        F: Fn(&TestEventContext) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(move |context| {
            let admitted = filter(&context);
            Box::pin(async move { Ok(admitted) })
        }))
    }

    pub fn from_async<F, Fut>(filter: F) -> Self
    where
        F: Fn(Arc<TestEventContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        Self(Arc::new(move |context| {
            let pending = filter(context);
            Box::pin(async move { Ok(pending.await) })
        }))
    }

    /// Compiles `expression`; a blank expression admits every event.
    pub fn from_expression(expression: &str) -> Result<Self, FilterError> {
        let expression = expression.trim();
        if expression.is_empty() {
            return Ok(Self::admit_all());
        }

        let compiled = CompiledFilter::compile(expression)?;
        Ok(Self(Arc::new(move |context| {
            let verdict = compiled.evaluate(&context);
            Box::pin(async move { verdict })
        })))
    }

    pub async fn admits(&self, context: Arc<TestEventContext>) -> Result<bool, FilterError> {
        (self.0)(context).await
    }
}

impl fmt::Debug for TestFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TestFilter")
    }
}

/// The filter used when the caller configures none: the expression from
/// [`FILTER_ENV_VAR`], or admit everything when it is unset or blank.
pub fn create_default_predicate() -> Result<TestFilter, FilterError> {
    let expression = std::env::var(FILTER_ENV_VAR).unwrap_or_default();
    if !expression.trim().is_empty() {
        tracing::info!(variable = FILTER_ENV_VAR, expression = %expression.trim(), "using test filter from environment");
    }
    TestFilter::from_expression(&expression)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::method::HttpMethod;
    use serde_json::json;

    fn event() -> Arc<TestEventContext> {
        Arc::new(
            TestEventContext::builder(HttpMethod::Get, "/users/list")
                .description("lists users")
                .group("Users")
                .query("limit", "5")
                .handler_context(json!({"role": "admin"}))
                .file("users.ts")
                .method_name("getUsers")
                .parameter("id", "7")
                .build(),
        )
    }

    async fn admits(expression: &str) -> bool {
        TestFilter::from_expression(expression)
            .unwrap()
            .admits(event())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn blank_expression_admits_everything() {
        let filter = FilterSource::from_lookup(|_| None).resolve().unwrap();
        assert!(filter.admits(event()).await.unwrap());
        assert!(admits("   ").await);
    }

    #[tokio::test]
    async fn environment_source_reads_the_filter_variable() {
        // SAFETY: no other test reads or writes this variable
        unsafe { std::env::set_var(FILTER_ENV_VAR, r#"  httpMethod == "delete"  "#) };
        let filtered = FilterSource::Environment.resolve();
        unsafe { std::env::remove_var(FILTER_ENV_VAR) };
        let unfiltered = create_default_predicate();

        assert!(!filtered.unwrap().admits(event()).await.unwrap());
        assert!(unfiltered.unwrap().admits(event()).await.unwrap());
    }

    #[tokio::test]
    async fn lookup_reads_the_filter_variable() {
        let source = FilterSource::from_lookup(|name| {
            (name == FILTER_ENV_VAR).then(|| r#"httpMethod == "post""#.to_string())
        });
        let filter = source.resolve().unwrap();
        assert!(!filter.admits(event()).await.unwrap());
    }

    #[tokio::test]
    async fn symbols_describe_the_event() {
        assert!(admits(r#"startsWith(route, "/users") && httpMethod == "get""#).await);
        assert!(admits(r#"group == "Users" && methodName == "getUsers""#).await);
        assert!(admits(r#"all(description, "LISTS", "users")"#).await);
        assert!(admits(r#"query == "{\"limit\":\"5\"}""#).await);
        assert!(admits(r#"any(parameters, "id") && file == "users.ts""#).await);
        assert!(admits(r#"context.role == "admin""#).await);
        assert!(!admits(r#"context.role == "guest""#).await);
    }

    #[tokio::test]
    async fn result_is_coerced_by_truthiness() {
        // "/" is found at index 0
        assert!(!admits(r#"indexOf(route, "/")"#).await);
        assert!(admits(r#"indexOf(route, "list")"#).await);
        assert!(!admits("countFailure").await);
        assert!(admits("route").await);
    }

    #[test]
    fn malformed_expression_fails_at_compile_time() {
        let err = TestFilter::from_expression("route ==").unwrap_err();
        assert!(matches!(err, FilterError::Compile { .. }));
    }

    #[tokio::test]
    async fn unknown_helper_fails_at_evaluation() {
        let filter = TestFilter::from_expression("unknownHelper(route)").unwrap();
        let err = filter.admits(event()).await.unwrap_err();
        assert!(matches!(err, FilterError::Evaluate { .. }));
    }

    #[tokio::test]
    async fn custom_filters_share_one_contract() {
        let sync = TestFilter::from_fn(|context| context.route.ends_with("list"));
        let deferred = TestFilter::from_async(|context: Arc<TestEventContext>| async move {
            context.group.is_none()
        });

        assert!(sync.admits(event()).await.unwrap());
        assert!(!deferred.admits(event()).await.unwrap());
    }
}
