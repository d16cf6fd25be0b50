//! # Test Event Listener
//!
//! Runs one HTTP exchange per `test` event and reports its outcome.
//!
//! Every event walks `Entered`, `Running`, `Finished` and ends in `Passed` or
//! `Failed`; an event rejected by the filter goes from `Entered` straight to
//! `Skipped` without sending a request. Each transition is forwarded to the
//! status callback and awaited.

pub mod output;
pub mod session;
pub mod status;

use std::sync::Arc;
use std::time::Instant;

use crate::context::TestEventContext;
use crate::error::{SetupError, TestError};
use crate::filters::TestFilter;
use crate::host::TestHost;
use crate::http::client::{prepare_request, send_request};
use crate::http::encoding::BodyEncoding;
use crate::http::request::RequestInput;
use crate::options::{ListenerSettings, OutputStreamProvider, SetupOptions};
use crate::testing::assert_response;

use output::Reporter;
use session::SessionRegistry;
use status::{StatusCallback, StatusUpdate, TestStatus};

pub struct TestEventListener {
    base_url: String,
    client: reqwest::Client,
    encoding: BodyEncoding,
    filter: TestFilter,
    get_stream: OutputStreamProvider,
    on_status_update: StatusCallback,
    sessions: Arc<SessionRegistry>,
    settings: ListenerSettings,
}

impl TestEventListener {
    /// Validates `options`. A malformed filter expression or an unknown
    /// encoding is reported here, before any event is handled.
    pub fn new(options: SetupOptions) -> Result<Self, SetupError> {
        let encoding: BodyEncoding = options
            .settings
            .binary_parser_encoding
            .parse()
            .map_err(SetupError::Encoding)?;
        let filter = options.filter.resolve()?;
        // requests target the host itself
        let client = reqwest::Client::builder()
            .no_proxy()
            .build()
            .map_err(SetupError::Client)?;

        Ok(Self {
            base_url: options.server.base_url(),
            client,
            encoding,
            filter,
            get_stream: options.get_stream,
            on_status_update: options.on_status_update,
            sessions: options.sessions,
            settings: options.settings,
        })
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    /// Handles one test event to completion. Failures are reported, never
    /// returned.
    pub async fn handle(&self, context: Arc<TestEventContext>) {
        let received = Instant::now();
        let stream = self.get_stream.get(Arc::clone(&context)).await;
        let reporter = Reporter::new(stream, &self.settings, &context);

        let group_changed = self
            .sessions
            .enter_group(&context.session.id, context.group.as_deref());
        if let (true, Some(group)) = (group_changed, &context.group) {
            reporter.group(group);
        }

        self.update(&context, TestStatus::Entered, None).await;

        let mut exchange = Exchange::default();
        match self.run(&context, &mut exchange).await {
            Ok(TestStatus::Skipped) => {
                reporter.skip();
                self.update(&context, TestStatus::Skipped, None).await;
            }
            Ok(_) => {
                let started = exchange.started.unwrap_or(received);
                let ended = exchange.ended.unwrap_or_else(Instant::now);
                reporter.succeed(ended.saturating_duration_since(started).as_millis());
                self.update(&context, TestStatus::Passed, None).await;
            }
            Err(err) => {
                let elapsed = exchange.started.unwrap_or(received).elapsed().as_millis();
                reporter.fail(elapsed, &err);
                context.count_failure.count().await;
                self.update(&context, TestStatus::Failed, Some(Arc::new(err)))
                    .await;
            }
        }

        if context.is_last() {
            self.sessions.remove(&context.session.id);
            tracing::debug!(session = %context.session.id, "session finished");
        }
    }

    /// Filter, exchange and assertions. `exchange` records when the request
    /// went out and when its response arrived.
    async fn run(
        &self,
        context: &Arc<TestEventContext>,
        exchange: &mut Exchange,
    ) -> Result<TestStatus, TestError> {
        if !self.filter.admits(Arc::clone(context)).await? {
            return Ok(TestStatus::Skipped);
        }

        let request = RequestInput::for_event(&self.base_url, context);
        let prepared = prepare_request(&self.client, &request)?;

        exchange.started = Some(Instant::now());
        self.update(context, TestStatus::Running, None).await;

        tracing::trace!(method = %request.method, url = %request.url, "sending test request");
        let response = send_request(prepared, self.encoding).await?;
        exchange.ended = Some(Instant::now());
        tracing::trace!(status = response.status, "received test response");

        self.update(context, TestStatus::Finished, None).await;

        assert_response(&response, &context.expectations).await?;
        Ok(TestStatus::Passed)
    }

    async fn update(
        &self,
        context: &Arc<TestEventContext>,
        status: TestStatus,
        error: Option<Arc<TestError>>,
    ) {
        tracing::debug!(
            session = %context.session.id,
            index = context.index,
            %status,
            "test status changed"
        );
        self.on_status_update
            .emit(StatusUpdate {
                context: Arc::clone(context),
                error,
                status,
            })
            .await;
    }
}

/// Timestamps bracketing the HTTP exchange of one event.
#[derive(Debug, Default)]
struct Exchange {
    started: Option<Instant>,
    ended: Option<Instant>,
}

/// Builds a listener from `options` and registers it for the host's `test`
/// event.
pub fn setup_test_event_listener(
    options: SetupOptions,
) -> Result<Arc<TestEventListener>, SetupError> {
    let server = Arc::clone(&options.server);
    let listener = Arc::new(TestEventListener::new(options)?);

    let handler = Arc::clone(&listener);
    server.on_test(Arc::new(move |context| {
        let listener = Arc::clone(&handler);
        Box::pin(async move { listener.handle(context).await })
    }));

    Ok(listener)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{FailureCounter, TestSession};
    use crate::filters::FilterSource;
    use crate::host::EventHub;
    use crate::http::method::HttpMethod;
    use crate::testing::{BodyValidator, Expectations};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn hub() -> Arc<EventHub> {
        // nothing listens on the discard port
        Arc::new(EventHub::new("http://127.0.0.1:9"))
    }

    fn recorder() -> (StatusCallback, Arc<Mutex<Vec<TestStatus>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback = StatusCallback::from_fn(move |update| {
            sink.lock().unwrap().push(update.status);
        });
        (callback, seen)
    }

    fn buffer_options(host: Arc<EventHub>) -> (SetupOptions, Arc<Mutex<Vec<u8>>>) {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let options = SetupOptions::new(host)
            .filter(FilterSource::Expression(String::new()))
            .get_stream(OutputStreamProvider::from_writer(buffer.clone()));
        (options, buffer)
    }

    #[test]
    fn malformed_filter_fails_setup() {
        let (options, _) = buffer_options(hub());
        let err = setup_test_event_listener(options.filter(FilterSource::Expression("route ==".into())))
            .err()
            .unwrap();
        assert!(matches!(err, SetupError::Filter(_)));
    }

    #[test]
    fn unknown_encoding_fails_setup() {
        let (options, _) = buffer_options(hub());
        let settings = ListenerSettings {
            binary_parser_encoding: "ebcdic".to_string(),
            ..ListenerSettings::default()
        };
        let err = TestEventListener::new(options.settings(settings)).err().unwrap();
        assert!(matches!(err, SetupError::Encoding(name) if name == "ebcdic"));
    }

    #[test]
    fn setup_registers_with_the_host() {
        let host = hub();
        let (options, _) = buffer_options(Arc::clone(&host));
        setup_test_event_listener(options).unwrap();
        assert_eq!(host.handler_count(), 1);
    }

    #[tokio::test]
    async fn rejected_events_are_skipped_without_a_request() {
        colored::control::set_override(false);
        let host = hub();
        let (callback, seen) = recorder();
        let (options, buffer) = buffer_options(Arc::clone(&host));
        let validator_ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&validator_ran);

        let listener = setup_test_event_listener(
            options
                .filter(FilterSource::Custom(TestFilter::from_fn(|_| false)))
                .on_status_update(callback),
        )
        .unwrap();

        let (counter, failures) = FailureCounter::tally();
        let context = TestEventContext::builder(HttpMethod::Get, "/skipped")
            .description("is skipped")
            .count_failure(counter)
            .expectations(Expectations::new(200).with_body(BodyValidator::from_fn(move |_| {
                flag.store(true, Ordering::SeqCst);
                true
            })))
            .build();
        host.emit(context).await;

        assert_eq!(*seen.lock().unwrap(), vec![TestStatus::Entered, TestStatus::Skipped]);
        assert_eq!(failures.load(Ordering::SeqCst), 0);
        assert!(!validator_ran.load(Ordering::SeqCst));
        assert!(listener.sessions().is_empty());
        assert_eq!(
            String::from_utf8(buffer.lock().unwrap().clone()).unwrap(),
            format!("\t ℹ [SKIPPED] [GET /skipped]: 'it is skipped'{}", ListenerSettings::default().eol)
        );
    }

    #[tokio::test]
    async fn transport_errors_fail_the_test() {
        colored::control::set_override(false);
        let host = hub();
        let (callback, seen) = recorder();
        let (options, _) = buffer_options(Arc::clone(&host));
        let listener = setup_test_event_listener(options.on_status_update(callback)).unwrap();

        let (counter, failures) = FailureCounter::tally();
        let session = TestSession::new();
        let context = TestEventContext::builder(HttpMethod::Get, "/down")
            .session(session.clone(), 0, 2)
            .count_failure(counter)
            .build();
        listener.handle(Arc::new(context)).await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec![TestStatus::Entered, TestStatus::Running, TestStatus::Failed]
        );
        assert_eq!(failures.load(Ordering::SeqCst), 1);
        // not the last event of its session yet
        assert!(listener.sessions().contains(&session.id));
    }

    #[tokio::test]
    async fn invalid_headers_fail_before_running() {
        colored::control::set_override(false);
        let host = hub();
        let (callback, seen) = recorder();
        let (options, buffer) = buffer_options(Arc::clone(&host));
        let listener = setup_test_event_listener(options.on_status_update(callback)).unwrap();

        let context = TestEventContext::builder(HttpMethod::Post, "/bad")
            .description("sends a bad header")
            .header("bad header", "1")
            .build();
        listener.handle(Arc::new(context)).await;

        assert_eq!(*seen.lock().unwrap(), vec![TestStatus::Entered, TestStatus::Failed]);
        let output = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
        assert!(output.starts_with("\t ✖ [FAILED] [POST /bad]: 'it sends a bad header' ("));
        assert!(output.contains("Invalid request: Invalid header name `bad header`"));
    }
}
