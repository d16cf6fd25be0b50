//! Listener configuration.

use std::fmt;
use std::future::Future;
use std::io::Write;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::BoxFuture;
use crate::context::TestEventContext;
use crate::error::SetupError;
use crate::filters::FilterSource;
use crate::host::TestHost;
use crate::runner::session::SessionRegistry;
use crate::runner::status::StatusCallback;

/// Plain settings of a listener, deserializable from a JSON document with
/// camel-cased keys. Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListenerSettings {
    pub binary_parser_encoding: String,
    pub eol: String,
    pub group_prefix: String,
    pub item_prefix: String,
}

impl Default for ListenerSettings {
    fn default() -> Self {
        Self {
            binary_parser_encoding: "binary".to_string(),
            eol: default_eol().to_string(),
            group_prefix: "🧪 ".to_string(),
            item_prefix: "\t".to_string(),
        }
    }
}

impl ListenerSettings {
    pub fn from_json(input: &str) -> Result<Self, SetupError> {
        Ok(serde_json::from_str(input)?)
    }
}

fn default_eol() -> &'static str {
    if cfg!(windows) { "\r\n" } else { "\n" }
}

/// Output stream shared between test events.
pub type SharedWriter = Arc<Mutex<dyn Write + Send>>;

type StreamFn = dyn Fn(Arc<TestEventContext>) -> BoxFuture<'static, SharedWriter> + Send + Sync;

/// Supplies the stream a test event writes its lines to. Asked once per
/// event, with that event, so output can be routed per session or group.
#[derive(Clone)]
pub struct OutputStreamProvider(Arc<StreamFn>);

impl OutputStreamProvider {
    pub fn stderr() -> Self {
        let stream: SharedWriter = Arc::new(Mutex::new(std::io::stderr()));
        Self::from_writer(stream)
    }

    /// Always hands out the same writer.
    pub fn from_writer(writer: SharedWriter) -> Self {
        Self::from_fn(move |_| Arc::clone(&writer))
    }

    pub fn from_fn<F>(provide: F) -> Self
    where
        F: Fn(&TestEventContext) -> SharedWriter + Send + Sync + 'static,
    {
        Self(Arc::new(move |context| {
            let writer = provide(&context);
            Box::pin(async move { writer })
        }))
    }

    pub fn from_async<F, Fut>(provide: F) -> Self
    where
        F: Fn(Arc<TestEventContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = SharedWriter> + Send + 'static,
    {
        Self(Arc::new(move |context| Box::pin(provide(context))))
    }

    pub async fn get(&self, context: Arc<TestEventContext>) -> SharedWriter {
        (self.0)(context).await
    }
}

impl Default for OutputStreamProvider {
    fn default() -> Self {
        Self::stderr()
    }
}

impl fmt::Debug for OutputStreamProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OutputStreamProvider")
    }
}

/// Everything `setup_test_event_listener` needs. Only the host is required.
#[derive(Clone)]
pub struct SetupOptions {
    pub server: Arc<dyn TestHost>,
    pub settings: ListenerSettings,
    pub filter: FilterSource,
    pub get_stream: OutputStreamProvider,
    pub on_status_update: StatusCallback,
    pub sessions: Arc<SessionRegistry>,
}

impl SetupOptions {
    pub fn new(server: Arc<dyn TestHost>) -> Self {
        Self {
            server,
            settings: ListenerSettings::default(),
            filter: FilterSource::default(),
            get_stream: OutputStreamProvider::default(),
            on_status_update: StatusCallback::default(),
            sessions: Arc::new(SessionRegistry::new()),
        }
    }

    pub fn settings(mut self, settings: ListenerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn filter(mut self, filter: FilterSource) -> Self {
        self.filter = filter;
        self
    }

    pub fn get_stream(mut self, provider: OutputStreamProvider) -> Self {
        self.get_stream = provider;
        self
    }

    pub fn on_status_update(mut self, callback: StatusCallback) -> Self {
        self.on_status_update = callback;
        self
    }

    /// Shares a session registry with the caller.
    pub fn sessions(mut self, sessions: Arc<SessionRegistry>) -> Self {
        self.sessions = sessions;
        self
    }
}

impl fmt::Debug for SetupOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetupOptions")
            .field("base_url", &self.server.base_url())
            .field("settings", &self.settings)
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::method::HttpMethod;
    use pretty_assertions::assert_eq;

    #[test]
    fn settings_default_missing_keys() {
        let settings = ListenerSettings::from_json(r#"{"itemPrefix": "  ", "eol": "\r\n"}"#).unwrap();

        assert_eq!(settings.item_prefix, "  ");
        assert_eq!(settings.eol, "\r\n");
        assert_eq!(settings.binary_parser_encoding, "binary");
        assert_eq!(settings.group_prefix, "🧪 ");
    }

    #[test]
    fn malformed_settings_are_a_setup_error() {
        let err = ListenerSettings::from_json(r#"{"eol": 5}"#).unwrap_err();
        assert!(matches!(err, SetupError::Settings(_)));
    }

    #[tokio::test]
    async fn provider_hands_out_the_writer() {
        let buffer = Arc::new(Mutex::new(Vec::<u8>::new()));
        let provider = OutputStreamProvider::from_writer(buffer.clone());

        let context = Arc::new(TestEventContext::builder(HttpMethod::Get, "/").build());
        let stream = provider.get(context).await;
        stream.lock().unwrap().write_all(b"line").unwrap();

        assert_eq!(buffer.lock().unwrap().as_slice(), b"line");
    }

    #[tokio::test]
    async fn provider_routes_by_group() {
        let users = Arc::new(Mutex::new(Vec::<u8>::new()));
        let other = Arc::new(Mutex::new(Vec::<u8>::new()));
        let (users_sink, other_sink) = (users.clone(), other.clone());
        let provider = OutputStreamProvider::from_fn(move |context| -> SharedWriter {
            match context.group.as_deref() {
                Some("Users") => users_sink.clone(),
                _ => other_sink.clone(),
            }
        });

        let grouped = TestEventContext::builder(HttpMethod::Get, "/users")
            .group("Users")
            .build();
        let ungrouped = TestEventContext::builder(HttpMethod::Get, "/health").build();

        provider.get(Arc::new(grouped)).await.lock().unwrap().write_all(b"users").unwrap();
        provider.get(Arc::new(ungrouped)).await.lock().unwrap().write_all(b"other").unwrap();

        assert_eq!(users.lock().unwrap().as_slice(), b"users");
        assert_eq!(other.lock().unwrap().as_slice(), b"other");
    }
}
