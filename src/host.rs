//! The contract with the server framework that emits test events.

use std::sync::{Arc, Mutex, PoisonError};

use crate::BoxFuture;
use crate::context::{TestEventContext, TestSession};

pub type TestEventHandler =
    Arc<dyn Fn(Arc<TestEventContext>) -> BoxFuture<'static, ()> + Send + Sync>;

/// A server framework that runs endpoint tests.
///
/// Hosts must emit the events of one session one after another, each
/// handler call completing before the next event of that session.
pub trait TestHost: Send + Sync {
    /// Base URL test requests are sent to.
    fn base_url(&self) -> String;

    /// Registers a handler for the `test` event.
    fn on_test(&self, handler: TestEventHandler);
}

/// In-process host that dispatches events to its handlers directly.
pub struct EventHub {
    base_url: String,
    handlers: Mutex<Vec<TestEventHandler>>,
}

impl EventHub {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            handlers: Mutex::new(Vec::new()),
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Emits one event, awaiting each handler in registration order.
    pub async fn emit(&self, context: TestEventContext) {
        let context = Arc::new(context);
        let handlers = self
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for handler in handlers {
            handler(Arc::clone(&context)).await;
        }
    }

    /// Emits `contexts` as one fresh session, in order.
    pub async fn run_session(&self, contexts: Vec<TestEventContext>) -> TestSession {
        let session = TestSession::new();
        let total_count = contexts.len();

        for (index, mut context) in contexts.into_iter().enumerate() {
            context.session = session.clone();
            context.index = index;
            context.total_count = total_count;
            self.emit(context).await;
        }

        session
    }
}

impl TestHost for EventHub {
    fn base_url(&self) -> String {
        self.base_url.clone()
    }

    fn on_test(&self, handler: TestEventHandler) {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handler);
    }
}
