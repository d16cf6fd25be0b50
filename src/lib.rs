//! Runs the endpoint tests a server framework declares and checks the
//! responses.
//!
//! The host emits one `test` event per declared endpoint test. For each event
//! the listener applies the filter, sends the described request to the host,
//! asserts status, headers and body against the declared expectations and
//! reports the outcome:
//!
//! ```no_run
//! use std::sync::Arc;
//! use supertest_bridge::{EventHub, SetupOptions, setup_test_event_listener};
//!
//! # fn main() -> Result<(), supertest_bridge::SetupError> {
//! let host = Arc::new(EventHub::new("http://127.0.0.1:8080"));
//! setup_test_event_listener(SetupOptions::new(host))?;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::pin::Pin;

pub mod context;
pub mod error;
pub mod filters;
pub mod host;
pub mod http;
pub mod options;
pub mod runner;
pub mod testing;
pub mod values;

pub use context::{FailureCounter, TestEventContext, TestEventContextBuilder, TestSession};
pub use error::{AssertionError, FilterError, SetupError, TestError};
pub use filters::{FILTER_ENV_VAR, FilterSource, TestFilter, create_default_predicate};
pub use host::{EventHub, TestEventHandler, TestHost};
pub use http::encoding::BodyEncoding;
pub use http::method::HttpMethod;
pub use options::{ListenerSettings, OutputStreamProvider, SetupOptions, SharedWriter};
pub use runner::session::{SessionInfo, SessionRegistry};
pub use runner::status::{StatusCallback, StatusUpdate, TestStatus};
pub use runner::{TestEventListener, setup_test_event_listener};
pub use testing::{
    BodyValidationContext, BodyValidator, ExpectedBody, ExpectedHeader, Expectations, Validation,
    assert_response,
};
pub use values::Payload;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
