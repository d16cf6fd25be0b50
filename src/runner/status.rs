use std::fmt::{self, Display};
use std::future::Future;
use std::sync::Arc;

use serde::Serialize;

use crate::BoxFuture;
use crate::context::TestEventContext;
use crate::error::TestError;

/// Stage of a test event. A test moves `Entered`, `Running`, `Finished` and
/// then `Passed` or `Failed`, or goes straight from `Entered` to `Skipped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Entered,
    Running,
    Finished,
    Passed,
    Failed,
    Skipped,
}

impl TestStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TestStatus::Passed | TestStatus::Failed | TestStatus::Skipped)
    }
}

impl Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TestStatus::Entered => "entered",
            TestStatus::Running => "running",
            TestStatus::Finished => "finished",
            TestStatus::Passed => "passed",
            TestStatus::Failed => "failed",
            TestStatus::Skipped => "skipped",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub context: Arc<TestEventContext>,
    /// Only set for [`TestStatus::Failed`].
    pub error: Option<Arc<TestError>>,
    pub status: TestStatus,
}

type CallbackFn = dyn Fn(StatusUpdate) -> BoxFuture<'static, ()> + Send + Sync;

/// Receives every status transition. The listener awaits it before moving on.
#[derive(Clone)]
pub struct StatusCallback(Arc<CallbackFn>);

impl StatusCallback {
    pub fn noop() -> Self {
        Self::from_fn(|_| {})
    }

    pub fn from_fn<F>(callback: F) -> Self
    where
        F: Fn(StatusUpdate) + Send + Sync + 'static,
    {
        Self(Arc::new(move |update| {
            callback(update);
            Box::pin(async {})
        }))
    }

    pub fn from_async<F, Fut>(callback: F) -> Self
    where
        F: Fn(StatusUpdate) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self(Arc::new(move |update| Box::pin(callback(update))))
    }

    pub async fn emit(&self, update: StatusUpdate) {
        (self.0)(update).await
    }
}

impl Default for StatusCallback {
    fn default() -> Self {
        Self::noop()
    }
}

impl fmt::Debug for StatusCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StatusCallback")
    }
}
