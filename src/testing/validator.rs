use std::fmt;
use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;

use crate::BoxFuture;

/// Input of a [`BodyValidator`].
#[derive(Debug, Clone)]
pub struct BodyValidationContext {
    pub body: Bytes,
}

/// Verdict of a [`BodyValidator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Accepted,
    /// Rejected without a reason.
    Rejected,
    RejectedWith(String),
}

impl From<()> for Validation {
    fn from(_: ()) -> Self {
        Validation::Accepted
    }
}

impl From<bool> for Validation {
    fn from(accepted: bool) -> Self {
        if accepted {
            Validation::Accepted
        } else {
            Validation::Rejected
        }
    }
}

impl From<String> for Validation {
    fn from(reason: String) -> Self {
        Validation::RejectedWith(reason)
    }
}

impl From<&str> for Validation {
    fn from(reason: &str) -> Self {
        Validation::RejectedWith(reason.to_string())
    }
}

impl<E: fmt::Display> From<Result<(), E>> for Validation {
    fn from(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Validation::Accepted,
            Err(err) => Validation::RejectedWith(err.to_string()),
        }
    }
}

type ValidatorFn = dyn Fn(BodyValidationContext) -> BoxFuture<'static, Validation> + Send + Sync;

/// Custom body check. Synchronous and asynchronous checks are invoked the
/// same way.
#[derive(Clone)]
pub struct BodyValidator(Arc<ValidatorFn>);

impl BodyValidator {
    pub fn from_fn<F, R>(validate: F) -> Self
    where
        F: Fn(&BodyValidationContext) -> R + Send + Sync + 'static,
        R: Into<Validation>,
    {
        Self(Arc::new(move |context| {
            let verdict = validate(&context).into();
            Box::pin(async move { verdict })
        }))
    }

    pub fn from_async<F, Fut, R>(validate: F) -> Self
    where
        F: Fn(BodyValidationContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Into<Validation>,
    {
        Self(Arc::new(move |context| {
            let pending = validate(context);
            Box::pin(async move { pending.await.into() })
        }))
    }

    pub async fn validate(&self, body: Bytes) -> Validation {
        (self.0)(BodyValidationContext { body }).await
    }
}

impl fmt::Debug for BodyValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BodyValidator")
    }
}
