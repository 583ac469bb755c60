//! Error types for deferred values and the runtime that drives them.

use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::debug;

/// Default rejection reason.
///
/// Any reason type used with [`Deferred`](crate::Deferred) must be convertible
/// from this enum so the core can report its own failures (circular
/// resolution, caught panics, exhausted `any`) through the normal rejection
/// path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A derived value was resolved with itself.
    #[error("circular reference: deferred value resolved with itself")]
    CircularReference,

    /// A producer or continuation panicked; holds the panic message.
    #[error("callback panicked: {0}")]
    Panicked(String),

    /// Every input of an `any` combinator rejected.
    #[error("all {0} inputs rejected")]
    AllRejected(usize),

    /// Free-form rejection reason.
    #[error("{0}")]
    Message(String),
}

impl From<&str> for Error {
    fn from(message: &str) -> Self {
        Error::Message(message.to_string())
    }
}

impl From<String> for Error {
    fn from(message: String) -> Self {
        Error::Message(message)
    }
}

/// Failures of the runtime itself, as opposed to rejections.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    /// `block_on` ran out of queued work while its future was still pending.
    #[error("runtime stalled: no queued work and the future is still pending")]
    Stalled,

    /// A single drain executed more turns than the configured limit.
    #[error("turn limit of {limit} exceeded")]
    TurnLimitExceeded { limit: usize },
}

// Extracts a human-readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Runs `function`, turning a panic into an [`Error::Panicked`] rejection reason.
pub(crate) fn catch_panic<R, E>(function: impl FnOnce() -> Result<R, E>) -> Result<R, E>
where
    E: From<Error>,
{
    match catch_unwind(AssertUnwindSafe(function)) {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            debug!(%message, "callback panicked");
            Err(E::from(Error::Panicked(message)))
        }
    }
}
