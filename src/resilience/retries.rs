//! Failure classification.
//!
//! # Responsibilities
//! - Let a call mark its error as retryable or fatal
//! - Describe why a single attempt failed
//! - Describe the terminal failure of an execution
//!
//! # Design Decisions
//! - Errors are retryable unless the call says otherwise (`?` converts into
//!   [`CallError::Retryable`])
//! - Only the last transient failure is kept; earlier ones are logged
//! - HTTP-level classification lives with the remote service, not here

use std::time::Duration;

use thiserror::Error;

/// Error returned by a wrapped call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallError<E> {
    /// The attempt failed but may succeed if repeated.
    Retryable(E),
    /// Repeating the call cannot help; stop immediately.
    Fatal(E),
}

impl<E> CallError<E> {
    pub fn retryable(error: E) -> Self {
        CallError::Retryable(error)
    }

    pub fn fatal(error: E) -> Self {
        CallError::Fatal(error)
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, CallError::Retryable(_))
    }

    pub fn into_inner(self) -> E {
        match self {
            CallError::Retryable(e) | CallError::Fatal(e) => e,
        }
    }
}

impl<E> From<E> for CallError<E> {
    fn from(error: E) -> Self {
        CallError::Retryable(error)
    }
}

/// Why a single attempt did not produce an accepted value.
#[derive(Debug, Error)]
pub enum TransientFailure<E> {
    /// The call itself failed with a retryable error.
    #[error("{0}")]
    Call(E),

    /// The call succeeded but the validator rejected its result.
    #[error("response rejected: {0}")]
    Rejected(String),

    /// The attempt did not finish within its deadline.
    #[error("attempt timed out after {0:?}")]
    TimedOut(Duration),
}

impl<E> TransientFailure<E> {
    /// The error raised by the call, if that is what failed.
    pub fn error(&self) -> Option<&E> {
        match self {
            TransientFailure::Call(e) => Some(e),
            _ => None,
        }
    }

    /// The validator's reason, if the response was rejected.
    pub fn rejection_reason(&self) -> Option<&str> {
        match self {
            TransientFailure::Rejected(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Terminal failure of an execution.
#[derive(Debug, Error)]
pub enum ExecuteError<E> {
    /// Options were malformed; no attempt was made.
    #[error("invalid retry configuration: {0}")]
    InvalidConfiguration(String),

    /// The call signalled a fatal error.
    #[error("non-retryable failure on attempt {attempt}: {error}")]
    NonRetryable { attempt: u32, error: E },

    /// Every attempt failed or was rejected.
    #[error("retries exhausted after {attempts} attempts: {last}")]
    RetryExhausted {
        attempts: u32,
        last: TransientFailure<E>,
    },
}

impl<E> ExecuteError<E> {
    /// Number of attempts made before giving up.
    pub fn attempts(&self) -> u32 {
        match self {
            ExecuteError::InvalidConfiguration(_) => 0,
            ExecuteError::NonRetryable { attempt, .. } => *attempt,
            ExecuteError::RetryExhausted { attempts, .. } => *attempts,
        }
    }

    /// The last error raised by the call, if any.
    pub fn last_error(&self) -> Option<&E> {
        match self {
            ExecuteError::InvalidConfiguration(_) => None,
            ExecuteError::NonRetryable { error, .. } => Some(error),
            ExecuteError::RetryExhausted { last, .. } => last.error(),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, ExecuteError::RetryExhausted { .. })
    }

    pub fn is_non_retryable(&self) -> bool {
        matches!(self, ExecuteError::NonRetryable { .. })
    }
}
