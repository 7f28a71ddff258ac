//! Resilient call executor.
//!
//! # Responsibilities
//! - Invoke a caller-supplied async call up to `max_attempts` times
//! - Validate successful results before accepting them
//! - Sleep with exponential backoff between failed attempts
//! - Report exactly one outcome per execution
//!
//! # Design Decisions
//! - The executor holds no per-execution state; it can be cloned and shared
//! - Attempt records are emitted (observer, tracing, metrics), never stored
//! - Delays are exact (`base * 2^(attempt-1)`), no cap and no jitter
//! - No delay after the final attempt

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::observability::metrics;
use crate::resilience::backoff::calculate_backoff;
use crate::resilience::retries::{CallError, ExecuteError, TransientFailure};
use crate::resilience::timeouts::with_deadline;

/// Verdict of a response validator: `Err` carries the rejection reason.
pub type Validation = Result<(), String>;

/// Retry options for one execution.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryOptions {
    /// Maximum number of attempts, including the first one.
    pub max_attempts: u32,

    /// Delay after the first failed attempt, in milliseconds. Doubles after
    /// every further failure.
    pub base_delay_ms: u64,

    /// Optional deadline for each individual attempt, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt_timeout_ms: Option<u64>,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            attempt_timeout_ms: None,
        }
    }
}

impl RetryOptions {
    /// Check the options before any attempt is made.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts < 1 {
            return Err(format!(
                "max_attempts must be at least 1 (got {})",
                self.max_attempts
            ));
        }
        if self.attempt_timeout_ms == Some(0) {
            return Err("attempt_timeout_ms must be greater than 0".to_string());
        }
        Ok(())
    }

    pub fn attempt_timeout(&self) -> Option<Duration> {
        self.attempt_timeout_ms.map(Duration::from_millis)
    }
}

/// How a single attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Succeeded,
    Failed,
    Rejected,
    TimedOut,
    Fatal,
}

impl AttemptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptOutcome::Succeeded => "succeeded",
            AttemptOutcome::Failed => "failed",
            AttemptOutcome::Rejected => "rejected",
            AttemptOutcome::TimedOut => "timed_out",
            AttemptOutcome::Fatal => "fatal",
        }
    }
}

impl<E> From<&TransientFailure<E>> for AttemptOutcome {
    fn from(failure: &TransientFailure<E>) -> Self {
        match failure {
            TransientFailure::Call(_) => AttemptOutcome::Failed,
            TransientFailure::Rejected(_) => AttemptOutcome::Rejected,
            TransientFailure::TimedOut(_) => AttemptOutcome::TimedOut,
        }
    }
}

/// Record of one attempt, handed to the observer as soon as it ends.
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    /// 1-based attempt index.
    pub attempt: u32,
    pub started_at: Instant,
    pub elapsed: Duration,
    pub outcome: AttemptOutcome,
    /// Error or rejection reason for unsuccessful attempts.
    pub detail: Option<String>,
    /// Delay applied before the next attempt; `None` when no attempt follows.
    pub next_delay: Option<Duration>,
}

type AttemptObserver = Arc<dyn Fn(&AttemptRecord) + Send + Sync>;

/// Executes remote calls with bounded retries and exponential backoff.
#[derive(Clone, Default)]
pub struct RetryExecutor {
    options: RetryOptions,
    observer: Option<AttemptObserver>,
}

impl RetryExecutor {
    pub fn new(options: RetryOptions) -> Self {
        Self {
            options,
            observer: None,
        }
    }

    /// Register a callback invoked after every attempt.
    pub fn with_observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(&AttemptRecord) + Send + Sync + 'static,
    {
        self.observer = Some(Arc::new(observer));
        self
    }

    pub fn options(&self) -> &RetryOptions {
        &self.options
    }

    /// A copy of this executor limited to a single attempt.
    ///
    /// Used for calls that are not safe to repeat.
    pub fn single_attempt(&self) -> Self {
        let mut executor = self.clone();
        executor.options.max_attempts = executor.options.max_attempts.min(1);
        executor
    }

    /// Execute `call`, accepting every successful result.
    pub async fn execute<T, E, F, Fut>(&self, operation: &str, call: F) -> Result<T, ExecuteError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CallError<E>>>,
        E: fmt::Display,
    {
        self.execute_validated(operation, call, |_: &T| Ok(())).await
    }

    /// Execute `call`, accepting only results that pass `validate`.
    ///
    /// A rejected result is retried exactly like a failed call. The
    /// `operation` label shows up in logs and metrics.
    pub async fn execute_validated<T, E, F, Fut, V>(
        &self,
        operation: &str,
        mut call: F,
        validate: V,
    ) -> Result<T, ExecuteError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CallError<E>>>,
        V: Fn(&T) -> Validation,
        E: fmt::Display,
    {
        if let Err(reason) = self.options.validate() {
            tracing::error!(operation, reason = %reason, "Refusing to execute with invalid retry options");
            return Err(ExecuteError::InvalidConfiguration(reason));
        }

        let operation_id = Uuid::new_v4();
        let span = tracing::debug_span!("resilient_call", operation, %operation_id);

        async {
            let max_attempts = self.options.max_attempts;
            let deadline = self.options.attempt_timeout();
            let started = Instant::now();
            let mut attempt = 1u32;

            loop {
                let attempt_started = Instant::now();

                let failure = match with_deadline(call(), deadline).await {
                    Ok(Ok(value)) => match validate(&value) {
                        Ok(()) => {
                            self.observe(operation, attempt, attempt_started, AttemptOutcome::Succeeded, None, None);
                            tracing::debug!(attempt, elapsed = ?started.elapsed(), "Call succeeded");
                            metrics::record_outcome(operation, "success", attempt, started.elapsed());
                            return Ok(value);
                        }
                        Err(reason) => TransientFailure::Rejected(reason),
                    },
                    Ok(Err(CallError::Fatal(error))) => {
                        self.observe(
                            operation,
                            attempt,
                            attempt_started,
                            AttemptOutcome::Fatal,
                            Some(error.to_string()),
                            None,
                        );
                        tracing::error!(attempt, error = %error, "Call failed with non-retryable error");
                        metrics::record_outcome(operation, "non_retryable", attempt, started.elapsed());
                        return Err(ExecuteError::NonRetryable { attempt, error });
                    }
                    Ok(Err(CallError::Retryable(error))) => TransientFailure::Call(error),
                    Err(limit) => TransientFailure::TimedOut(limit),
                };

                let outcome = AttemptOutcome::from(&failure);

                if attempt >= max_attempts {
                    self.observe(operation, attempt, attempt_started, outcome, Some(failure.to_string()), None);
                    tracing::error!(attempts = attempt, error = %failure, "Retries exhausted");
                    metrics::record_outcome(operation, "exhausted", attempt, started.elapsed());
                    return Err(ExecuteError::RetryExhausted {
                        attempts: attempt,
                        last: failure,
                    });
                }

                let delay = calculate_backoff(attempt, self.options.base_delay_ms);
                self.observe(
                    operation,
                    attempt,
                    attempt_started,
                    outcome,
                    Some(failure.to_string()),
                    Some(delay),
                );
                tracing::warn!(
                    attempt,
                    max_attempts,
                    delay = ?delay,
                    error = %failure,
                    "Attempt failed, retrying"
                );
                metrics::record_backoff(operation, delay);

                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
        .instrument(span)
        .await
    }

    fn observe(
        &self,
        operation: &str,
        attempt: u32,
        started_at: Instant,
        outcome: AttemptOutcome,
        detail: Option<String>,
        next_delay: Option<Duration>,
    ) {
        metrics::record_attempt(operation, outcome.as_str());

        if let Some(observer) = &self.observer {
            observer(&AttemptRecord {
                attempt,
                started_at,
                elapsed: started_at.elapsed(),
                outcome,
                detail,
                next_delay,
            });
        }
    }
}

impl fmt::Debug for RetryExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryExecutor")
            .field("options", &self.options)
            .field("observer", &self.observer.as_ref().map(|_| "<observer>"))
            .finish()
    }
}
