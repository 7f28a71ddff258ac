//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to a remote service:
//!     → executor.rs (attempt loop, validation, outcome)
//!     → timeouts.rs (optional per-attempt deadline)
//!     → On failure: retries.rs (classify retryable vs fatal)
//!     → backoff.rs (exponential delay before the next attempt)
//! ```
//!
//! # Design Decisions
//! - One executor per logical request; no state survives between executions
//! - Rejected responses are retried exactly like failed calls
//! - Fatal errors short-circuit the remaining attempts
//! - Dropping the execution future drops any pending timer

pub mod backoff;
pub mod executor;
pub mod retries;
pub mod timeouts;

pub use executor::{AttemptOutcome, AttemptRecord, RetryExecutor, RetryOptions, Validation};
pub use retries::{CallError, ExecuteError, TransientFailure};
