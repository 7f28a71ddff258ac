//! AgriSmart remote-call library.
//!
//! Calls to the weather provider, the crop/fertilizer inference endpoint and
//! the LLM chat-completion API all go through one resilient executor with
//! bounded retries, exponential backoff and response validation. Leaf photos
//! are reduced to a few pixel features before they are described to the LLM.

pub mod analysis;
pub mod config;
pub mod observability;
pub mod remote;
pub mod resilience;

pub use config::AppConfig;
pub use remote::{RemoteRequest, RemoteService, ServiceError, ServiceRegistry};
pub use resilience::{CallError, ExecuteError, RetryExecutor, RetryOptions};
