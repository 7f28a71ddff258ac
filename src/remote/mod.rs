//! Remote service subsystem.
//!
//! # Data Flow
//! ```text
//! RemoteRequest (method, path, query, body)
//!     → service.rs (pick executor: full retries or single attempt)
//!     → resilience::RetryExecutor (attempt loop)
//!     → fetcher.rs (HTTP call, auth, status → ServiceError)
//!     → validators.rs (field checks on the opaque JSON response)
//! ```
//!
//! # Design Decisions
//! - Responses stay opaque `serde_json::Value`; callers decide what they need
//! - The fetch capability is a trait so tests and embedders can inject one
//! - Client errors (4xx except 408/429) are fatal; 5xx and network errors retry
//! - Requests that are not idempotent get exactly one attempt

pub mod fetcher;
pub mod registry;
pub mod service;
pub mod types;
pub mod validators;

pub use fetcher::{Auth, Fetcher, HttpFetcher};
pub use registry::ServiceRegistry;
pub use service::RemoteService;
pub use types::{HttpMethod, RemoteRequest, ServiceError};
