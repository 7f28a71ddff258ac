//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Resilient calls produce:
//!     → logging.rs (structured log events, one span per execution)
//!     → metrics.rs (attempt counters, backoff and duration histograms)
//!
//! Consumers:
//!     → stderr (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape), when enabled
//! ```
//!
//! # Design Decisions
//! - Logs go to stderr so command output on stdout stays machine-readable
//! - Operation ID flows through every event of one execution
//! - Metrics are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
