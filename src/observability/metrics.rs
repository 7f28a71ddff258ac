//! Metrics collection and exposition.
//!
//! # Metrics
//! - `agrismart_call_attempts_total` (counter): attempts by operation, outcome
//! - `agrismart_backoff_seconds` (histogram): delay applied before a retry
//! - `agrismart_call_duration_seconds` (histogram): total execution time by
//!   operation and terminal result

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Count one finished attempt.
pub fn record_attempt(operation: &str, outcome: &'static str) {
    metrics::counter!(
        "agrismart_call_attempts_total",
        "operation" => operation.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record the delay applied before a retry.
pub fn record_backoff(operation: &str, delay: Duration) {
    metrics::histogram!("agrismart_backoff_seconds", "operation" => operation.to_string())
        .record(delay.as_secs_f64());
}

/// Record the terminal result of an execution.
pub fn record_outcome(operation: &str, result: &'static str, attempts: u32, elapsed: Duration) {
    metrics::histogram!(
        "agrismart_call_duration_seconds",
        "operation" => operation.to_string(),
        "result" => result
    )
    .record(elapsed.as_secs_f64());

    tracing::trace!(operation, result, attempts, "Execution finished");
}
