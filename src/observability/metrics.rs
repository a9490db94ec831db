//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (requests, latency, backend errors)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by operation, HTTP status
//! - `gateway_request_duration_seconds` (histogram): latency by operation
//! - `gateway_backend_errors_total` (counter): failed backend calls by operation, kind
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - Labels for operation, status code, error kind

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

pub const REQUESTS_TOTAL: &str = "gateway_requests_total";
pub const REQUEST_DURATION: &str = "gateway_request_duration_seconds";
pub const BACKEND_ERRORS_TOTAL: &str = "gateway_backend_errors_total";

/// Install the Prometheus recorder and its scrape listener on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    describe_counter!(REQUESTS_TOTAL, "Total number of gateway requests");
    describe_histogram!(
        REQUEST_DURATION,
        metrics::Unit::Seconds,
        "Gateway request duration in seconds"
    );
    describe_counter!(BACKEND_ERRORS_TOTAL, "Backend calls that failed");

    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record one finished request.
pub fn record_request(operation: &'static str, status: u16, started: Instant) {
    counter!(REQUESTS_TOTAL, "operation" => operation, "status" => status.to_string())
        .increment(1);
    histogram!(REQUEST_DURATION, "operation" => operation)
        .record(started.elapsed().as_secs_f64());
}

/// Record a failed backend call.
pub fn record_backend_error(operation: &'static str, kind: &'static str) {
    counter!(BACKEND_ERRORS_TOTAL, "operation" => operation, "kind" => kind).increment(1);
}
