//! Metrics collection and exposition.
//!
//! # Metrics
//! - `dispatch_requests_total` (counter): dispatches by method, status
//! - `dispatch_duration_seconds` (histogram): time from receipt to response
//! - `dispatch_aborts_total` (counter): aborted dispatches by status
//! - `listener_failures_total` (counter): failed or panicked listeners by event
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; without an installed recorder
//!   every call is a no-op, so library users and tests pay nothing
//! - The Prometheus exporter is opt-in from the binary

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and serve `/metrics` on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    metrics::describe_counter!("dispatch_requests_total", "Dispatched requests by method and status");
    metrics::describe_histogram!(
        "dispatch_duration_seconds",
        metrics::Unit::Seconds,
        "Time spent dispatching a request"
    );
    metrics::describe_counter!("dispatch_aborts_total", "Aborted dispatches by status");
    metrics::describe_counter!("listener_failures_total", "Listener failures by event");
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_dispatch(method: &str, status: u16, elapsed: Duration) {
    metrics::counter!(
        "dispatch_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("dispatch_duration_seconds").record(elapsed.as_secs_f64());
}

pub fn record_abort(status: u16) {
    metrics::counter!("dispatch_aborts_total", "status" => status.to_string()).increment(1);
}

pub fn record_listener_failure(event: &str) {
    metrics::counter!("listener_failures_total", "event" => event.to_string()).increment(1);
}
