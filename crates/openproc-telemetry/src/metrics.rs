//! Prometheus metrics for openproc.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `openproc_requests_total` | Counter | `procedure`, `status` | Total requests |
//! | `openproc_request_duration_seconds` | Histogram | `procedure` | Request latency |
//! | `openproc_validation_failures_total` | Counter | `procedure` | Input validation failures |
//! | `openproc_in_flight_requests` | Gauge | - | Requests being handled |
//! | `openproc_hook_panics_total` | Counter | - | Error hooks that panicked |
//!
//! Requests that match no route are recorded under the procedure label
//! [`UNMATCHED_PROCEDURE`].
//!
//! Recording without an installed recorder is a no-op, so handlers can
//! record unconditionally.

use crate::error::TelemetryError;
use crate::TelemetryResult;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Duration;

/// Request counter.
pub const REQUESTS_TOTAL: &str = "openproc_requests_total";

/// Request latency histogram.
pub const REQUEST_DURATION_SECONDS: &str = "openproc_request_duration_seconds";

/// Validation failure counter.
pub const VALIDATION_FAILURES_TOTAL: &str = "openproc_validation_failures_total";

/// In-flight request gauge.
pub const IN_FLIGHT_REQUESTS: &str = "openproc_in_flight_requests";

/// Error hook panic counter.
pub const HOOK_PANICS_TOTAL: &str = "openproc_hook_panics_total";

/// Procedure label used when no route matched.
pub const UNMATCHED_PROCEDURE: &str = "_unmatched";

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsConfig {
    /// Whether metrics are recorded.
    pub enabled: bool,

    /// Address for the Prometheus scrape listener (e.g., "0.0.0.0:9090").
    /// Without one the recorder is installed and [`render_metrics`] serves
    /// the text format.
    pub addr: Option<String>,

    /// Histogram buckets for request duration, in seconds.
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            addr: None,
            duration_buckets: vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ],
        }
    }
}

/// Installs the Prometheus recorder.
///
/// With an `addr` the exporter's scrape listener is spawned on the current
/// tokio runtime.
///
/// # Errors
///
/// Returns `TelemetryError::InvalidAddress` for an unparsable address and
/// `TelemetryError::MetricsInit` if a recorder is already installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(REQUEST_DURATION_SECONDS.to_string()),
            &config.duration_buckets,
        )
        .map_err(|e| TelemetryError::InvalidConfig(e.to_string()))?;

    match &config.addr {
        Some(addr) => {
            let addr: SocketAddr = addr
                .parse()
                .map_err(|e| TelemetryError::InvalidAddress(format!("{addr}: {e}")))?;
            builder
                .with_http_listener(addr)
                .install()
                .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
            tracing::info!(%addr, "prometheus exporter listening");
        }
        None => {
            let handle = builder
                .install_recorder()
                .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
            let _ = METRICS_HANDLE.set(handle);
        }
    }

    register_metric_descriptions();
    Ok(())
}

/// Renders metrics in Prometheus text format.
///
/// Returns `None` unless [`init_metrics`] installed a recorder without a
/// listener.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

fn register_metric_descriptions() {
    describe_counter!(REQUESTS_TOTAL, "Total number of requests handled");
    describe_histogram!(
        REQUEST_DURATION_SECONDS,
        metrics::Unit::Seconds,
        "Request duration in seconds"
    );
    describe_counter!(
        VALIDATION_FAILURES_TOTAL,
        "Requests rejected by input schema validation"
    );
    describe_gauge!(IN_FLIGHT_REQUESTS, "Requests currently being handled");
    describe_counter!(HOOK_PANICS_TOTAL, "Error hook invocations that panicked");
}

/// Records a completed request.
pub fn record_request(procedure: &str, status_code: u16, duration: Duration) {
    counter!(
        REQUESTS_TOTAL,
        "procedure" => procedure.to_string(),
        "status" => status_code.to_string()
    )
    .increment(1);

    histogram!(
        REQUEST_DURATION_SECONDS,
        "procedure" => procedure.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Records an input validation failure.
pub fn record_validation_failure(procedure: &str) {
    counter!(
        VALIDATION_FAILURES_TOTAL,
        "procedure" => procedure.to_string()
    )
    .increment(1);
}

/// Records a panic caught inside the error hook.
pub fn record_hook_panic() {
    counter!(HOOK_PANICS_TOTAL).increment(1);
}

/// Guard that keeps the in-flight gauge accurate, even when the request
/// future is dropped mid-flight.
#[derive(Debug)]
pub struct InFlightGuard {
    _private: (),
}

impl InFlightGuard {
    /// Increments the in-flight gauge until the guard is dropped.
    #[must_use]
    pub fn new() -> Self {
        gauge!(IN_FLIGHT_REQUESTS).increment(1.0);
        Self { _private: () }
    }
}

impl Default for InFlightGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        gauge!(IN_FLIGHT_REQUESTS).decrement(1.0);
    }
}
