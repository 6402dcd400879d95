//! Logging and metrics for openproc.
//!
//! - **Logging**: structured JSON or pretty logs via `tracing-subscriber`
//! - **Metrics**: Prometheus-format metrics via the `metrics` crate
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `openproc_requests_total` | Counter | `procedure`, `status` | Total request count |
//! | `openproc_request_duration_seconds` | Histogram | `procedure` | Request latency |
//! | `openproc_validation_failures_total` | Counter | `procedure` | Rejected inputs |
//! | `openproc_in_flight_requests` | Gauge | - | Requests being handled |
//!
//! # Example
//!
//! ```rust,ignore
//! use openproc_telemetry::{init_telemetry, TelemetryConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = TelemetryConfig::builder()
//!         .log_level("info,openproc_server=debug")
//!         .metrics_addr("0.0.0.0:9090")
//!         .build();
//!
//!     init_telemetry(&config).expect("telemetry");
//! }
//! ```
//!
//! # Scrape Output
//!
//! ```text
//! # TYPE openproc_requests_total counter
//! openproc_requests_total{procedure="getUser",status="200"} 1234
//! openproc_requests_total{procedure="getUser",status="404"} 56
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;

pub use config::{TelemetryConfig, TelemetryConfigBuilder};
pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig};
pub use self::metrics::{init_metrics, render_metrics, InFlightGuard, MetricsConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Installs logging, then metrics.
///
/// # Errors
///
/// Returns `TelemetryError` if either subsystem fails to install.
pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryResult<()> {
    init_logging(&config.logging)?;
    init_metrics(&config.metrics)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_with_everything_disabled() {
        let mut config = TelemetryConfig::builder().disable_metrics().build();
        config.logging.enabled = false;
        assert!(init_telemetry(&config).is_ok());
    }
}
