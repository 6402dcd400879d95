//! Telemetry error types.

use thiserror::Error;

/// Errors that can occur while installing logging or metrics.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Failed to install the metrics recorder or exporter.
    #[error("Failed to initialize metrics: {0}")]
    MetricsInit(String),

    /// Failed to install the log subscriber.
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failed to parse an exporter address.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TelemetryError::MetricsInit("failed".to_string());
        assert_eq!(err.to_string(), "Failed to initialize metrics: failed");

        let err = TelemetryError::InvalidAddress("nope".to_string());
        assert_eq!(err.to_string(), "Invalid address: nope");
    }
}
