//! Root configuration type.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, HandlerConfig, LogFormat, LoggingConfig, MetricsConfig, ServerConfig};

/// Complete openproc configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to layer files and environment
/// variables over the defaults.
///
/// # Example
///
/// ```
/// use openproc_config::OpenprocConfig;
///
/// let config = OpenprocConfig::default();
/// assert_eq!(config.server.http_addr, "0.0.0.0:8080");
/// assert!(config.handler.max_body_size.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct OpenprocConfig {
    /// Request handling.
    #[serde(default)]
    pub handler: HandlerConfig,

    /// HTTP server.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Metrics.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl OpenprocConfig {
    /// Creates a configuration builder.
    #[must_use]
    pub fn builder() -> OpenprocConfigBuilder {
        OpenprocConfigBuilder::new()
    }

    /// Checks values serde cannot check.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for an unparsable address, a
    /// malformed `base_path`, a zero request timeout, an empty log level, or
    /// histogram buckets that are empty or not strictly increasing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.http_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::invalid_value(
                "server.http_addr",
                format!("invalid socket address: {}", self.server.http_addr),
            ));
        }

        if let Some(base) = &self.server.base_path {
            if !base.starts_with('/') || base.contains("//") {
                return Err(ConfigError::invalid_value(
                    "server.base_path",
                    format!("must start with a single '/': {base}"),
                ));
            }
        }

        if self.server.request_timeout_secs == Some(0) {
            return Err(ConfigError::invalid_value(
                "server.request_timeout_secs",
                "must be greater than zero; omit it to disable the timeout",
            ));
        }

        if self.logging.enabled && self.logging.level.trim().is_empty() {
            return Err(ConfigError::invalid_value("logging.level", "must not be empty"));
        }

        if self.metrics.enabled {
            if let Some(addr) = &self.metrics.addr {
                if addr.parse::<SocketAddr>().is_err() {
                    return Err(ConfigError::invalid_value(
                        "metrics.addr",
                        format!("invalid socket address: {addr}"),
                    ));
                }
            }

            let buckets = &self.metrics.histogram_buckets;
            if buckets.is_empty() || buckets.windows(2).any(|w| w[0] >= w[1]) {
                return Err(ConfigError::invalid_value(
                    "metrics.histogram_buckets",
                    "must be non-empty and strictly increasing",
                ));
            }
        }

        Ok(())
    }

    /// Local development preset: pretty debug logs with locations.
    ///
    /// # Example
    ///
    /// ```
    /// use openproc_config::{LogFormat, OpenprocConfig};
    ///
    /// let config = OpenprocConfig::development();
    /// assert_eq!(config.logging.format, LogFormat::Pretty);
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config.logging.ansi_enabled = true;
        config.logging.include_location = true;
        config
    }

    /// Production preset: JSON logs at `info` and a 1 MiB body limit.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.logging.level = "info".to_string();
        config.logging.format = LogFormat::Json;
        config.logging.ansi_enabled = false;
        config.handler.max_body_size = Some(1024 * 1024);
        config
    }

    /// Telemetry settings derived from the logging and metrics sections.
    #[must_use]
    pub fn telemetry(&self) -> openproc_telemetry::TelemetryConfig {
        openproc_telemetry::TelemetryConfig::builder()
            .logging(self.logging.to_log_config())
            .metrics(self.metrics.to_metrics_config())
            .build()
    }
}

/// Builder for [`OpenprocConfig`].
#[derive(Debug, Default)]
pub struct OpenprocConfigBuilder {
    handler: Option<HandlerConfig>,
    server: Option<ServerConfig>,
    logging: Option<LoggingConfig>,
    metrics: Option<MetricsConfig>,
}

impl OpenprocConfigBuilder {
    /// Creates a builder where every section is default.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the handler section.
    #[must_use]
    pub fn handler(mut self, handler: HandlerConfig) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Sets the server section.
    #[must_use]
    pub fn server(mut self, server: ServerConfig) -> Self {
        self.server = Some(server);
        self
    }

    /// Sets the logging section.
    #[must_use]
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Sets the metrics section.
    #[must_use]
    pub fn metrics(mut self, metrics: MetricsConfig) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> OpenprocConfig {
        OpenprocConfig {
            handler: self.handler.unwrap_or_default(),
            server: self.server.unwrap_or_default(),
            logging: self.logging.unwrap_or_default(),
            metrics: self.metrics.unwrap_or_default(),
        }
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if validation fails.
    pub fn build_validated(self) -> Result<OpenprocConfig, ConfigError> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(OpenprocConfig::default().validate().is_ok());
    }

    #[test]
    fn test_builder_keeps_other_defaults() {
        let config = OpenprocConfig::builder()
            .handler(HandlerConfig {
                max_body_size: Some(512),
            })
            .build();

        assert_eq!(config.handler.max_body_size, Some(512));
        assert_eq!(config.server, ServerConfig::default());
    }

    #[test]
    fn test_invalid_http_addr() {
        let result = OpenprocConfig::builder()
            .server(ServerConfig {
                http_addr: "localhost".to_string(),
                ..Default::default()
            })
            .build_validated();
        assert!(matches!(result, Err(ConfigError::InvalidValue { field, .. }) if field == "server.http_addr"));
    }

    #[test]
    fn test_invalid_base_path() {
        for base in ["api", "//api"] {
            let config = OpenprocConfig::builder()
                .server(ServerConfig {
                    base_path: Some(base.to_string()),
                    ..Default::default()
                })
                .build();
            assert!(config.validate().is_err(), "{base} should be rejected");
        }
    }

    #[test]
    fn test_zero_request_timeout_rejected() {
        let config = OpenprocConfig::builder()
            .server(ServerConfig {
                request_timeout_secs: Some(0),
                ..Default::default()
            })
            .build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unsorted_buckets_rejected() {
        let config = OpenprocConfig::builder()
            .metrics(MetricsConfig {
                histogram_buckets: vec![0.5, 0.1],
                ..Default::default()
            })
            .build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_disabled_metrics_skip_checks() {
        let config = OpenprocConfig::builder()
            .metrics(MetricsConfig {
                enabled: false,
                addr: Some("nowhere".to_string()),
                histogram_buckets: Vec::new(),
            })
            .build();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets() {
        let dev = OpenprocConfig::development();
        assert!(dev.logging.ansi_enabled);
        assert!(dev.validate().is_ok());

        let prod = OpenprocConfig::production();
        assert_eq!(prod.logging.format, LogFormat::Json);
        assert_eq!(prod.handler.max_body_size, Some(1024 * 1024));
    }

    #[test]
    fn test_telemetry_conversion() {
        let telemetry = OpenprocConfig::development().telemetry();
        assert!(!telemetry.logging.json_format);
        assert_eq!(telemetry.logging.level, "debug");
        assert!(telemetry.metrics.enabled);
    }
}
