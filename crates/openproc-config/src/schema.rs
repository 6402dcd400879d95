//! Configuration sections.
//!
//! Every section rejects unknown keys and fills missing keys with defaults,
//! so a file only needs to name what it changes.

use serde::{Deserialize, Serialize};

/// Request handling section.
///
/// # Example
///
/// ```
/// use openproc_config::HandlerConfig;
///
/// let config: HandlerConfig = toml::from_str("max_body_size = 1048576").unwrap();
/// assert_eq!(config.max_body_size, Some(1_048_576));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct HandlerConfig {
    /// Largest accepted request body in bytes. `None` means unlimited.
    #[serde(default)]
    pub max_body_size: Option<usize>,
}

/// HTTP server section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_http_addr")]
    pub http_addr: String,

    /// Prefix every route is mounted under (e.g., "/api").
    #[serde(default)]
    pub base_path: Option<String>,

    /// Per-request timeout in seconds. `None` disables it.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: Option<u64>,

    /// How long shutdown waits for open connections, in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            base_path: None,
            request_timeout_secs: default_request_timeout(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

fn default_http_addr() -> String {
    "0.0.0.0:8080".to_string()
}

#[allow(clippy::unnecessary_wraps)]
fn default_request_timeout() -> Option<u64> {
    Some(30)
}

fn default_shutdown_timeout() -> u64 {
    30
}

/// Log format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON lines (production).
    #[default]
    Json,
    /// Human-readable multi-line output (development).
    Pretty,
}

/// Logging section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive (e.g., "info" or "warn,openproc_server=debug").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Emit ANSI colors (pretty format only).
    #[serde(default)]
    pub ansi_enabled: bool,

    /// Include source file and line.
    #[serde(default)]
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            ansi_enabled: false,
            include_location: false,
        }
    }
}

impl LoggingConfig {
    /// Converts the section into the subscriber settings used by
    /// [`openproc_telemetry::init_logging`].
    #[must_use]
    pub fn to_log_config(&self) -> openproc_telemetry::LogConfig {
        let base = match self.format {
            LogFormat::Json => openproc_telemetry::LogConfig::production(),
            LogFormat::Pretty => openproc_telemetry::LogConfig::development(),
        };
        openproc_telemetry::LogConfig {
            enabled: self.enabled,
            level: self.level.clone(),
            json_format: self.format == LogFormat::Json,
            file_line_info: self.include_location,
            ansi: self.ansi_enabled,
            ..base
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Metrics section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Record metrics.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Prometheus scrape listener address. Without one, metrics are only
    /// available through `render_metrics`.
    #[serde(default)]
    pub addr: Option<String>,

    /// Request duration histogram buckets, in seconds.
    #[serde(default = "default_histogram_buckets")]
    pub histogram_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            addr: None,
            histogram_buckets: default_histogram_buckets(),
        }
    }
}

impl MetricsConfig {
    /// Converts the section into the recorder settings used by
    /// [`openproc_telemetry::init_metrics`].
    #[must_use]
    pub fn to_metrics_config(&self) -> openproc_telemetry::MetricsConfig {
        openproc_telemetry::MetricsConfig {
            enabled: self.enabled,
            addr: self.addr.clone(),
            duration_buckets: self.histogram_buckets.clone(),
        }
    }
}

fn default_histogram_buckets() -> Vec<f64> {
    openproc_telemetry::MetricsConfig::default().duration_buckets
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr, "0.0.0.0:8080");
        assert_eq!(config.base_path, None);
        assert_eq!(config.request_timeout_secs, Some(30));
        assert_eq!(config.shutdown_timeout_secs, 30);
    }

    #[test]
    fn test_server_config_deserialize() {
        let toml = r#"
            http_addr = "127.0.0.1:3000"
            base_path = "/api"
        "#;
        let config: ServerConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.http_addr, "127.0.0.1:3000");
        assert_eq!(config.base_path.as_deref(), Some("/api"));
        assert_eq!(config.shutdown_timeout_secs, 30);
    }

    #[test]
    fn test_server_config_unknown_field_rejected() {
        let toml = r#"
            http_addr = "127.0.0.1:3000"
            max_connections = 10
        "#;
        let result: Result<ServerConfig, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_handler_config_default_is_unlimited() {
        assert_eq!(HandlerConfig::default().max_body_size, None);
    }

    #[test]
    fn test_log_format_deserialize() {
        let format: LogFormat = serde_json::from_str(r#""pretty""#).unwrap();
        assert_eq!(format, LogFormat::Pretty);
        assert!(serde_json::from_str::<LogFormat>(r#""xml""#).is_err());
    }

    #[test]
    fn test_logging_to_log_config() {
        let section = LoggingConfig {
            level: "debug".to_string(),
            format: LogFormat::Pretty,
            ansi_enabled: true,
            include_location: true,
            ..Default::default()
        };
        let log = section.to_log_config();
        assert_eq!(log.level, "debug");
        assert!(!log.json_format);
        assert!(log.ansi);
        assert!(log.file_line_info);
    }

    #[test]
    fn test_metrics_to_metrics_config() {
        let section = MetricsConfig {
            addr: Some("127.0.0.1:9100".to_string()),
            ..Default::default()
        };
        let metrics = section.to_metrics_config();
        assert!(metrics.enabled);
        assert_eq!(metrics.addr.as_deref(), Some("127.0.0.1:9100"));
        assert_eq!(metrics.duration_buckets, section.histogram_buckets);
    }
}
