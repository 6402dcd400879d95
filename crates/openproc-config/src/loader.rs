//! Layered configuration loading.
//!
//! Layers apply in order, later ones winning key by key:
//! 1. Defaults (or a preset)
//! 2. Configuration files or strings (TOML or JSON)
//! 3. Environment variables (`PREFIX__SECTION__KEY`)

use std::env;
use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::{ConfigError, LogFormat, OpenprocConfig};

/// Default environment variable prefix.
pub const DEFAULT_ENV_PREFIX: &str = "OPENPROC";

/// Configuration loader.
///
/// # Example
///
/// ```no_run
/// use openproc_config::ConfigLoader;
///
/// # fn main() -> Result<(), openproc_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_defaults()
///     .with_optional_file("openproc.toml")?
///     .with_env_prefix("OPENPROC")
///     .load()?;
///
/// println!("listening on {}", config.server.http_addr);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: OpenprocConfig,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a loader holding the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: OpenprocConfig::default(),
            env_prefix: None,
        }
    }

    /// Resets to the default configuration.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = OpenprocConfig::default();
        self
    }

    /// Starts from the development preset.
    ///
    /// # Example
    ///
    /// ```
    /// use openproc_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new().with_development().load().unwrap();
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = OpenprocConfig::development();
        self
    }

    /// Starts from the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = OpenprocConfig::production();
        self
    }

    /// Layers a file over the current configuration.
    ///
    /// The format follows the extension (`.toml` or `.json`). Keys the file
    /// does not mention keep their current value.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing or unreadable, has an
    /// unsupported extension, or does not parse (unknown keys included).
    pub fn with_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .ok_or_else(|| ConfigError::UnsupportedFormat(path.display().to_string()))?;

        self.with_string(&content, &format)
    }

    /// Layers a file if it exists.
    ///
    /// # Errors
    ///
    /// Same as [`with_file`](Self::with_file) when the file exists.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Layers configuration text in the given format (`"toml"` or `"json"`).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for an unsupported format or a parse failure.
    ///
    /// # Example
    ///
    /// ```
    /// use openproc_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string("[handler]\nmax_body_size = 4096", "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.handler.max_body_size, Some(4096));
    /// assert_eq!(config.server.http_addr, "0.0.0.0:8080");
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        let overlay: Value = match format.to_lowercase().as_str() {
            "toml" => {
                // Strict pass first so unknown keys report with TOML positions.
                toml::from_str::<OpenprocConfig>(content)?;
                toml::from_str(content)?
            }
            "json" => {
                serde_json::from_str::<OpenprocConfig>(content)?;
                serde_json::from_str(content)?
            }
            other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
        };

        let mut merged = serde_json::to_value(&self.config)?;
        merge_values(&mut merged, overlay);
        self.config = serde_json::from_value(merged)?;
        Ok(self)
    }

    /// Applies `PREFIX__SECTION__KEY` environment overrides on load.
    ///
    /// For example, with prefix `OPENPROC`:
    /// - `OPENPROC__SERVER__HTTP_ADDR=0.0.0.0:9000`
    /// - `OPENPROC__HANDLER__MAX_BODY_SIZE=none`
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Applies environment overrides and validates.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an override does not parse or validation
    /// fails.
    pub fn load(self) -> Result<OpenprocConfig, ConfigError> {
        self.load_from_vars(env::vars())
    }

    /// Returns the configuration without overrides or validation.
    #[must_use]
    pub fn load_unvalidated(self) -> OpenprocConfig {
        self.config
    }

    fn load_from_vars<I>(mut self, vars: I) -> Result<OpenprocConfig, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        if let Some(prefix) = self.env_prefix.take() {
            let marker = format!("{prefix}__");
            for (key, value) in vars.into_iter().filter(|(k, _)| k.starts_with(&marker)) {
                self.apply_env_var(&key, &value, &marker)?;
            }
        }

        self.config.validate()?;
        Ok(self.config)
    }

    fn apply_env_var(&mut self, key: &str, value: &str, marker: &str) -> Result<(), ConfigError> {
        let path = key
            .strip_prefix(marker)
            .ok_or_else(|| ConfigError::env_parse_error(key, "invalid key format"))?;
        let parts: Vec<&str> = path.split("__").collect();

        match parts.as_slice() {
            ["HANDLER", "MAX_BODY_SIZE"] => {
                self.config.handler.max_body_size = parse_optional(key, value, "integer")?;
            }

            ["SERVER", "HTTP_ADDR"] => {
                self.config.server.http_addr = value.to_string();
            }
            ["SERVER", "BASE_PATH"] => {
                self.config.server.base_path = optional_string(value);
            }
            ["SERVER", "REQUEST_TIMEOUT_SECS"] => {
                self.config.server.request_timeout_secs = parse_optional(key, value, "integer")?;
            }
            ["SERVER", "SHUTDOWN_TIMEOUT_SECS"] => {
                self.config.server.shutdown_timeout_secs = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))?;
            }

            ["LOGGING", "ENABLED"] => {
                self.config.logging.enabled = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }
            ["LOGGING", "LEVEL"] => {
                self.config.logging.level = value.to_string();
            }
            ["LOGGING", "FORMAT"] => {
                self.config.logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'json' or 'pretty'",
                        ))
                    }
                };
            }
            ["LOGGING", "ANSI_ENABLED"] => {
                self.config.logging.ansi_enabled = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }
            ["LOGGING", "INCLUDE_LOCATION"] => {
                self.config.logging.include_location = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }

            ["METRICS", "ENABLED"] => {
                self.config.metrics.enabled = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }
            ["METRICS", "ADDR"] => {
                self.config.metrics.addr = optional_string(value);
            }
            ["METRICS", "HISTOGRAM_BUCKETS"] => {
                self.config.metrics.histogram_buckets = value
                    .split(',')
                    .map(|b| b.trim().parse::<f64>())
                    .collect::<Result<_, _>>()
                    .map_err(|_| {
                        ConfigError::env_parse_error(key, "expected comma-separated numbers")
                    })?;
            }

            _ => {
                return Err(ConfigError::env_parse_error(key, "unknown configuration key"));
            }
        }

        Ok(())
    }
}

/// Recursively overlays `overlay` onto `base`; objects merge, anything else
/// replaces.
fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => merge_values(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn optional_string(value: &str) -> Option<String> {
    if value.is_empty() || value.eq_ignore_ascii_case("none") {
        None
    } else {
        Some(value.to_string())
    }
}

fn parse_optional<T: std::str::FromStr>(
    key: &str,
    value: &str,
    expected: &str,
) -> Result<Option<T>, ConfigError> {
    match optional_string(value) {
        None => Ok(None),
        Some(v) => v
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::env_parse_error(key, format!("expected {expected} or 'none'"))),
    }
}
