//! Typed, layered configuration for openproc.
//!
//! - TOML and JSON files
//! - Environment variable overrides
//! - Strict parsing (unknown keys fail)
//! - Layering: defaults → file → env
//!
//! # Example
//!
//! ```no_run
//! use openproc_config::{ConfigLoader, OpenprocConfig};
//!
//! # fn main() -> Result<(), openproc_config::ConfigError> {
//! let config: OpenprocConfig = ConfigLoader::new()
//!     .with_optional_file("openproc.toml")?
//!     .with_env_prefix("OPENPROC")
//!     .load()?;
//!
//! openproc_telemetry::init_telemetry(&config.telemetry()).ok();
//! # Ok(())
//! # }
//! ```
//!
//! # File Format
//!
//! ```toml
//! [handler]
//! max_body_size = 1048576
//!
//! [server]
//! http_addr = "0.0.0.0:8080"
//! base_path = "/api"
//! request_timeout_secs = 30
//! shutdown_timeout_secs = 30
//!
//! [logging]
//! level = "info"
//! format = "json"
//!
//! [metrics]
//! enabled = true
//! addr = "0.0.0.0:9090"
//! ```
//!
//! # Environment Overrides
//!
//! Keys use the form `PREFIX__SECTION__KEY`; `none` clears optional values:
//!
//! - `OPENPROC__SERVER__HTTP_ADDR=0.0.0.0:9000`
//! - `OPENPROC__HANDLER__MAX_BODY_SIZE=none`
//! - `OPENPROC__METRICS__ENABLED=false`

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::{OpenprocConfig, OpenprocConfigBuilder};
pub use error::ConfigError;
pub use loader::{ConfigLoader, DEFAULT_ENV_PREFIX};
pub use schema::{HandlerConfig, LogFormat, LoggingConfig, MetricsConfig, ServerConfig};
