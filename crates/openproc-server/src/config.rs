//! Server configuration.
//!
//! # Example
//!
//! ```rust
//! use openproc_server::ServerConfig;
//! use std::time::Duration;
//!
//! let config = ServerConfig::builder()
//!     .http_addr("127.0.0.1:3000")
//!     .base_path("/api/")
//!     .request_timeout(Some(Duration::from_secs(10)))
//!     .build();
//!
//! assert_eq!(config.http_addr(), "127.0.0.1:3000");
//! assert_eq!(config.base_path(), Some("/api"));
//! ```

use std::net::SocketAddr;
use std::time::Duration;

/// Default HTTP bind address.
pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:8080";

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Settings for the hyper adapter.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    http_addr: String,
    base_path: Option<String>,
    request_timeout: Option<Duration>,
    shutdown_timeout: Duration,
}

impl ServerConfig {
    /// Creates a configuration builder.
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Returns the bind address.
    #[must_use]
    pub fn http_addr(&self) -> &str {
        &self.http_addr
    }

    /// Parses the bind address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be parsed.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.http_addr.parse()
    }

    /// Returns the normalized mount prefix, without a trailing slash.
    #[must_use]
    pub fn base_path(&self) -> Option<&str> {
        self.base_path.as_deref()
    }

    /// Returns the per-request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }

    /// Returns how long shutdown waits for open connections.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug, Clone)]
pub struct ServerConfigBuilder {
    http_addr: String,
    base_path: Option<String>,
    request_timeout: Option<Duration>,
    shutdown_timeout: Duration,
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        Self {
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
            base_path: None,
            request_timeout: Some(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)),
            shutdown_timeout: Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
        }
    }
}

impl ServerConfigBuilder {
    /// Creates a builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the bind address.
    #[must_use]
    pub fn http_addr(mut self, addr: impl Into<String>) -> Self {
        self.http_addr = addr.into();
        self
    }

    /// Mounts every route under `prefix`.
    ///
    /// Slashes are normalized: `"api/"`, `"/api"` and `"//api//"` all mount
    /// at `/api`. An empty or `/` prefix mounts at the root.
    #[must_use]
    pub fn base_path(mut self, prefix: impl AsRef<str>) -> Self {
        let segments: Vec<&str> = prefix
            .as_ref()
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();
        self.base_path = if segments.is_empty() {
            None
        } else {
            Some(format!("/{}", segments.join("/")))
        };
        self
    }

    /// Sets the per-request timeout. `None` disables it.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets how long shutdown waits for open connections.
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> ServerConfig {
        ServerConfig {
            http_addr: self.http_addr,
            base_path: self.base_path,
            request_timeout: self.request_timeout,
            shutdown_timeout: self.shutdown_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr(), DEFAULT_HTTP_ADDR);
        assert_eq!(config.base_path(), None);
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_socket_addr() {
        let config = ServerConfig::builder().http_addr("127.0.0.1:8080").build();
        assert_eq!(config.socket_addr().unwrap().port(), 8080);

        let config = ServerConfig::builder().http_addr("nope").build();
        assert!(config.socket_addr().is_err());
    }

    #[test]
    fn test_base_path_normalization() {
        for (raw, expected) in [
            ("api", Some("/api")),
            ("/api/", Some("/api")),
            ("//api//v1/", Some("/api/v1")),
            ("/", None),
            ("", None),
        ] {
            let config = ServerConfig::builder().base_path(raw).build();
            assert_eq!(config.base_path(), expected, "prefix {raw:?}");
        }
    }

    #[test]
    fn test_disable_request_timeout() {
        let config = ServerConfig::builder().request_timeout(None).build();
        assert!(config.request_timeout().is_none());
    }
}
