//! Wiring from a loaded [`OpenprocConfig`] to a running server.

use std::time::Duration;

use openproc_config::{ConfigError, OpenprocConfig};
use openproc_server::{OpenApiHandler, OpenApiHandlerBuilder, Server, ServerConfig, ServerError};
use openproc_telemetry::TelemetryError;
use thiserror::Error;

/// Startup failures of [`serve`].
#[derive(Debug, Error)]
pub enum Error {
    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Logging or metrics could not be installed.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    /// The server failed to bind or serve.
    #[error(transparent)]
    Server(#[from] ServerError),
}

/// Maps the `server` section to the adapter's configuration.
///
/// ```
/// use std::time::Duration;
/// use openproc_config::OpenprocConfig;
///
/// let mut config = OpenprocConfig::default();
/// config.server.base_path = Some("/api/".to_string());
/// config.server.request_timeout_secs = None;
///
/// let server = openproc::server_config(&config);
/// assert_eq!(server.base_path(), Some("/api"));
/// assert_eq!(server.request_timeout(), None);
/// assert_eq!(server.shutdown_timeout(), Duration::from_secs(30));
/// ```
#[must_use]
pub fn server_config(config: &OpenprocConfig) -> ServerConfig {
    let section = &config.server;
    let mut builder = ServerConfig::builder()
        .http_addr(section.http_addr.clone())
        .request_timeout(section.request_timeout_secs.map(Duration::from_secs))
        .shutdown_timeout(Duration::from_secs(section.shutdown_timeout_secs));
    if let Some(prefix) = &section.base_path {
        builder = builder.base_path(prefix);
    }
    builder.build()
}

/// Starts a handler builder with the `handler` section applied.
#[must_use]
pub fn handler_builder<C: Send + Sync + 'static>(config: &OpenprocConfig) -> OpenApiHandlerBuilder<C> {
    OpenApiHandler::builder().max_body_size(config.handler.max_body_size)
}

/// Validates the configuration, installs telemetry and serves `handler`
/// until SIGINT or SIGTERM.
///
/// Telemetry installs process-wide state, so call this once per process.
pub async fn serve<C: Send + Sync + 'static>(
    config: &OpenprocConfig,
    handler: OpenApiHandler<C>,
) -> Result<(), Error> {
    config.validate()?;
    openproc_telemetry::init_telemetry(&config.telemetry())?;

    tracing::info!(
        http_addr = %config.server.http_addr,
        base_path = ?config.server.base_path,
        routes = handler.routes().len(),
        "starting openproc"
    );

    Server::new(server_config(config), handler).run().await?;
    Ok(())
}
