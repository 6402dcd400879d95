//! # openproc Server
//!
//! Serves registered procedures over HTTP.
//!
//! - [`OpenApiHandler`] - The transport-independent request pipeline
//! - [`Server`] - Hyper adapter with graceful shutdown and request timeouts
//! - [`ErrorReport`] / [`ErrorKind`] - What the error hook is told
//!
//! ## Example
//!
//! ```rust,ignore
//! use openproc_server::{OpenApiHandler, Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let handler = OpenApiHandler::<()>::builder()
//!         .routes(routes)
//!         .registry(registry)
//!         .max_body_size(Some(1024 * 1024))
//!         .on_error(|report| eprintln!("{} failed: {}", report.kind, report.error))
//!         .build()?;
//!
//!     Server::new(ServerConfig::default(), handler).run().await?;
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/openproc-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod handler;
mod hook;
pub mod response;
pub mod server;
mod shutdown;

pub use config::{
    ServerConfig, ServerConfigBuilder, DEFAULT_HTTP_ADDR, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_SHUTDOWN_TIMEOUT_SECS,
};
pub use error::ServerError;
pub use handler::{ContextFactory, ContextFuture, OpenApiHandler, OpenApiHandlerBuilder};
pub use hook::{ErrorHook, ErrorKind, ErrorReport};
pub use response::{HttpResponse, ResponseBody};
pub use server::Server;
pub use shutdown::{ConnectionTracker, ShutdownSignal};
