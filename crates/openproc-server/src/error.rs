//! Server error types.

use std::net::SocketAddr;

use openproc_core::BuildError;
use thiserror::Error;

/// Errors raised while starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The configured address does not parse.
    #[error("Invalid address '{addr}': {reason}")]
    InvalidAddress {
        /// Address as configured.
        addr: String,
        /// Parse failure.
        reason: String,
    },

    /// The listener could not bind.
    #[error("Failed to bind to {addr}")]
    Bind {
        /// Address the bind was attempted on.
        addr: SocketAddr,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The handler failed its startup checks.
    #[error(transparent)]
    Build(#[from] BuildError),

    /// Listener I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
