//! Route table construction errors.

use http::Method;
use thiserror::Error;

/// Errors raised while compiling templates or building a route table.
///
/// These are startup errors: a route table that fails to build is a
/// configuration bug, never a per-request condition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// The path template is malformed.
    #[error("invalid path template '{template}': {reason}")]
    InvalidTemplate {
        /// The offending template.
        template: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Two routes share the same method and structurally identical template.
    #[error("route conflict: {method} {template} collides with {method} {existing} ('{existing_procedure}')")]
    Conflict {
        /// HTTP method of both routes.
        method: Method,
        /// Template being inserted.
        template: String,
        /// Template already registered.
        existing: String,
        /// Procedure bound to the existing route.
        existing_procedure: String,
    },

    /// The method cannot carry a route (e.g., `CONNECT` or extension methods).
    #[error("method {0} is not routable")]
    UnsupportedMethod(Method),
}

impl RouteError {
    pub(crate) fn invalid(template: &str, reason: impl Into<String>) -> Self {
        Self::InvalidTemplate {
            template: template.to_string(),
            reason: reason.into(),
        }
    }
}
