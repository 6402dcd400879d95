//! Error reporting hook.
//!
//! The hook sees every failed request exactly once, before its response is
//! written, with the original error (internal messages and sources
//! included). A panicking hook is contained: the panic is logged and counted
//! and the client still gets its mapped response.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use openproc_core::{ProcedureError, RequestContext};
use serde_json::Value;

/// Pipeline stage a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No route matched the path.
    NotFound,
    /// The path matched only for other methods.
    MethodNotAllowed,
    /// The body or query could not be read or parsed.
    Extraction,
    /// The input failed its schema.
    Validation,
    /// The context factory failed.
    Context,
    /// The procedure returned an error.
    Procedure,
    /// The procedure output failed its declared schema.
    Output,
    /// The transport gave up waiting.
    Timeout,
}

impl ErrorKind {
    /// Returns a stable lowercase name for logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::MethodNotAllowed => "method_not_allowed",
            Self::Extraction => "extraction",
            Self::Validation => "validation",
            Self::Context => "context",
            Self::Procedure => "procedure",
            Self::Output => "output",
            Self::Timeout => "timeout",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything known about a failed request.
#[derive(Debug)]
pub struct ErrorReport<'a, C> {
    /// The original error.
    pub error: &'a ProcedureError,
    /// Stage the error came from.
    pub kind: ErrorKind,
    /// Matched procedure, if routing succeeded.
    pub procedure_id: Option<&'a str>,
    /// Assembled input, if it was assembled.
    pub input: Option<&'a Value>,
    /// Context, if the factory ran and succeeded.
    pub context: Option<&'a C>,
    /// Request metadata.
    pub request: &'a RequestContext,
}

/// Type-erased error hook.
pub type ErrorHook<C> = Arc<dyn Fn(&ErrorReport<'_, C>) + Send + Sync>;

/// Runs the hook, containing any panic.
///
/// Returns `false` if the hook panicked.
pub(crate) fn report<C>(hook: Option<&ErrorHook<C>>, report: &ErrorReport<'_, C>) -> bool {
    let Some(hook) = hook else {
        return true;
    };

    match catch_unwind(AssertUnwindSafe(|| hook(report))) {
        Ok(()) => true,
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            tracing::error!(
                request_id = %report.request.request_id(),
                procedure_id = report.procedure_id.unwrap_or_default(),
                panic = %message,
                "error hook panicked"
            );
            openproc_telemetry::metrics::record_hook_panic();
            false
        }
    }
}
