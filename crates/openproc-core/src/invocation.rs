//! Procedure invocation context.
//!
//! The [`InvocationContext`] is what a procedure receives alongside its typed
//! input: request metadata, the validated input as JSON, the optional
//! application context value and a per-request cancellation token.

use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::{RequestContext, RequestId};

/// Complete context for invoking a procedure.
///
/// `C` is the application context produced by the handler's context factory.
/// The core never interprets it.
///
/// # Example
///
/// ```rust
/// use openproc_core::{InvocationContext, RequestContext};
/// use serde_json::json;
///
/// let ctx: InvocationContext<()> = InvocationContext::new(RequestContext::mock())
///     .with_input(json!({"id": 1}));
///
/// assert_eq!(ctx.input()["id"], 1);
/// assert!(ctx.context().is_none());
/// assert!(!ctx.is_cancelled());
/// ```
#[derive(Debug)]
pub struct InvocationContext<C> {
    request: Arc<RequestContext>,
    input: Value,
    context: Option<Arc<C>>,
    cancellation: CancellationToken,
}

impl<C> Clone for InvocationContext<C> {
    fn clone(&self) -> Self {
        Self {
            request: Arc::clone(&self.request),
            input: self.input.clone(),
            context: self.context.clone(),
            cancellation: self.cancellation.clone(),
        }
    }
}

impl<C> InvocationContext<C> {
    /// Creates an invocation context with no input, no application context
    /// and a fresh cancellation token.
    #[must_use]
    pub fn new(request: RequestContext) -> Self {
        Self::from_shared(Arc::new(request))
    }

    /// Creates an invocation context sharing request metadata.
    #[must_use]
    pub fn from_shared(request: Arc<RequestContext>) -> Self {
        Self {
            request,
            input: Value::Null,
            context: None,
            cancellation: CancellationToken::new(),
        }
    }

    /// Sets the validated input.
    #[must_use]
    pub fn with_input(mut self, input: Value) -> Self {
        self.input = input;
        self
    }

    /// Sets the application context.
    #[must_use]
    pub fn with_context(mut self, context: Option<Arc<C>>) -> Self {
        self.context = context;
        self
    }

    /// Sets the cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Returns the request metadata.
    #[must_use]
    pub fn request(&self) -> &RequestContext {
        &self.request
    }

    /// Returns the request id.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request.request_id()
    }

    /// Returns the validated input as JSON.
    #[must_use]
    pub fn input(&self) -> &Value {
        &self.input
    }

    /// Returns the application context, if a factory produced one.
    #[must_use]
    pub fn context(&self) -> Option<&C> {
        self.context.as_deref()
    }

    /// Returns a shared handle to the application context.
    #[must_use]
    pub fn context_arc(&self) -> Option<Arc<C>> {
        self.context.clone()
    }

    /// Returns the cancellation token.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Returns true once the request has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}
