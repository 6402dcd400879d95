//! The request pipeline.
//!
//! [`OpenApiHandler`] turns one HTTP request into one procedure call:
//!
//! ```text
//! match route → context → resolve input → validate → invoke → check output → respond
//!      │           │            │             │          │            │
//!      └───────────┴────────────┴─────────────┴──────────┴────────────┴──→ hook → error response
//! ```
//!
//! The handler knows nothing about sockets. Anything that can produce an
//! `http::Request` with an `http_body::Body` can drive it; [`Server`] is the
//! bundled hyper adapter.
//!
//! [`Server`]: crate::Server

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use http::header::HeaderValue;
use http::{Method, Request};
use http_body::Body;
use openproc_core::{
    BuildError, ErrorCode, Params, ProcedureError, ProcedureRegistry, RequestContext, Resolution,
    RouteDefinition, RouteTable, StatusTable, REQUEST_ID_HEADER,
};
use openproc_extract::{InputResolver, ParserSet};
use openproc_telemetry::metrics::{
    record_request, record_validation_failure, InFlightGuard, UNMATCHED_PROCEDURE,
};
use openproc_telemetry::{log_request_complete, log_request_error};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::hook::{self, ErrorHook, ErrorKind, ErrorReport};
use crate::response::{self, HttpResponse};

/// Future returned by a context factory.
pub type ContextFuture<C> = Pin<Box<dyn Future<Output = Result<C, ProcedureError>> + Send>>;

/// Type-erased context factory.
pub type ContextFactory<C> = Arc<dyn Fn(Arc<RequestContext>) -> ContextFuture<C> + Send + Sync>;

/// Serves procedures behind OpenAPI-style routes.
///
/// Immutable once built; share it behind an `Arc`.
///
/// # Example
///
/// ```rust
/// use bytes::Bytes;
/// use http::{Request, StatusCode};
/// use http_body_util::Full;
/// use openproc_core::{InvocationContext, ProcedureRegistry, RouteDefinition, RouteTable, Schema};
/// use openproc_server::OpenApiHandler;
/// use serde_json::{json, Value};
///
/// # tokio_test::block_on(async {
/// let mut registry = ProcedureRegistry::<()>::new();
/// registry.register_raw("greet", |_ctx: InvocationContext<()>, input: Value| async move {
///     Ok(json!({ "greeting": format!("Hello {}", input["name"].as_str().unwrap_or("?")) }))
/// });
///
/// let routes = RouteTable::new([RouteDefinition::get("/greet/{name}", "greet")
///     .input(Schema::object().field("name", Schema::string()))
///     .build()
///     .unwrap()])
/// .unwrap();
///
/// let handler = OpenApiHandler::builder()
///     .routes(routes)
///     .registry(registry)
///     .build()
///     .unwrap();
///
/// let request = Request::get("/greet/ada").body(Full::new(Bytes::new())).unwrap();
/// let response = handler.handle(request).await.unwrap();
/// assert_eq!(response.status(), StatusCode::OK);
/// # });
/// ```
pub struct OpenApiHandler<C = ()> {
    routes: Arc<RouteTable>,
    registry: Arc<ProcedureRegistry<C>>,
    resolver: InputResolver,
    statuses: StatusTable,
    context_factory: Option<ContextFactory<C>>,
    hook: Option<ErrorHook<C>>,
}

impl<C> fmt::Debug for OpenApiHandler<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenApiHandler")
            .field("routes", &self.routes.len())
            .field("procedures", &self.registry.len())
            .field("resolver", &self.resolver)
            .field("statuses", &self.statuses)
            .field("context_factory", &self.context_factory.is_some())
            .field("hook", &self.hook.is_some())
            .finish()
    }
}

impl<C: Send + Sync + 'static> OpenApiHandler<C> {
    /// Creates a handler builder.
    #[must_use]
    pub fn builder() -> OpenApiHandlerBuilder<C> {
        OpenApiHandlerBuilder::new()
    }

    /// Returns the route table.
    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Returns the procedure registry.
    #[must_use]
    pub fn registry(&self) -> &ProcedureRegistry<C> {
        &self.registry
    }

    /// Handles one request to completion.
    ///
    /// Always yields a response; `Option` is shared with
    /// [`handle_with_cancel`](Self::handle_with_cancel).
    pub async fn handle<B>(&self, request: Request<B>) -> Option<HttpResponse>
    where
        B: Body + Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        self.handle_with_cancel(request, CancellationToken::new()).await
    }

    /// Handles one request unless `cancel` fires first.
    ///
    /// The token reaches the procedure through its
    /// [`InvocationContext`](openproc_core::InvocationContext). Once it is
    /// cancelled the pipeline stops at its next suspension point and no
    /// response is produced (`None`); the hook is not called.
    pub async fn handle_with_cancel<B>(
        &self,
        request: Request<B>,
        cancel: CancellationToken,
    ) -> Option<HttpResponse>
    where
        B: Body + Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let _in_flight = InFlightGuard::new();
        let (parts, body) = request.into_parts();
        let request = RequestContext::new(parts.method, parts.uri, parts.headers);
        let request_id = request.request_id();

        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!(request_id = %request_id, "request cancelled, no response written");
                None
            }
            response = self.process(request, body, cancel.clone()) => Some(response),
        }
    }

    /// Reports a failure detected outside the pipeline and maps it.
    ///
    /// Adapters use this for requests they reject themselves, so those go
    /// through the hook and the status table like any other failure.
    pub fn reject(&self, request: &RequestContext, kind: ErrorKind, error: &ProcedureError) -> HttpResponse {
        let report = ErrorReport {
            error,
            kind,
            procedure_id: request.procedure_id(),
            input: None,
            context: None,
            request,
        };
        self.fail(&report, None)
    }

    async fn process<B>(
        &self,
        request: RequestContext,
        body: B,
        cancel: CancellationToken,
    ) -> HttpResponse
    where
        B: Body + Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        match self.routes.resolve(request.method(), request.path()) {
            Resolution::Matched { route, params } => {
                self.run(route, params, request, body, cancel).await
            }
            Resolution::MethodNotAllowed(allowed) => {
                tracing::debug!(
                    request_id = %request.request_id(),
                    http.method = %request.method(),
                    http.path = request.path(),
                    "path exists for other methods"
                );
                let error = ProcedureError::new(
                    ErrorCode::MethodNotSupported,
                    format!(
                        "Method \"{}\" is not supported on path \"{}\"",
                        request.method(),
                        request.path()
                    ),
                );
                let report = ErrorReport {
                    error: &error,
                    kind: ErrorKind::MethodNotAllowed,
                    procedure_id: None,
                    input: None,
                    context: None,
                    request: &request,
                };
                self.fail(&report, Some(&allowed))
            }
            Resolution::NotFound => {
                tracing::debug!(
                    request_id = %request.request_id(),
                    http.method = %request.method(),
                    http.path = request.path(),
                    "no route matched"
                );
                let error = ProcedureError::not_found(format!(
                    "No procedure found on path \"{}\"",
                    request.path()
                ));
                self.reject(&request, ErrorKind::NotFound, &error)
            }
        }
    }

    async fn run<B>(
        &self,
        route: &RouteDefinition,
        params: Params,
        request: RequestContext,
        body: B,
        cancel: CancellationToken,
    ) -> HttpResponse
    where
        B: Body + Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let procedure_id = route.procedure_id();
        let request = Arc::new(request.with_procedure_id(procedure_id));

        tracing::debug!(
            request_id = %request.request_id(),
            procedure_id = procedure_id,
            http.method = %request.method(),
            http.path = request.path(),
            "route matched"
        );

        let context = match &self.context_factory {
            None => None,
            Some(factory) => match factory(Arc::clone(&request)).await {
                Ok(context) => Some(Arc::new(context)),
                Err(error) => {
                    let report = ErrorReport {
                        error: &error,
                        kind: ErrorKind::Context,
                        procedure_id: Some(procedure_id),
                        input: None,
                        context: None,
                        request: &request,
                    };
                    return self.fail(&report, None);
                }
            },
        };

        let input = match self
            .resolver
            .resolve(route, &params, request.headers(), request.query(), body)
            .await
        {
            Ok(input) => input,
            Err(e) => {
                let error = ProcedureError::from(e);
                let report = ErrorReport {
                    error: &error,
                    kind: ErrorKind::Extraction,
                    procedure_id: Some(procedure_id),
                    input: None,
                    context: context.as_deref(),
                    request: &request,
                };
                return self.fail(&report, None);
            }
        };

        let input = match route.input_schema() {
            None => Value::Null,
            Some(schema) => match schema.validate(&input) {
                Ok(cleaned) => cleaned,
                Err(issues) => {
                    record_validation_failure(procedure_id);
                    let error = ProcedureError::validation(issues);
                    let report = ErrorReport {
                        error: &error,
                        kind: ErrorKind::Validation,
                        procedure_id: Some(procedure_id),
                        input: Some(&input),
                        context: context.as_deref(),
                        request: &request,
                    };
                    return self.fail(&report, None);
                }
            },
        };

        let invocation = openproc_core::InvocationContext::from_shared(Arc::clone(&request))
            .with_input(input.clone())
            .with_context(context.clone())
            .with_cancellation(cancel);

        let output = match self
            .registry
            .invoke(procedure_id, invocation, input.clone())
            .await
        {
            Ok(output) => output,
            Err(error) => {
                let report = ErrorReport {
                    error: &error,
                    kind: ErrorKind::Procedure,
                    procedure_id: Some(procedure_id),
                    input: Some(&input),
                    context: context.as_deref(),
                    request: &request,
                };
                return self.fail(&report, None);
            }
        };

        let output = match route.output_schema() {
            None => output,
            Some(schema) => match schema.validate(&output) {
                Ok(cleaned) => cleaned,
                Err(issues) => {
                    let details = issues
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join("; ");
                    let error = ProcedureError::internal(format!(
                        "output of '{procedure_id}' does not match its schema: {details}"
                    ));
                    let report = ErrorReport {
                        error: &error,
                        kind: ErrorKind::Output,
                        procedure_id: Some(procedure_id),
                        input: Some(&input),
                        context: context.as_deref(),
                        request: &request,
                    };
                    return self.fail(&report, None);
                }
            },
        };

        let response = response::success(route.success_status(), &output);
        log_request_complete!(
            request.request_id(),
            procedure_id,
            response.status().as_u16(),
            elapsed_ms(&request)
        );
        finish(&request, Some(procedure_id), response)
    }

    fn fail(&self, report: &ErrorReport<'_, C>, allow: Option<&[Method]>) -> HttpResponse {
        hook::report(self.hook.as_ref(), report);

        let response = response::failure(&self.statuses, report.error, allow);
        let status = response.status().as_u16();
        let detail = match report.error.source_error() {
            Some(source) => format!("{}: {source:#}", report.error),
            None => report.error.to_string(),
        };
        log_request_error!(
            report.request.request_id(),
            report.procedure_id.unwrap_or(UNMATCHED_PROCEDURE),
            status,
            report.error.code(),
            detail
        );

        finish(report.request, report.procedure_id, response)
    }
}

/// Stamps the request id and records the request metrics.
fn finish(request: &RequestContext, procedure_id: Option<&str>, mut response: HttpResponse) -> HttpResponse {
    if let Ok(value) = HeaderValue::from_str(&request.request_id().to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    record_request(
        procedure_id.unwrap_or(UNMATCHED_PROCEDURE),
        response.status().as_u16(),
        request.elapsed(),
    );
    response
}

fn elapsed_ms(request: &RequestContext) -> u64 {
    u64::try_from(request.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Builder for [`OpenApiHandler`].
pub struct OpenApiHandlerBuilder<C = ()> {
    routes: Option<RouteTable>,
    registry: Option<ProcedureRegistry<C>>,
    resolver: InputResolver,
    statuses: StatusTable,
    context_factory: Option<ContextFactory<C>>,
    hook: Option<ErrorHook<C>>,
}

impl<C> fmt::Debug for OpenApiHandlerBuilder<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenApiHandlerBuilder")
            .field("routes", &self.routes.as_ref().map(RouteTable::len))
            .field("resolver", &self.resolver)
            .field("context_factory", &self.context_factory.is_some())
            .field("hook", &self.hook.is_some())
            .finish_non_exhaustive()
    }
}

impl<C: Send + Sync + 'static> Default for OpenApiHandlerBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Send + Sync + 'static> OpenApiHandlerBuilder<C> {
    /// Creates a builder with no routes and no procedures.
    #[must_use]
    pub fn new() -> Self {
        Self {
            routes: None,
            registry: None,
            resolver: InputResolver::new(),
            statuses: StatusTable::new(),
            context_factory: None,
            hook: None,
        }
    }

    /// Sets the route table.
    #[must_use]
    pub fn routes(mut self, routes: RouteTable) -> Self {
        self.routes = Some(routes);
        self
    }

    /// Sets the procedure registry.
    #[must_use]
    pub fn registry(mut self, registry: ProcedureRegistry<C>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Limits request bodies to `limit` bytes. `None` means unlimited.
    #[must_use]
    pub fn max_body_size(mut self, limit: Option<usize>) -> Self {
        self.resolver = self.resolver.max_body_size(limit);
        self
    }

    /// Replaces the body parsers.
    #[must_use]
    pub fn parsers(mut self, parsers: ParserSet) -> Self {
        self.resolver = self.resolver.parsers(parsers);
        self
    }

    /// Declares application error codes.
    #[must_use]
    pub fn status_table(mut self, statuses: StatusTable) -> Self {
        self.statuses = statuses;
        self
    }

    /// Sets the context factory, run once per matched request before input
    /// resolution. Its errors are mapped like procedure errors.
    #[must_use]
    pub fn context<F, Fut>(mut self, factory: F) -> Self
    where
        F: Fn(Arc<RequestContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<C, ProcedureError>> + Send + 'static,
    {
        let erased: ContextFactory<C> =
            Arc::new(move |request: Arc<RequestContext>| -> ContextFuture<C> {
                Box::pin(factory(request))
            });
        self.context_factory = Some(erased);
        self
    }

    /// Sets the error hook.
    #[must_use]
    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ErrorReport<'_, C>) + Send + Sync + 'static,
    {
        self.hook = Some(Arc::new(hook));
        self
    }

    /// Builds the handler.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] when routes and procedures do not cover each
    /// other exactly, a procedure id was registered twice, or an application
    /// error code maps to a non-error status.
    pub fn build(self) -> Result<OpenApiHandler<C>, BuildError> {
        self.statuses.check()?;
        let routes = match self.routes {
            Some(routes) => routes,
            None => RouteTable::new([])?,
        };
        let registry = self.registry.unwrap_or_default();
        routes.check_procedures(&registry)?;

        tracing::info!(
            routes = routes.len(),
            procedures = registry.len(),
            max_body_size = ?self.resolver.body_limit(),
            "openapi handler built"
        );

        Ok(OpenApiHandler {
            routes: Arc::new(routes),
            registry: Arc::new(registry),
            resolver: self.resolver,
            statuses: self.statuses,
            context_factory: self.context_factory,
            hook: self.hook,
        })
    }
}
