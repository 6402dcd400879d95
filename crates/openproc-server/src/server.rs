//! Hyper adapter.
//!
//! [`Server`] accepts HTTP/1.1 connections and feeds each request to an
//! [`OpenApiHandler`]. Before the handler sees a request the adapter:
//!
//! - answers `HEAD` with an empty 204,
//! - collapses duplicate slashes and drops a trailing slash,
//! - strips the configured base path (anything outside it is a 404),
//! - makes sure the request carries an `x-request-id`.
//!
//! A request that outlives the configured timeout is cancelled and answered
//! with 504.
//!
//! # Example
//!
//! ```rust,ignore
//! use openproc_server::{OpenApiHandler, Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let handler = OpenApiHandler::<()>::builder()
//!         .routes(routes)
//!         .registry(registry)
//!         .build()?;
//!
//!     let config = ServerConfig::builder().http_addr("0.0.0.0:8080").base_path("/api").build();
//!     Server::new(config, handler).run().await?;
//!     Ok(())
//! }
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::uri::PathAndQuery;
use http::{Method, Request, Response, StatusCode, Uri};
use http_body::Body;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use openproc_core::{
    ErrorCode, ProcedureError, RequestContext, RequestId, Resolution, StatusTable, REQUEST_ID_HEADER,
};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::handler::OpenApiHandler;
use crate::hook::ErrorKind;
use crate::response::{self, HttpResponse};
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// HTTP server for an [`OpenApiHandler`].
pub struct Server<C = ()> {
    config: ServerConfig,
    handler: Arc<OpenApiHandler<C>>,
}

impl<C> std::fmt::Debug for Server<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("handler", &self.handler)
            .finish()
    }
}

impl<C: Send + Sync + 'static> Server<C> {
    /// Creates a server around a handler.
    #[must_use]
    pub fn new(config: ServerConfig, handler: OpenApiHandler<C>) -> Self {
        Self::from_shared(config, Arc::new(handler))
    }

    /// Creates a server around a shared handler.
    #[must_use]
    pub fn from_shared(config: ServerConfig, handler: Arc<OpenApiHandler<C>>) -> Self {
        Self { config, handler }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the handler.
    #[must_use]
    pub fn handler(&self) -> &Arc<OpenApiHandler<C>> {
        &self.handler
    }

    /// Binds the configured address and serves until SIGINT or SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or cannot be bound.
    pub async fn run(self) -> Result<(), ServerError> {
        let shutdown = ShutdownSignal::with_os_signals();
        self.run_with_shutdown(shutdown).await
    }

    /// Binds the configured address and serves until `shutdown` fires.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or cannot be bound.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let addr = self
            .config
            .socket_addr()
            .map_err(|e| ServerError::InvalidAddress {
                addr: self.config.http_addr().to_string(),
                reason: e.to_string(),
            })?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        self.serve(listener, shutdown).await
    }

    /// Serves connections from an already bound listener until `shutdown`
    /// fires, then waits up to the shutdown timeout for open connections.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener's address cannot be read.
    pub async fn serve(self, listener: TcpListener, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let local_addr = listener.local_addr()?;
        tracing::info!(addr = %local_addr, base_path = ?self.config.base_path(), "server listening");

        let shutdown_timeout = self.config.shutdown_timeout();
        let server = Arc::new(self);
        let tracker = ConnectionTracker::new();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, remote_addr)) => {
                            let server = Arc::clone(&server);
                            let shutdown = shutdown.clone();
                            tracker.spawn(async move {
                                server.serve_connection(stream, remote_addr, shutdown).await;
                            });
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "failed to accept connection");
                        }
                    }
                }

                () = shutdown.recv() => {
                    tracing::info!("shutdown signal received, no longer accepting connections");
                    break;
                }
            }
        }

        tracker.close();
        tracing::info!(
            active = tracker.active_connections(),
            timeout = ?shutdown_timeout,
            "draining connections"
        );

        tokio::select! {
            () = tracker.wait() => {
                tracing::info!("all connections closed");
            }
            () = tokio::time::sleep(shutdown_timeout) => {
                tracing::warn!(
                    active = tracker.active_connections(),
                    "shutdown timeout reached with connections still open"
                );
            }
        }

        tracing::info!("server stopped");
        Ok(())
    }

    async fn serve_connection(
        self: Arc<Self>,
        stream: TcpStream,
        remote_addr: SocketAddr,
        shutdown: ShutdownSignal,
    ) {
        let io = TokioIo::new(stream);
        let server = Arc::clone(&self);

        let service = service_fn(move |req: Request<Incoming>| {
            let server = Arc::clone(&server);
            async move { Ok::<_, Infallible>(server.handle_request(req).await) }
        });

        let conn = http1::Builder::new().serve_connection(io, service);
        tokio::pin!(conn);

        let stop = shutdown.recv();
        tokio::pin!(stop);
        let mut draining = false;

        loop {
            tokio::select! {
                result = conn.as_mut() => {
                    if let Err(e) = result {
                        tracing::debug!(remote_addr = %remote_addr, error = %e, "connection error");
                    }
                    break;
                }
                () = &mut stop, if !draining => {
                    tracing::debug!(remote_addr = %remote_addr, "draining connection for shutdown");
                    draining = true;
                    conn.as_mut().graceful_shutdown();
                }
            }
        }
    }

    /// Applies the adapter rules to one request and runs the handler.
    pub async fn handle_request<B>(&self, request: Request<B>) -> HttpResponse
    where
        B: Body + Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let (mut parts, body) = request.into_parts();

        if parts.method == Method::HEAD {
            return head_response();
        }

        // One id for the handler and for rejections made here.
        let request_id = RequestId::from_headers(&parts.headers);
        if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
            parts.headers.insert(REQUEST_ID_HEADER, value);
        }

        let normalized = normalize_path(parts.uri.path());
        let Some(path) = strip_base_path(&normalized, self.config.base_path()) else {
            let request = RequestContext::new(parts.method, parts.uri, parts.headers);
            let error = ProcedureError::not_found(format!(
                "No procedure found on path \"{}\"",
                request.path()
            ));
            return self.handler.reject(&request, ErrorKind::NotFound, &error);
        };

        if path != parts.uri.path() {
            match replace_path(&parts.uri, path) {
                Some(uri) => parts.uri = uri,
                None => {
                    let request = RequestContext::new(parts.method, parts.uri, parts.headers);
                    let error = ProcedureError::bad_request("Malformed request path");
                    return self.handler.reject(&request, ErrorKind::Extraction, &error);
                }
            }
        }

        let cancel = CancellationToken::new();
        let outcome = match self.config.request_timeout() {
            Some(limit) => {
                let mut snapshot = RequestContext::new(
                    parts.method.clone(),
                    parts.uri.clone(),
                    parts.headers.clone(),
                );
                if let Resolution::Matched { route, .. } =
                    self.handler.routes().resolve(&parts.method, parts.uri.path())
                {
                    snapshot = snapshot.with_procedure_id(route.procedure_id());
                }
                let request = Request::from_parts(parts, body);
                let pending = self.handler.handle_with_cancel(request, cancel.clone());
                if let Ok(outcome) = tokio::time::timeout(limit, pending).await {
                    outcome
                } else {
                    cancel.cancel();
                    tracing::warn!(
                        request_id = %snapshot.request_id(),
                        http.path = snapshot.path(),
                        timeout = ?limit,
                        "request timed out"
                    );
                    let error = ProcedureError::new(ErrorCode::GatewayTimeout, "Request timed out");
                    return self.handler.reject(&snapshot, ErrorKind::Timeout, &error);
                }
            }
            None => {
                self.handler
                    .handle_with_cancel(Request::from_parts(parts, body), cancel)
                    .await
            }
        };

        outcome.unwrap_or_else(|| {
            let error = ProcedureError::new(ErrorCode::ClientClosedRequest, "Request cancelled");
            response::failure(&StatusTable::new(), &error, None)
        })
    }
}

fn head_response() -> HttpResponse {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header(CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
}

/// Collapses duplicate slashes and drops a trailing slash.
///
/// ```
/// use openproc_server::server::normalize_path;
///
/// assert_eq!(normalize_path("//users///7/"), "/users/7");
/// assert_eq!(normalize_path("/"), "/");
/// ```
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

/// Strips a normalized base path, or returns `None` if `path` lies outside
/// it. Matching is per segment: `/api` covers `/api/users` but not `/apiary`.
#[must_use]
pub fn strip_base_path<'a>(path: &'a str, base: Option<&str>) -> Option<&'a str> {
    let Some(base) = base else {
        return Some(path);
    };
    match path.strip_prefix(base) {
        Some("") => Some("/"),
        Some(rest) if rest.starts_with('/') => Some(rest),
        _ => None,
    }
}

fn replace_path(uri: &Uri, path: &str) -> Option<Uri> {
    let path_and_query = match uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    };
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(path_and_query).ok()?);
    Uri::from_parts(parts).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/users/7"), "/users/7");
        assert_eq!(normalize_path("/users/7/"), "/users/7");
        assert_eq!(normalize_path("//users//7"), "/users/7");
        assert_eq!(normalize_path(""), "/");
    }

    #[test]
    fn test_strip_base_path() {
        assert_eq!(strip_base_path("/api/users", Some("/api")), Some("/users"));
        assert_eq!(strip_base_path("/api", Some("/api")), Some("/"));
        assert_eq!(strip_base_path("/apiary", Some("/api")), None);
        assert_eq!(strip_base_path("/users", Some("/api")), None);
        assert_eq!(strip_base_path("/users", None), Some("/users"));
    }

    #[test]
    fn test_replace_path_keeps_query() {
        let uri: Uri = "/api/users?limit=2".parse().unwrap();
        let replaced = replace_path(&uri, "/users").unwrap();
        assert_eq!(replaced.path(), "/users");
        assert_eq!(replaced.query(), Some("limit=2"));
    }

    #[tokio::test]
    async fn test_run_invalid_address() {
        let handler = OpenApiHandler::<()>::builder().build().unwrap();
        let config = ServerConfig::builder().http_addr("not-an-address").build();

        let result = Server::new(config, handler)
            .run_with_shutdown(ShutdownSignal::new())
            .await;
        assert!(matches!(result, Err(ServerError::InvalidAddress { .. })));
    }

    #[tokio::test]
    async fn test_run_and_shutdown() {
        let handler = OpenApiHandler::<()>::builder().build().unwrap();
        let config = ServerConfig::builder()
            .http_addr("127.0.0.1:0")
            .shutdown_timeout(std::time::Duration::from_millis(100))
            .build();

        let shutdown = ShutdownSignal::new();
        shutdown.trigger();

        let result = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            Server::new(config, handler).run_with_shutdown(shutdown),
        )
        .await;
        assert!(matches!(result, Ok(Ok(()))));
    }
}
