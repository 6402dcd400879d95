//! Request context types.
//!
//! The [`RequestContext`] carries request metadata from the transport into
//! procedures, the context factory and the error hook.

use http::{HeaderMap, Method, Uri};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use uuid::Uuid;

/// Header consulted for a caller-supplied request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// A unique identifier for each request, using UUID v7.
///
/// UUID v7 is time-ordered, which makes it ideal for request tracking
/// and log correlation.
///
/// # Example
///
/// ```
/// use openproc_core::RequestId;
///
/// let id = RequestId::new();
/// println!("Request ID: {}", id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new unique request ID using UUID v7.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `RequestId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Reuses a well-formed `x-request-id` header, or generates a new id.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v).ok())
            .map_or_else(Self::new, Self)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Per-request metadata.
///
/// # Example
///
/// ```
/// use openproc_core::RequestContext;
/// use http::{HeaderMap, Method, Uri};
///
/// let ctx = RequestContext::new(Method::GET, Uri::from_static("/users/1?x=2"), HeaderMap::new())
///     .with_procedure_id("getUser");
/// assert_eq!(ctx.path(), "/users/1");
/// assert_eq!(ctx.query(), Some("x=2"));
/// assert_eq!(ctx.procedure_id(), Some("getUser"));
/// ```
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: RequestId,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    procedure_id: Option<String>,
    started_at: Instant,
}

impl RequestContext {
    /// Creates a request context, taking the request id from the headers when
    /// one is supplied.
    #[must_use]
    pub fn new(method: Method, uri: Uri, headers: HeaderMap) -> Self {
        Self {
            request_id: RequestId::from_headers(&headers),
            method,
            uri,
            headers,
            procedure_id: None,
            started_at: Instant::now(),
        }
    }

    /// Creates a context for tests: `GET /` with no headers.
    #[must_use]
    pub fn mock() -> Self {
        Self::new(Method::GET, Uri::from_static("/"), HeaderMap::new())
    }

    /// Returns a new context with the specified request id.
    #[must_use]
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = request_id;
        self
    }

    /// Returns a new context with the matched procedure id.
    #[must_use]
    pub fn with_procedure_id(mut self, procedure_id: impl Into<String>) -> Self {
        self.procedure_id = Some(procedure_id.into());
        self
    }

    /// Returns the request ID.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the URI path.
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Returns the raw query string.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    /// Returns the request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header value as a string.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the matched procedure id, if routing succeeded.
    #[must_use]
    pub fn procedure_id(&self) -> Option<&str> {
        self.procedure_id.as_deref()
    }

    /// Returns the elapsed time since the request started.
    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_request_id_new_generates_unique_ids() {
        let id1 = RequestId::new();
        let id2 = RequestId::new();
        assert_ne!(id1, id2, "Each RequestId should be unique");
    }

    #[test]
    fn test_request_id_display() {
        let display = RequestId::new().to_string();
        assert_eq!(display.len(), 36, "UUID string should be 36 characters");
    }

    #[test]
    fn test_request_id_from_headers() {
        let uuid = Uuid::now_v7();
        let mut headers = HeaderMap::new();
        headers.insert(
            REQUEST_ID_HEADER,
            HeaderValue::from_str(&uuid.to_string()).unwrap(),
        );
        assert_eq!(*RequestId::from_headers(&headers).as_uuid(), uuid);

        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("not-a-uuid"));
        assert_ne!(*RequestId::from_headers(&headers).as_uuid(), uuid);
    }

    #[test]
    fn test_request_id_serialization() {
        let id = RequestId::new();
        let json = serde_json::to_string(&id).expect("serialization should work");
        let parsed: RequestId = serde_json::from_str(&json).expect("deserialization should work");
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_request_context_accessors() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer t"));
        let ctx = RequestContext::new(
            Method::POST,
            Uri::from_static("/users?dry_run=true"),
            headers,
        );

        assert_eq!(ctx.method(), &Method::POST);
        assert_eq!(ctx.path(), "/users");
        assert_eq!(ctx.query(), Some("dry_run=true"));
        assert_eq!(ctx.header("authorization"), Some("Bearer t"));
        assert!(ctx.procedure_id().is_none());
    }

    #[test]
    fn test_request_context_elapsed() {
        let ctx = RequestContext::mock();
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert!(ctx.elapsed() >= std::time::Duration::from_millis(10));
    }
}
