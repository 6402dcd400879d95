//! Input resolution.
//!
//! [`InputResolver`] merges path parameters, query string and parsed body
//! into the single JSON value a procedure is validated against:
//!
//! | Method | Sources |
//! |--------|---------|
//! | GET, DELETE, HEAD, OPTIONS | query + path |
//! | POST, PUT, PATCH | body + path |
//!
//! Path parameters always win over fields of the same name. String values
//! from path, query and form bodies are coerced against the route's input
//! schema.

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::HeaderMap;
use http_body::Body;
use openproc_core::RouteDefinition;
use openproc_router::Params;
use serde_json::{Map, Value};

use crate::body::{content_length, read_body};
use crate::coerce::coerce_fields;
use crate::parser::{ParserSet, DEFAULT_MEDIA_TYPE};
use crate::query::parse_query;
use crate::ExtractionError;

/// Resolves request parts into procedure input.
///
/// # Example
///
/// ```rust
/// use bytes::Bytes;
/// use http::HeaderMap;
/// use openproc_core::{RouteDefinition, Schema};
/// use openproc_extract::InputResolver;
/// use openproc_router::Params;
/// use serde_json::json;
///
/// let route = RouteDefinition::get("/users/{id}", "getUser")
///     .input(Schema::object().field("id", Schema::integer()).optional("expand", Schema::boolean()))
///     .build()
///     .unwrap();
///
/// let mut params = Params::new();
/// params.push("id", "7");
///
/// let input = InputResolver::new()
///     .assemble(&route, &params, &HeaderMap::new(), Some("expand=true"), &Bytes::new())
///     .unwrap();
/// assert_eq!(input, json!({"expand": true, "id": 7}));
/// ```
#[derive(Debug, Clone, Default)]
pub struct InputResolver {
    parsers: ParserSet,
    max_body_size: Option<usize>,
}

impl InputResolver {
    /// Creates a resolver with the default parsers and no body limit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum body size in bytes; `None` is unlimited.
    #[must_use]
    pub fn max_body_size(mut self, limit: Option<usize>) -> Self {
        self.max_body_size = limit;
        self
    }

    /// Replaces the body parsers.
    #[must_use]
    pub fn parsers(mut self, parsers: ParserSet) -> Self {
        self.parsers = parsers;
        self
    }

    /// Returns the configured body limit.
    #[must_use]
    pub fn body_limit(&self) -> Option<usize> {
        self.max_body_size
    }

    /// Returns the body parsers.
    #[must_use]
    pub fn parser_set(&self) -> &ParserSet {
        &self.parsers
    }

    /// Reads the body (for body methods only) and assembles the input.
    ///
    /// For methods without a body, and for routes that declare no input, the
    /// stream is never polled, whatever `Content-Length` says.
    ///
    /// # Errors
    ///
    /// Returns an [`ExtractionError`] for an oversized or malformed body, an
    /// unaccepted media type, or a malformed query string.
    pub async fn resolve<B>(
        &self,
        route: &RouteDefinition,
        params: &Params,
        headers: &HeaderMap,
        query: Option<&str>,
        body: B,
    ) -> Result<Value, ExtractionError>
    where
        B: Body,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let bytes = if route.reads_body() && route.input_schema().is_some() {
            read_body(body, content_length(headers), self.max_body_size).await?
        } else {
            Bytes::new()
        };
        self.assemble(route, params, headers, query, &bytes)
    }

    /// Assembles input from an already-buffered body.
    ///
    /// The body limit is applied here too, so oversized bytes never reach a
    /// parser.
    ///
    /// # Errors
    ///
    /// See [`InputResolver::resolve`].
    pub fn assemble(
        &self,
        route: &RouteDefinition,
        params: &Params,
        headers: &HeaderMap,
        query: Option<&str>,
        body: &Bytes,
    ) -> Result<Value, ExtractionError> {
        let schema = route.input_schema();
        let path = coerce_fields(path_fields(params), schema);

        if !route.reads_body() {
            let mut fields = coerce_fields(parse_query(query)?, schema);
            fields.extend(path);
            return Ok(Value::Object(fields));
        }

        if schema.is_none() {
            return Ok(Value::Object(path));
        }

        if let Some(limit) = self.max_body_size {
            if body.len() > limit {
                return Err(ExtractionError::payload_too_large(
                    limit,
                    u64::try_from(body.len()).ok(),
                ));
            }
        }

        if body.is_empty() {
            return Ok(Value::Object(path));
        }

        let declared = match headers.get(CONTENT_TYPE) {
            Some(value) => Some(value.to_str().map_err(|_| self.unsupported(route, None))?),
            None => None,
        };
        let essence = match declared {
            Some(raw) => media_essence(raw).ok_or_else(|| self.unsupported(route, declared))?,
            None => DEFAULT_MEDIA_TYPE.to_string(),
        };
        if !route.accepts_content_type(&essence) {
            return Err(self.unsupported(route, declared));
        }
        let parser = self
            .parsers
            .find(&essence)
            .ok_or_else(|| self.unsupported(route, declared))?;

        let parsed = parser.parse(body)?;
        let merged = match parsed {
            Value::Object(fields) => {
                let mut fields = if parser.coerces_strings() {
                    coerce_fields(fields, schema)
                } else {
                    fields
                };
                fields.extend(path);
                Value::Object(fields)
            }
            other => other,
        };
        Ok(merged)
    }

    fn unsupported(&self, route: &RouteDefinition, declared: Option<&str>) -> ExtractionError {
        let accepted: Vec<&str> = match route.content_types() {
            Some(types) => types.iter().map(String::as_str).collect(),
            None => self.parsers.media_types(),
        };
        ExtractionError::unsupported_media_type(declared, &accepted)
    }
}

/// Parses a `Content-Type` value down to its lowercase essence
/// (`type/subtype`, parameters dropped).
#[must_use]
pub fn media_essence(content_type: &str) -> Option<String> {
    content_type
        .parse::<mime::Mime>()
        .ok()
        .map(|m| m.essence_str().to_ascii_lowercase())
}

fn path_fields(params: &Params) -> Map<String, Value> {
    params
        .iter()
        .map(|(name, value)| (name.to_string(), Value::String(value.to_string())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::BodyParser;
    use http::{HeaderValue, Method};
    use http_body_util::Full;
    use openproc_core::Schema;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn user_route(method: Method) -> RouteDefinition {
        RouteDefinition::builder(method, "/users/{id}", "user")
            .input(
                Schema::object()
                    .field("id", Schema::integer())
                    .optional("name", Schema::string())
                    .optional("tags", Schema::array(Schema::string())),
            )
            .build()
            .unwrap()
    }

    fn params(id: &str) -> Params {
        let mut params = Params::new();
        params.push("id", id);
        params
    }

    fn json_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }

    #[derive(Clone, Default)]
    struct CountingParser {
        calls: Arc<AtomicUsize>,
    }

    impl BodyParser for CountingParser {
        fn media_types(&self) -> &[&'static str] {
            &["application/json"]
        }

        fn parse(&self, body: &[u8]) -> Result<Value, ExtractionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            crate::JsonParser.parse(body)
        }
    }

    #[test]
    fn test_get_merges_query_and_path() {
        let route = user_route(Method::GET);
        let input = InputResolver::new()
            .assemble(&route, &params("5"), &HeaderMap::new(), Some("tags=a&tags=b"), &Bytes::new())
            .unwrap();
        assert_eq!(input, json!({"tags": ["a", "b"], "id": 5}));
    }

    #[test]
    fn test_get_ignores_body() {
        let route = user_route(Method::GET);
        let body = Bytes::from_static(b"{\"name\":\"ignored\"}");
        let input = InputResolver::new()
            .assemble(&route, &params("5"), &json_headers(), None, &body)
            .unwrap();
        assert_eq!(input, json!({"id": 5}));
    }

    #[test]
    fn test_path_param_beats_body_field() {
        let route = user_route(Method::PUT);
        let body = Bytes::from_static(b"{\"id\": 999, \"name\": \"Ada\"}");
        let input = InputResolver::new()
            .assemble(&route, &params("1"), &json_headers(), None, &body)
            .unwrap();
        assert_eq!(input, json!({"id": 1, "name": "Ada"}));
    }

    #[test]
    fn test_path_param_beats_query_field() {
        let route = user_route(Method::DELETE);
        let input = InputResolver::new()
            .assemble(&route, &params("1"), &HeaderMap::new(), Some("id=2"), &Bytes::new())
            .unwrap();
        assert_eq!(input["id"], json!(1));
    }

    #[test]
    fn test_post_ignores_query() {
        let route = user_route(Method::POST);
        let body = Bytes::from_static(b"{\"name\":\"Ada\"}");
        let input = InputResolver::new()
            .assemble(&route, &params("1"), &json_headers(), Some("name=Bob"), &body)
            .unwrap();
        assert_eq!(input["name"], json!("Ada"));
    }

    #[test]
    fn test_empty_body_yields_path_object() {
        let route = user_route(Method::POST);
        let input = InputResolver::new()
            .assemble(&route, &params("3"), &HeaderMap::new(), None, &Bytes::new())
            .unwrap();
        assert_eq!(input, json!({"id": 3}));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let route = user_route(Method::POST);
        let err = InputResolver::new()
            .assemble(&route, &params("1"), &json_headers(), None, &Bytes::from_static(b"{"))
            .unwrap_err();
        assert_eq!(err.error_code(), openproc_core::ErrorCode::ParseError);
    }

    #[test]
    fn test_missing_content_type_defaults_to_json() {
        let route = user_route(Method::POST);
        let input = InputResolver::new()
            .assemble(
                &route,
                &params("1"),
                &HeaderMap::new(),
                None,
                &Bytes::from_static(b"{\"name\":\"x\"}"),
            )
            .unwrap();
        assert_eq!(input["name"], json!("x"));
    }

    #[test]
    fn test_content_type_parameters_ignored() {
        let route = user_route(Method::POST);
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("Application/JSON; charset=utf-8"),
        );
        let input = InputResolver::new()
            .assemble(&route, &params("1"), &headers, None, &Bytes::from_static(b"{}"))
            .unwrap();
        assert_eq!(input, json!({"id": 1}));
    }

    #[test]
    fn test_unsupported_media_type() {
        let route = user_route(Method::POST);
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        let err = InputResolver::new()
            .assemble(&route, &params("1"), &headers, None, &Bytes::from_static(b"hi"))
            .unwrap_err();
        assert_eq!(err.status_code(), http::StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(err.to_string().contains("application/json"));
    }

    #[test]
    fn test_unreadable_content_type_is_unsupported() {
        let route = user_route(Method::POST);
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_bytes(b"text/plain; x=\xff").unwrap(),
        );
        let err = InputResolver::new()
            .assemble(
                &route,
                &params("1"),
                &headers,
                None,
                &Bytes::from_static(b"{\"name\":\"a\"}"),
            )
            .unwrap_err();
        assert_eq!(err.status_code(), http::StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[test]
    fn test_route_without_input_skips_body() {
        let route = RouteDefinition::post("/ping", "ping").build().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        let input = InputResolver::new()
            .assemble(&route, &Params::new(), &headers, None, &Bytes::from_static(b"hello"))
            .unwrap();
        assert_eq!(input, json!({}));

        let input = InputResolver::new()
            .assemble(&route, &Params::new(), &json_headers(), None, &Bytes::from_static(b"{oops"))
            .unwrap();
        assert_eq!(input, json!({}));
    }

    #[tokio::test]
    async fn test_route_without_input_never_reads_body() {
        let counter = CountingParser::default();
        let resolver = InputResolver::new()
            .parsers(ParserSet::empty().with(counter.clone()))
            .max_body_size(Some(1));
        let route = RouteDefinition::post("/ping", "ping").build().unwrap();
        let body = Full::new(Bytes::from_static(b"{oops"));

        let input = resolver
            .resolve(&route, &Params::new(), &json_headers(), None, body)
            .await
            .unwrap();
        assert_eq!(input, json!({}));
        assert_eq!(counter.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_route_narrows_content_types() {
        let route = RouteDefinition::post("/login", "login")
            .input(Schema::object().field("user", Schema::string()))
            .content_types(["application/x-www-form-urlencoded"])
            .build()
            .unwrap();
        let err = InputResolver::new()
            .assemble(&route, &Params::new(), &json_headers(), None, &Bytes::from_static(b"{}"))
            .unwrap_err();
        assert_eq!(err.status_code(), http::StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[test]
    fn test_form_body_coerced() {
        let route = RouteDefinition::post("/items", "createItem")
            .input(
                Schema::object()
                    .field("qty", Schema::integer())
                    .field("gift", Schema::boolean()),
            )
            .build()
            .unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        let input = InputResolver::new()
            .assemble(
                &route,
                &Params::new(),
                &headers,
                None,
                &Bytes::from_static(b"qty=3&gift=false"),
            )
            .unwrap();
        assert_eq!(input, json!({"qty": 3, "gift": false}));
    }

    #[test]
    fn test_json_body_not_coerced() {
        let route = RouteDefinition::post("/items", "createItem")
            .input(Schema::object().field("qty", Schema::integer()))
            .build()
            .unwrap();
        let input = InputResolver::new()
            .assemble(
                &route,
                &Params::new(),
                &json_headers(),
                None,
                &Bytes::from_static(b"{\"qty\":\"3\"}"),
            )
            .unwrap();
        assert_eq!(input["qty"], json!("3"));
    }

    #[test]
    fn test_non_object_body_passed_through() {
        let route = RouteDefinition::post("/bulk", "bulk")
            .input(Schema::array(Schema::integer()))
            .build()
            .unwrap();
        let input = InputResolver::new()
            .assemble(&route, &Params::new(), &json_headers(), None, &Bytes::from_static(b"[1,2]"))
            .unwrap();
        assert_eq!(input, json!([1, 2]));
    }

    #[tokio::test]
    async fn test_oversized_body_never_parsed() {
        let counter = CountingParser::default();
        let resolver = InputResolver::new()
            .parsers(ParserSet::empty().with(counter.clone()))
            .max_body_size(Some(8));
        let route = user_route(Method::POST);

        let mut headers = json_headers();
        headers.insert(http::header::CONTENT_LENGTH, HeaderValue::from_static("64"));
        let body = Full::new(Bytes::from(vec![b' '; 64]));
        let err = resolver
            .resolve(&route, &params("1"), &headers, None, body)
            .await
            .unwrap_err();
        assert!(err.is_payload_too_large());

        let body = Full::new(Bytes::from(vec![b' '; 64]));
        let err = resolver
            .resolve(&route, &params("1"), &json_headers(), None, body)
            .await
            .unwrap_err();
        assert!(err.is_payload_too_large());

        let err = resolver
            .assemble(&route, &params("1"), &json_headers(), None, &Bytes::from(vec![b' '; 64]))
            .unwrap_err();
        assert!(err.is_payload_too_large());

        assert_eq!(counter.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_get_never_reads_body() {
        let resolver = InputResolver::new().max_body_size(Some(1));
        let route = user_route(Method::GET);
        let mut headers = HeaderMap::new();
        headers.insert(http::header::CONTENT_LENGTH, HeaderValue::from_static("1000"));
        let body = Full::new(Bytes::from(vec![b'x'; 1000]));

        let input = resolver
            .resolve(&route, &params("2"), &headers, None, body)
            .await
            .unwrap();
        assert_eq!(input, json!({"id": 2}));
    }

    #[tokio::test]
    async fn test_resolve_within_limit_parses_once() {
        let counter = CountingParser::default();
        let resolver = InputResolver::new()
            .parsers(ParserSet::empty().with(counter.clone()))
            .max_body_size(Some(1024));
        let route = user_route(Method::PATCH);
        let body = Full::new(Bytes::from_static(b"{\"name\":\"Ada\"}"));

        let input = resolver
            .resolve(&route, &params("4"), &json_headers(), None, body)
            .await
            .unwrap();
        assert_eq!(input, json!({"name": "Ada", "id": 4}));
        assert_eq!(counter.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_media_essence() {
        assert_eq!(
            media_essence("application/json; charset=utf-8").as_deref(),
            Some("application/json")
        );
        assert_eq!(media_essence("not a mime"), None);
    }
}
