//! Error types for openproc.
//!
//! [`ProcedureError`] is the one error type that flows from any pipeline
//! stage (routing, extraction, validation, procedure code) to the response
//! mapper. Its [`ErrorCode`] decides the HTTP status through a fixed table,
//! optionally extended by an application [`StatusTable`].
//!
//! | Code | Status |
//! |---|---|
//! | `PARSE_ERROR` | 400 |
//! | `BAD_REQUEST` | 400 |
//! | `UNAUTHORIZED` | 401 |
//! | `PAYMENT_REQUIRED` | 402 |
//! | `FORBIDDEN` | 403 |
//! | `NOT_FOUND` | 404 |
//! | `METHOD_NOT_SUPPORTED` | 405 |
//! | `TIMEOUT` | 408 |
//! | `CONFLICT` | 409 |
//! | `PRECONDITION_FAILED` | 412 |
//! | `INPUT_TOO_LARGE` | 413 |
//! | `UNSUPPORTED_MEDIA_TYPE` | 415 |
//! | `UNPROCESSABLE_CONTENT` | 422 |
//! | `TOO_MANY_REQUESTS` | 429 |
//! | `CLIENT_CLOSED_REQUEST` | 499 |
//! | `INTERNAL_SERVER_ERROR` | 500 |
//! | `NOT_IMPLEMENTED` | 501 |
//! | `BAD_GATEWAY` | 502 |
//! | `SERVICE_UNAVAILABLE` | 503 |
//! | `GATEWAY_TIMEOUT` | 504 |

use std::collections::HashMap;
use std::fmt;

use http::{Method, StatusCode};
use openproc_router::RouteError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::{Issue, PathSegment};

/// Fixed message used for every internal or unmapped failure.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Message used for schema validation failures.
pub const VALIDATION_ERROR_MESSAGE: &str = "Input validation failed";

/// Result type alias using [`ProcedureError`].
pub type ProcedureResult<T> = Result<T, ProcedureError>;

/// Machine-readable error code carried in every error response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Malformed request body.
    ParseError,
    /// Input validation failure.
    BadRequest,
    /// Missing or invalid credentials.
    Unauthorized,
    /// Payment required.
    PaymentRequired,
    /// Caller lacks permission.
    Forbidden,
    /// No route matched, or a domain object was not found.
    NotFound,
    /// The path exists for another method.
    MethodNotSupported,
    /// The client took too long.
    Timeout,
    /// Conflicting state.
    Conflict,
    /// A precondition header failed.
    PreconditionFailed,
    /// Body over the configured limit.
    InputTooLarge,
    /// Body media type not accepted by the route.
    UnsupportedMediaType,
    /// Well-formed but semantically invalid input.
    UnprocessableContent,
    /// Rate limited.
    TooManyRequests,
    /// The client went away.
    ClientClosedRequest,
    /// Unexpected server failure.
    InternalServerError,
    /// Not implemented.
    NotImplemented,
    /// Upstream failure.
    BadGateway,
    /// Temporarily unavailable.
    ServiceUnavailable,
    /// Upstream timed out.
    GatewayTimeout,
    /// Application-defined code, resolved through a [`StatusTable`].
    Custom(String),
}

impl ErrorCode {
    const BUILTIN: [(Self, &'static str, u16); 20] = [
        (Self::ParseError, "PARSE_ERROR", 400),
        (Self::BadRequest, "BAD_REQUEST", 400),
        (Self::Unauthorized, "UNAUTHORIZED", 401),
        (Self::PaymentRequired, "PAYMENT_REQUIRED", 402),
        (Self::Forbidden, "FORBIDDEN", 403),
        (Self::NotFound, "NOT_FOUND", 404),
        (Self::MethodNotSupported, "METHOD_NOT_SUPPORTED", 405),
        (Self::Timeout, "TIMEOUT", 408),
        (Self::Conflict, "CONFLICT", 409),
        (Self::PreconditionFailed, "PRECONDITION_FAILED", 412),
        (Self::InputTooLarge, "INPUT_TOO_LARGE", 413),
        (Self::UnsupportedMediaType, "UNSUPPORTED_MEDIA_TYPE", 415),
        (Self::UnprocessableContent, "UNPROCESSABLE_CONTENT", 422),
        (Self::TooManyRequests, "TOO_MANY_REQUESTS", 429),
        (Self::ClientClosedRequest, "CLIENT_CLOSED_REQUEST", 499),
        (Self::InternalServerError, "INTERNAL_SERVER_ERROR", 500),
        (Self::NotImplemented, "NOT_IMPLEMENTED", 501),
        (Self::BadGateway, "BAD_GATEWAY", 502),
        (Self::ServiceUnavailable, "SERVICE_UNAVAILABLE", 503),
        (Self::GatewayTimeout, "GATEWAY_TIMEOUT", 504),
    ];

    /// Parses a code string; unknown strings become [`ErrorCode::Custom`].
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        Self::BUILTIN
            .iter()
            .find(|(_, name, _)| *name == code)
            .map_or_else(|| Self::Custom(code.to_string()), |(c, _, _)| c.clone())
    }

    /// Returns the wire representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Custom(code) => code,
            builtin => Self::BUILTIN
                .iter()
                .find(|(c, _, _)| c == builtin)
                .map_or("INTERNAL_SERVER_ERROR", |(_, name, _)| *name),
        }
    }

    /// Returns the fixed status for built-in codes, `None` for custom codes.
    #[must_use]
    pub fn builtin_status(&self) -> Option<StatusCode> {
        Self::BUILTIN
            .iter()
            .find(|(c, _, _)| c == self)
            .and_then(|(_, _, status)| StatusCode::from_u16(*status).ok())
    }

    /// Returns true for codes whose details must not reach the client.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::InternalServerError)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ErrorCode {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Ok(Self::from_code(&code))
    }
}

/// A failure produced anywhere in the request pipeline.
///
/// # Example
///
/// ```
/// use openproc_core::{ErrorCode, ProcedureError};
///
/// fn find_user(id: i64) -> Result<(), ProcedureError> {
///     Err(ProcedureError::not_found(format!("user {id} not found")))
/// }
///
/// let err = find_user(7).unwrap_err();
/// assert_eq!(err.code(), &ErrorCode::NotFound);
/// assert_eq!(err.message(), "user 7 not found");
/// ```
#[derive(Debug, Error)]
#[error("{code}: {message}")]
pub struct ProcedureError {
    code: ErrorCode,
    message: String,
    issues: Option<Vec<Issue>>,
    /// The underlying error (not exposed to clients).
    #[source]
    source: Option<anyhow::Error>,
}

impl ProcedureError {
    /// Creates an error with a code and message.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            issues: None,
            source: None,
        }
    }

    /// Creates an error with an application-defined code.
    #[must_use]
    pub fn custom(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::from_code(&code.into()), message)
    }

    /// Creates a `BAD_REQUEST` validation failure carrying `issues`.
    #[must_use]
    pub fn validation(issues: Vec<Issue>) -> Self {
        Self {
            code: ErrorCode::BadRequest,
            message: VALIDATION_ERROR_MESSAGE.to_string(),
            issues: Some(issues),
            source: None,
        }
    }

    /// Creates a `BAD_REQUEST` error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    /// Creates a `PARSE_ERROR` error.
    #[must_use]
    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ParseError, message)
    }

    /// Creates an `UNAUTHORIZED` error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// Creates a `FORBIDDEN` error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    /// Creates a `NOT_FOUND` error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Creates a `CONFLICT` error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    /// Creates an `INTERNAL_SERVER_ERROR`.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalServerError, message)
    }

    /// Creates an internal error with a source error.
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self {
            source: Some(source.into()),
            ..Self::internal(message)
        }
    }

    /// Attaches a source error.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Returns the error code.
    #[must_use]
    pub fn code(&self) -> &ErrorCode {
        &self.code
    }

    /// Returns the message as raised (may be internal).
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the validation issues, if any.
    #[must_use]
    pub fn issues(&self) -> Option<&[Issue]> {
        self.issues.as_deref()
    }

    /// Returns the hidden source error, if any.
    #[must_use]
    pub fn source_error(&self) -> Option<&anyhow::Error> {
        self.source.as_ref()
    }
}

impl From<anyhow::Error> for ProcedureError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(err.to_string()).with_source(err)
    }
}

impl From<serde_json::Error> for ProcedureError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal("serialization failed").with_source(err)
    }
}

/// Serializable error body returned for every failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenApiErrorResponse {
    /// Client-safe message.
    pub message: String,
    /// Error code string.
    pub code: String,
    /// Validation issues; present only for validation failures.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub issues: Option<Vec<Issue>>,
}

/// Code → status table: the fixed built-in mapping plus application codes.
///
/// # Example
///
/// ```
/// use openproc_core::{ProcedureError, StatusTable};
/// use http::StatusCode;
///
/// let table = StatusTable::new().with("QUOTA_EXCEEDED", StatusCode::TOO_MANY_REQUESTS);
///
/// let (status, body) = table.map(&ProcedureError::custom("QUOTA_EXCEEDED", "slow down"));
/// assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
/// assert_eq!(body.code, "QUOTA_EXCEEDED");
///
/// let (status, body) = table.map(&ProcedureError::custom("MYSTERY", "boom"));
/// assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
/// assert_eq!(body.message, "Internal server error");
/// ```
#[derive(Debug, Clone, Default)]
pub struct StatusTable {
    custom: HashMap<String, StatusCode>,
    rejected: Vec<(String, StatusCode)>,
}

impl StatusTable {
    /// Creates a table with only the built-in codes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares an application code.
    ///
    /// Built-in codes keep their fixed status. Only 4xx and 5xx statuses are
    /// accepted; any other declaration is left out of the table and reported
    /// by [`StatusTable::check`].
    #[must_use]
    pub fn with(mut self, code: impl Into<String>, status: StatusCode) -> Self {
        let code = code.into();
        if status.is_client_error() || status.is_server_error() {
            self.custom.insert(code, status);
        } else {
            self.rejected.push((code, status));
        }
        self
    }

    /// Fails if a code was declared with a non-error status.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::NonErrorStatus`] for the first such code.
    pub fn check(&self) -> Result<(), BuildError> {
        match self.rejected.first() {
            Some((code, status)) => Err(BuildError::NonErrorStatus {
                code: code.clone(),
                status: *status,
            }),
            None => Ok(()),
        }
    }

    /// Resolves the status for a code, `None` for unknown custom codes.
    #[must_use]
    pub fn status_for(&self, code: &ErrorCode) -> Option<StatusCode> {
        match code {
            ErrorCode::Custom(name) => self.custom.get(name).copied(),
            builtin => builtin.builtin_status(),
        }
    }

    /// Maps an error to its status and client-visible body.
    ///
    /// Internal errors and unknown custom codes become a 500 with the fixed
    /// generic message; their original message never leaves the server.
    #[must_use]
    pub fn map(&self, error: &ProcedureError) -> (StatusCode, OpenApiErrorResponse) {
        match self.status_for(error.code()) {
            Some(status) if !error.code().is_internal() => (
                status,
                OpenApiErrorResponse {
                    message: error.message().to_string(),
                    code: error.code().to_string(),
                    issues: error.issues().map(<[Issue]>::to_vec),
                },
            ),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, internal_body()),
        }
    }
}

fn internal_body() -> OpenApiErrorResponse {
    OpenApiErrorResponse {
        message: INTERNAL_ERROR_MESSAGE.to_string(),
        code: ErrorCode::InternalServerError.to_string(),
        issues: None,
    }
}

/// Startup errors raised while building the route table or handler.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A template is malformed or collides with another route.
    #[error(transparent)]
    Route(#[from] RouteError),

    /// A route references a procedure that was never registered.
    #[error("route {method} {template} references unknown procedure '{procedure_id}'")]
    UnknownProcedure {
        /// Route method.
        method: Method,
        /// Route template.
        template: String,
        /// Missing procedure id.
        procedure_id: String,
    },

    /// A procedure is registered but no route exposes it.
    #[error("procedure '{0}' is registered but no route exposes it")]
    UnroutedProcedure(String),

    /// The same procedure id was registered twice.
    #[error("procedure '{0}' is registered more than once")]
    DuplicateProcedure(String),

    /// A path parameter has no matching property in the input schema.
    #[error("route {method} {template}: path parameter '{param}' is missing from the input schema")]
    MissingPathParam {
        /// Route method.
        method: Method,
        /// Route template.
        template: String,
        /// Parameter name.
        param: String,
    },

    /// A route without a body declares a non-object input schema.
    #[error("route {method} {template}: input schema must be an object for {method} routes")]
    NonObjectInput {
        /// Route method.
        method: Method,
        /// Route template.
        template: String,
    },

    /// An application error code was declared with a status outside 4xx/5xx.
    #[error("error code '{code}' must map to a 4xx or 5xx status, not {status}")]
    NonErrorStatus {
        /// Application code.
        code: String,
        /// Declared status.
        status: StatusCode,
    },

    /// A declared content type does not parse as a media type.
    #[error("route {method} {template}: invalid content type '{content_type}'")]
    InvalidContentType {
        /// Route method.
        method: Method,
        /// Route template.
        template: String,
        /// Offending value.
        content_type: String,
    },
}

/// Convenience for building a single-issue validation error.
#[must_use]
pub fn issue_at(path: &[&str], message: impl Into<String>) -> Issue {
    Issue::new(
        path.iter().map(|s| PathSegment::Key((*s).to_string())).collect(),
        message,
    )
}
