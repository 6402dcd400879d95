//! Extraction error types.
//!
//! Every failure to turn a request into procedure input is an
//! [`ExtractionError`], which records where the input was being read from and
//! converts into the [`ProcedureError`] the response mapper renders.

use http::StatusCode;
use openproc_core::{ErrorCode, ProcedureError};
use std::fmt;

/// Where input was being extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionSource {
    /// Path parameters (e.g., `/users/{id}`)
    Path,
    /// Query string parameters
    Query,
    /// Request body
    Body,
    /// Content-Type header
    ContentType,
}

impl fmt::Display for ExtractionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path => write!(f, "path"),
            Self::Query => write!(f, "query"),
            Self::Body => write!(f, "body"),
            Self::ContentType => write!(f, "content-type"),
        }
    }
}

/// Error that occurs while resolving procedure input.
///
/// # Example
///
/// ```rust
/// use openproc_extract::{ExtractionError, ExtractionSource};
/// use http::StatusCode;
///
/// let err = ExtractionError::payload_too_large(1024, Some(2048));
/// assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
/// assert_eq!(err.extraction_source(), ExtractionSource::Body);
/// assert!(err.to_string().contains("1024"));
/// ```
#[derive(Debug)]
pub struct ExtractionError {
    extraction_source: ExtractionSource,
    kind: ExtractionErrorKind,
    message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExtractionErrorKind {
    /// Body or query could not be decoded
    Malformed,
    /// Body is over the configured limit
    PayloadTooLarge,
    /// Content-Type is not accepted
    UnsupportedMediaType,
    /// The body stream failed before completing
    BodyRead,
}

impl ExtractionError {
    /// Creates an error for input that could not be decoded.
    #[must_use]
    pub fn malformed(source: ExtractionSource, details: impl Into<String>) -> Self {
        Self {
            extraction_source: source,
            kind: ExtractionErrorKind::Malformed,
            message: format!("failed to parse {source}: {}", details.into()),
        }
    }

    /// Creates an error for a body over the limit.
    ///
    /// `actual` is the declared length when known; a streamed body is
    /// aborted as soon as it crosses the limit, so its size is unknown.
    #[must_use]
    pub fn payload_too_large(max: usize, actual: Option<u64>) -> Self {
        let message = match actual {
            Some(actual) => {
                format!("request body too large: {actual} bytes exceeds limit of {max} bytes")
            }
            None => format!("request body too large: exceeds limit of {max} bytes"),
        };
        Self {
            extraction_source: ExtractionSource::Body,
            kind: ExtractionErrorKind::PayloadTooLarge,
            message,
        }
    }

    /// Creates an error for a media type the route does not accept.
    #[must_use]
    pub fn unsupported_media_type(actual: Option<&str>, accepted: &[&str]) -> Self {
        let actual = actual.unwrap_or("none");
        Self {
            extraction_source: ExtractionSource::ContentType,
            kind: ExtractionErrorKind::UnsupportedMediaType,
            message: format!(
                "unsupported content type '{actual}', expected one of: {}",
                accepted.join(", ")
            ),
        }
    }

    /// Creates an error for a body stream that failed mid-read.
    #[must_use]
    pub fn body_read(details: impl Into<String>) -> Self {
        Self {
            extraction_source: ExtractionSource::Body,
            kind: ExtractionErrorKind::BodyRead,
            message: format!("failed to read request body: {}", details.into()),
        }
    }

    /// Returns where the error occurred.
    #[must_use]
    pub fn extraction_source(&self) -> ExtractionSource {
        self.extraction_source
    }

    /// Returns the human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the error code this failure is reported under.
    #[must_use]
    pub fn error_code(&self) -> ErrorCode {
        match self.kind {
            ExtractionErrorKind::Malformed => ErrorCode::ParseError,
            ExtractionErrorKind::PayloadTooLarge => ErrorCode::InputTooLarge,
            ExtractionErrorKind::UnsupportedMediaType => ErrorCode::UnsupportedMediaType,
            ExtractionErrorKind::BodyRead => ErrorCode::ClientClosedRequest,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self.kind {
            ExtractionErrorKind::Malformed => StatusCode::BAD_REQUEST,
            ExtractionErrorKind::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ExtractionErrorKind::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ExtractionErrorKind::BodyRead => self
                .error_code()
                .builtin_status()
                .unwrap_or(StatusCode::BAD_REQUEST),
        }
    }

    /// Returns true if the body was rejected for its size.
    #[must_use]
    pub fn is_payload_too_large(&self) -> bool {
        self.kind == ExtractionErrorKind::PayloadTooLarge
    }
}

impl fmt::Display for ExtractionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExtractionError {}

impl From<ExtractionError> for ProcedureError {
    fn from(err: ExtractionError) -> Self {
        ProcedureError::new(err.error_code(), err.message)
    }
}
