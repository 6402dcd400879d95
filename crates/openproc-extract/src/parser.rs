//! Pluggable body parsers.
//!
//! A [`BodyParser`] turns raw body bytes into a JSON value for the media
//! types it declares. The handler holds a [`ParserSet`]; by default it
//! carries [`JsonParser`] and [`FormParser`].
//!
//! # Example
//!
//! ```rust
//! use openproc_extract::ParserSet;
//!
//! let parsers = ParserSet::default();
//! assert!(parsers.find("application/json").is_some());
//! assert!(parsers.find("application/x-www-form-urlencoded").is_some());
//! assert!(parsers.find("text/plain").is_none());
//! ```

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::query::parse_form;
use crate::{ExtractionError, ExtractionSource};

/// Media type assumed for a body sent without a `Content-Type` header.
pub const DEFAULT_MEDIA_TYPE: &str = "application/json";

/// Decodes a request body into a JSON value.
pub trait BodyParser: Send + Sync + 'static {
    /// Media type essences this parser handles, lowercase
    /// (e.g. `application/json`).
    fn media_types(&self) -> &[&'static str];

    /// Parses the complete body.
    ///
    /// # Errors
    ///
    /// Returns a malformed-body error when the bytes are not valid for
    /// this media type.
    fn parse(&self, body: &[u8]) -> Result<Value, ExtractionError>;

    /// Returns true if parsed values are strings that should be coerced
    /// against the input schema.
    fn coerces_strings(&self) -> bool {
        false
    }
}

/// Strict JSON parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonParser;

impl BodyParser for JsonParser {
    fn media_types(&self) -> &[&'static str] {
        &["application/json"]
    }

    fn parse(&self, body: &[u8]) -> Result<Value, ExtractionError> {
        serde_json::from_slice(body)
            .map_err(|e| ExtractionError::malformed(ExtractionSource::Body, e.to_string()))
    }
}

/// `application/x-www-form-urlencoded` parser.
///
/// Produces an object of strings (arrays for repeated keys); values are
/// coerced against the input schema afterwards.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormParser;

impl BodyParser for FormParser {
    fn media_types(&self) -> &[&'static str] {
        &["application/x-www-form-urlencoded"]
    }

    fn parse(&self, body: &[u8]) -> Result<Value, ExtractionError> {
        parse_form(body).map(Value::Object)
    }

    fn coerces_strings(&self) -> bool {
        true
    }
}

/// Ordered set of body parsers; the first parser declaring a media type
/// handles it.
#[derive(Clone)]
pub struct ParserSet {
    parsers: Vec<Arc<dyn BodyParser>>,
}

impl ParserSet {
    /// Creates a set with no parsers.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            parsers: Vec::new(),
        }
    }

    /// Adds a parser after the existing ones.
    #[must_use]
    pub fn with(mut self, parser: impl BodyParser) -> Self {
        self.parsers.push(Arc::new(parser));
        self
    }

    /// Adds a parser ahead of the existing ones, overriding any parser
    /// declaring the same media types.
    #[must_use]
    pub fn with_override(mut self, parser: impl BodyParser) -> Self {
        self.parsers.insert(0, Arc::new(parser));
        self
    }

    /// Returns the parser for a lowercase media type essence.
    #[must_use]
    pub fn find(&self, essence: &str) -> Option<&dyn BodyParser> {
        self.parsers
            .iter()
            .find(|p| p.media_types().iter().any(|m| m.eq_ignore_ascii_case(essence)))
            .map(|p| p.as_ref())
    }

    /// Returns every supported media type, without duplicates.
    #[must_use]
    pub fn media_types(&self) -> Vec<&'static str> {
        let mut types: Vec<&'static str> = Vec::new();
        for media_type in self.parsers.iter().flat_map(|p| p.media_types().iter()) {
            if !types.contains(media_type) {
                types.push(*media_type);
            }
        }
        types
    }
}

impl Default for ParserSet {
    fn default() -> Self {
        Self::empty().with(JsonParser).with(FormParser)
    }
}

impl fmt::Debug for ParserSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserSet")
            .field("media_types", &self.media_types())
            .finish()
    }
}
