//! # openproc Extract
//!
//! Input resolution for openproc: turns the path parameters, query string
//! and body of a request into the single JSON value a procedure's input
//! schema is validated against.
//!
//! | Piece | Description |
//! |-------|-------------|
//! | [`InputResolver`] | Merges path, query and body per method |
//! | [`read_body`] | Collects a body under a size limit |
//! | [`BodyParser`] | Pluggable body decoding ([`JsonParser`], [`FormParser`]) |
//! | [`coerce_fields`] | Converts string values to their declared types |
//!
//! ## Error Handling
//!
//! Every failure is an [`ExtractionError`], which converts into the
//! [`openproc_core::ProcedureError`] the response mapper renders:
//!
//! - Malformed body or query: `PARSE_ERROR` (400)
//! - Body over the limit: `INPUT_TOO_LARGE` (413)
//! - Media type not accepted: `UNSUPPORTED_MEDIA_TYPE` (415)

#![doc(html_root_url = "https://docs.rs/openproc-extract/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod body;
pub mod coerce;
mod error;
mod parser;
mod query;
mod resolver;

pub use body::{content_length, read_body};
pub use coerce::{coerce_fields, coerce_value};
pub use error::{ExtractionError, ExtractionSource};
pub use parser::{BodyParser, FormParser, JsonParser, ParserSet, DEFAULT_MEDIA_TYPE};
pub use query::parse_query;
pub use resolver::{media_essence, InputResolver};
