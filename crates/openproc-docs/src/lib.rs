//! # openproc Docs
//!
//! OpenAPI 3.1 document generation for openproc route tables.
//!
//! The document is derived from the same [`RouteTable`](openproc_core::RouteTable)
//! the handler serves, so it cannot drift from the routing:
//! - path parameters become `in: path` parameters
//! - the input properties of GET and DELETE routes become `in: query`
//!   parameters
//! - the input of body routes, minus path parameters, becomes the
//!   `requestBody` for each accepted media type
//! - the declared success status carries the output schema and every
//!   failure status refers to the shared `OpenApiErrorResponse` schema
//! - disabled routes are left out
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use openproc_docs::OpenApiGenerator;
//!
//! let json = OpenApiGenerator::new()
//!     .title("Users API")
//!     .version("1.0.0")
//!     .server("https://api.example.com/v1", None)
//!     .generate_json(&routes)?;
//! ```

mod error;
mod openapi;
mod schema;

pub use error::{DocsError, DocsResult};
pub use openapi::{
    Components, Info, MediaType, OpenApi, OpenApiGenerator, Operation, Parameter, ParameterIn,
    PathItem, RequestBody, Response, Server, Tag, OPENAPI_VERSION,
};
pub use schema::{error_response_schema, json_schema, ERROR_SCHEMA_NAME};
