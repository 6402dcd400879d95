//! # openproc Core
//!
//! Core types for bridging OpenAPI-style HTTP routes to typed procedures.
//!
//! - [`RouteDefinition`] / [`RouteTable`] - Route declarations and the compiled, immutable table
//! - [`Schema`] - Closed schema type with a pure validator producing ordered [`Issue`]s
//! - [`ProcedureRegistry`] - Typed async procedures, erased to JSON
//! - [`InvocationContext`] - What a procedure receives besides its input
//! - [`RequestContext`] / [`RequestId`] - Per-request metadata
//! - [`ProcedureError`] / [`StatusTable`] - Error codes and their HTTP mapping
//! - [`BuildError`] - Startup validation failures

#![doc(html_root_url = "https://docs.rs/openproc-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
mod error;
mod invocation;
mod procedure;
mod route;
pub mod schema;

pub use context::{RequestContext, RequestId, REQUEST_ID_HEADER};
pub use error::{
    issue_at, BuildError, ErrorCode, OpenApiErrorResponse, ProcedureError, ProcedureResult,
    StatusTable, INTERNAL_ERROR_MESSAGE, VALIDATION_ERROR_MESSAGE,
};
pub use invocation::InvocationContext;
pub use procedure::{BoxedProcedureResult, ErasedProcedure, ProcedureRegistry};
pub use route::{
    accepts_body, Resolution, RouteDefinition, RouteDefinitionBuilder, RouteMetadata, RouteTable,
};
pub use schema::{Issue, PathSegment, Schema};

pub use openproc_router::Params;
