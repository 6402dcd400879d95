//! # openproc
//!
//! Serve typed procedures behind OpenAPI-described HTTP routes.
//!
//! Each route binds a method and a path template to a procedure id. A
//! request is matched, its input is assembled from path parameters, the
//! query string and the body, validated against the route's schema, handed
//! to the procedure, and the result is written with the route's declared
//! status. Every failure becomes an `OpenApiErrorResponse` body.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use openproc::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::new().with_optional_file("openproc.toml")?.load()?;
//!
//!     let routes = RouteTable::new([RouteDefinition::get("/users/{id}", "getUser")
//!         .input(Schema::object().field("id", Schema::integer()))
//!         .build()?])?;
//!
//!     let mut registry = ProcedureRegistry::new();
//!     registry.register("getUser", |_ctx, input: serde_json::Value| async move {
//!         Ok::<_, ProcedureError>(input)
//!     });
//!
//!     let handler = openproc::handler_builder(&config)
//!         .routes(routes)
//!         .registry(registry)
//!         .build()?;
//!
//!     openproc::serve(&config, handler).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Crates
//!
//! ```text
//! router ─► core ─► extract ─► server ─► openproc
//!                      docs ──────────────┘
//! telemetry, config ──────────────────────┘
//! ```

#![doc(html_root_url = "https://docs.rs/openproc/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod bootstrap;

pub use bootstrap::{handler_builder, serve, server_config, Error};

pub use openproc_config as config;
pub use openproc_core as core;
pub use openproc_docs as docs;
pub use openproc_extract as extract;
pub use openproc_router as router;
pub use openproc_server as server;
pub use openproc_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use openproc::prelude::*;
/// ```
pub mod prelude {
    pub use openproc_core::{
        issue_at, ErrorCode, InvocationContext, Issue, ProcedureError, ProcedureRegistry,
        ProcedureResult, RequestContext, RouteDefinition, RouteTable, Schema, StatusTable,
    };

    pub use openproc_extract::{BodyParser, ParserSet};

    pub use openproc_server::{
        ErrorKind, ErrorReport, OpenApiHandler, Server, ServerConfig, ShutdownSignal,
    };

    pub use openproc_config::{ConfigLoader, OpenprocConfig};

    pub use openproc_docs::OpenApiGenerator;
}
