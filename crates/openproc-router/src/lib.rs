//! Radix tree path matcher for OpenAPI path templates.
//!
//! Resolves `(method, path)` to the procedure bound to the matching
//! template, together with the decoded path parameters.
//!
//! # Features
//!
//! - **Radix Tree Matching**: O(k) path lookup vs O(n) linear scan
//! - **OpenAPI Templates**: `/users/{id}` plus a trailing catch-all `{path+}`
//! - **Backtracking**: literal > parameter > catch-all at every position
//! - **Conflict Detection**: structurally identical templates are rejected
//! - **405 Support**: allowed methods for a path that exists under other methods
//!
//! # Example
//!
//! ```rust
//! use openproc_router::{Lookup, Router};
//! use http::Method;
//!
//! let mut router = Router::new();
//! router.insert(&Method::GET, "/users", "listUsers").unwrap();
//! router.insert(&Method::POST, "/users", "createUser").unwrap();
//! router.insert(&Method::GET, "/users/{id}", "getUser").unwrap();
//! router.insert(&Method::GET, "/files/{path+}", "serveFile").unwrap();
//!
//! let m = router.match_route(&Method::GET, "/users/123").unwrap();
//! assert_eq!(m.procedure_id, "getUser");
//! assert_eq!(m.params.get("id"), Some("123"));
//!
//! let m = router.match_route(&Method::GET, "/files/img/logo.png").unwrap();
//! assert_eq!(m.params.get("path"), Some("img/logo.png"));
//!
//! assert!(matches!(router.lookup(&Method::DELETE, "/users"), Lookup::MethodNotAllowed(_)));
//! ```
//!
//! # Architecture
//!
//! ```text
//!                    (root)
//!                      │
//!              ┌───────┴───────┐
//!              │               │
//!            "users"        "files"
//!              │               │
//!        ┌─────┴─────┐      {path+}
//!        │           │
//!   [GET,POST]     {id}
//!                    │
//!                  [GET]
//! ```

mod error;
mod method_router;
mod node;
mod params;
mod router;
mod template;

pub use error::RouteError;
pub use method_router::{MethodRouter, RouteEntry};
pub use params::Params;
pub use router::Router;
pub use template::{PathTemplate, Segment};

use http::Method;

/// A matched route with its procedure id and decoded path parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'a> {
    /// Procedure bound to the matched route.
    pub procedure_id: &'a str,
    /// Template the route was declared with.
    pub template: &'a PathTemplate,
    /// Decoded path parameters, in template order.
    pub params: Params,
}

/// Outcome of [`Router::lookup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<'a> {
    /// A route matched both path and method.
    Matched(RouteMatch<'a>),
    /// The path matched, but only under the listed methods.
    MethodNotAllowed(Vec<Method>),
    /// Nothing matched the path.
    NotFound,
}
