//! Route definitions and the immutable route table.
//!
//! A [`RouteDefinition`] binds `method + path template` to a procedure id
//! together with the schemas and response metadata of that route. The
//! [`RouteTable`] compiles a set of definitions once at startup, rejecting
//! anything that could only fail later at request time.
//!
//! # Example
//!
//! ```rust
//! use openproc_core::{RouteDefinition, RouteTable, Resolution, Schema};
//! use http::{Method, StatusCode};
//!
//! let table = RouteTable::new([
//!     RouteDefinition::get("/users/{id}", "getUser")
//!         .input(Schema::object().field("id", Schema::integer()))
//!         .build()
//!         .unwrap(),
//!     RouteDefinition::post("/users", "createUser")
//!         .input(Schema::object().field("name", Schema::string()))
//!         .status(StatusCode::CREATED)
//!         .build()
//!         .unwrap(),
//! ])
//! .unwrap();
//!
//! match table.resolve(&Method::GET, "/users/42") {
//!     Resolution::Matched { route, params } => {
//!         assert_eq!(route.procedure_id(), "getUser");
//!         assert_eq!(params.get("id"), Some("42"));
//!     }
//!     _ => unreachable!(),
//! }
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use http::{Method, StatusCode};
use openproc_router::{Lookup, Params, PathTemplate, Router};
use serde::{Deserialize, Serialize};

use crate::error::BuildError;
use crate::procedure::ProcedureRegistry;
use crate::schema::Schema;

/// Returns true for methods whose input comes from the request body.
#[must_use]
pub fn accepts_body(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

/// Documentation metadata attached to a route.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteMetadata {
    /// Tags for grouping operations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Short summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Marks the operation as deprecated.
    #[serde(default)]
    pub deprecated: bool,
}

/// One route: method and template bound to a procedure.
#[derive(Debug, Clone)]
pub struct RouteDefinition {
    method: Method,
    template: PathTemplate,
    procedure_id: String,
    input_schema: Option<Schema>,
    output_schema: Option<Schema>,
    success_status: StatusCode,
    metadata: RouteMetadata,
    content_types: Option<Vec<String>>,
    enabled: bool,
}

impl RouteDefinition {
    /// Creates a builder for an arbitrary method.
    #[must_use]
    pub fn builder(
        method: Method,
        path: impl Into<String>,
        procedure_id: impl Into<String>,
    ) -> RouteDefinitionBuilder {
        RouteDefinitionBuilder::new(method, path, procedure_id)
    }

    /// Creates a GET route builder.
    #[must_use]
    pub fn get(path: impl Into<String>, procedure_id: impl Into<String>) -> RouteDefinitionBuilder {
        Self::builder(Method::GET, path, procedure_id)
    }

    /// Creates a POST route builder.
    #[must_use]
    pub fn post(path: impl Into<String>, procedure_id: impl Into<String>) -> RouteDefinitionBuilder {
        Self::builder(Method::POST, path, procedure_id)
    }

    /// Creates a PUT route builder.
    #[must_use]
    pub fn put(path: impl Into<String>, procedure_id: impl Into<String>) -> RouteDefinitionBuilder {
        Self::builder(Method::PUT, path, procedure_id)
    }

    /// Creates a PATCH route builder.
    #[must_use]
    pub fn patch(path: impl Into<String>, procedure_id: impl Into<String>) -> RouteDefinitionBuilder {
        Self::builder(Method::PATCH, path, procedure_id)
    }

    /// Creates a DELETE route builder.
    #[must_use]
    pub fn delete(path: impl Into<String>, procedure_id: impl Into<String>) -> RouteDefinitionBuilder {
        Self::builder(Method::DELETE, path, procedure_id)
    }

    /// Returns the HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the compiled path template.
    #[must_use]
    pub fn template(&self) -> &PathTemplate {
        &self.template
    }

    /// Returns the procedure id.
    #[must_use]
    pub fn procedure_id(&self) -> &str {
        &self.procedure_id
    }

    /// Returns the input schema. `None` means the procedure takes no input.
    #[must_use]
    pub fn input_schema(&self) -> Option<&Schema> {
        self.input_schema.as_ref()
    }

    /// Returns the output schema, if declared.
    #[must_use]
    pub fn output_schema(&self) -> Option<&Schema> {
        self.output_schema.as_ref()
    }

    /// Returns the status used for successful responses.
    #[must_use]
    pub fn success_status(&self) -> StatusCode {
        self.success_status
    }

    /// Returns the documentation metadata.
    #[must_use]
    pub fn metadata(&self) -> &RouteMetadata {
        &self.metadata
    }

    /// Returns the accepted body media types; `None` accepts every
    /// registered parser.
    #[must_use]
    pub fn content_types(&self) -> Option<&[String]> {
        self.content_types.as_deref()
    }

    /// Returns true if this route accepts a body of the given media type
    /// essence (e.g. `application/json`).
    #[must_use]
    pub fn accepts_content_type(&self, essence: &str) -> bool {
        self.content_types
            .as_ref()
            .map_or(true, |types| types.iter().any(|t| t.eq_ignore_ascii_case(essence)))
    }

    /// Returns false for routes that are declared but not served.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns true if the input is read from the body.
    #[must_use]
    pub fn reads_body(&self) -> bool {
        accepts_body(&self.method)
    }
}

/// Builder for [`RouteDefinition`].
#[derive(Debug, Clone)]
pub struct RouteDefinitionBuilder {
    method: Method,
    path: String,
    procedure_id: String,
    input_schema: Option<Schema>,
    output_schema: Option<Schema>,
    success_status: StatusCode,
    metadata: RouteMetadata,
    content_types: Option<Vec<String>>,
    enabled: bool,
}

impl RouteDefinitionBuilder {
    /// Creates a builder.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>, procedure_id: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            procedure_id: procedure_id.into(),
            input_schema: None,
            output_schema: None,
            success_status: StatusCode::OK,
            metadata: RouteMetadata::default(),
            content_types: None,
            enabled: true,
        }
    }

    /// Sets the input schema.
    #[must_use]
    pub fn input(mut self, schema: Schema) -> Self {
        self.input_schema = Some(schema);
        self
    }

    /// Sets the output schema.
    #[must_use]
    pub fn output(mut self, schema: Schema) -> Self {
        self.output_schema = Some(schema);
        self
    }

    /// Sets the success status (default `200 OK`).
    #[must_use]
    pub fn status(mut self, status: StatusCode) -> Self {
        self.success_status = status;
        self
    }

    /// Adds a tag.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.metadata.tags.push(tag.into());
        self
    }

    /// Sets the summary.
    #[must_use]
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.metadata.summary = Some(summary.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.metadata.description = Some(description.into());
        self
    }

    /// Marks the route as deprecated.
    #[must_use]
    pub fn deprecated(mut self) -> Self {
        self.metadata.deprecated = true;
        self
    }

    /// Restricts accepted body media types.
    #[must_use]
    pub fn content_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.content_types = Some(types.into_iter().map(Into::into).collect());
        self
    }

    /// Declares the route without serving it.
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Compiles the template and validates the route on its own.
    ///
    /// # Errors
    ///
    /// Fails on an invalid template, a path parameter missing from the input
    /// schema, a non-object input on a body-less route, or an unparsable
    /// content type.
    pub fn build(self) -> Result<RouteDefinition, BuildError> {
        let template = PathTemplate::parse(&self.path)?;
        let method = self.method;

        if !accepts_body(&method) {
            if let Some(schema) = &self.input_schema {
                if !schema.is_object() && !matches!(schema, Schema::Any) {
                    return Err(BuildError::NonObjectInput {
                        method,
                        template: self.path,
                    });
                }
            }
        }

        for param in template.param_names() {
            let declared = match &self.input_schema {
                Some(Schema::Any) => true,
                Some(schema) => schema.property_schema(param).is_some(),
                None => false,
            };
            if !declared {
                return Err(BuildError::MissingPathParam {
                    method,
                    template: self.path,
                    param: param.to_string(),
                });
            }
        }

        let content_types = match self.content_types {
            Some(types) => {
                let mut normalized = Vec::with_capacity(types.len());
                for raw in types {
                    let parsed: mime::Mime =
                        raw.parse().map_err(|_| BuildError::InvalidContentType {
                            method: method.clone(),
                            template: self.path.clone(),
                            content_type: raw.clone(),
                        })?;
                    normalized.push(parsed.essence_str().to_ascii_lowercase());
                }
                Some(normalized)
            }
            None => None,
        };

        Ok(RouteDefinition {
            method,
            template,
            procedure_id: self.procedure_id,
            input_schema: self.input_schema,
            output_schema: self.output_schema,
            success_status: self.success_status,
            metadata: self.metadata,
            content_types,
            enabled: self.enabled,
        })
    }
}

/// Outcome of resolving a request against the [`RouteTable`].
#[derive(Debug)]
pub enum Resolution<'a> {
    /// A route matched both path and method.
    Matched {
        /// The matched route.
        route: &'a Arc<RouteDefinition>,
        /// Decoded path parameters.
        params: Params,
    },
    /// The path exists only for other methods.
    MethodNotAllowed(Vec<Method>),
    /// Nothing matched.
    NotFound,
}

/// Immutable, compiled set of routes.
///
/// Built once at startup and shared read-only across requests.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Arc<RouteDefinition>>,
    index: HashMap<(Method, String), usize>,
    router: Router,
}

impl RouteTable {
    /// Compiles route definitions.
    ///
    /// Disabled routes are kept for listing but never matched.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Route`] when two enabled routes share a method
    /// and a structurally identical template.
    pub fn new(routes: impl IntoIterator<Item = RouteDefinition>) -> Result<Self, BuildError> {
        let mut table = Self {
            routes: Vec::new(),
            index: HashMap::new(),
            router: Router::new(),
        };

        for route in routes {
            if route.enabled {
                table.router.insert_template(
                    &route.method,
                    route.template.clone(),
                    route.procedure_id.clone(),
                )?;
                table.index.insert(
                    (route.method.clone(), route.template.as_str().to_string()),
                    table.routes.len(),
                );
            }
            table.routes.push(Arc::new(route));
        }

        tracing::debug!(
            routes = table.routes.len(),
            enabled = table.router.len(),
            "route table compiled"
        );
        Ok(table)
    }

    /// Resolves a method and raw path.
    #[must_use]
    pub fn resolve(&self, method: &Method, path: &str) -> Resolution<'_> {
        match self.router.lookup(method, path) {
            Lookup::Matched(found) => {
                let key = (method.clone(), found.template.as_str().to_string());
                match self.index.get(&key) {
                    Some(&i) => Resolution::Matched {
                        route: &self.routes[i],
                        params: found.params,
                    },
                    None => Resolution::NotFound,
                }
            }
            Lookup::MethodNotAllowed(allowed) => Resolution::MethodNotAllowed(allowed),
            Lookup::NotFound => Resolution::NotFound,
        }
    }

    /// Checks that routes and procedures cover each other exactly.
    ///
    /// # Errors
    ///
    /// Fails on a duplicate procedure registration, an enabled route whose
    /// procedure is missing, or a procedure no route exposes.
    pub fn check_procedures<C: Send + Sync + 'static>(
        &self,
        registry: &ProcedureRegistry<C>,
    ) -> Result<(), BuildError> {
        registry.check()?;

        for route in self.routes.iter().filter(|r| r.enabled) {
            if !registry.contains(&route.procedure_id) {
                return Err(BuildError::UnknownProcedure {
                    method: route.method.clone(),
                    template: route.template.as_str().to_string(),
                    procedure_id: route.procedure_id.clone(),
                });
            }
        }

        let exposed: HashSet<&str> = self.routes.iter().map(|r| r.procedure_id()).collect();
        if let Some(id) = registry.ids().into_iter().find(|id| !exposed.contains(id)) {
            return Err(BuildError::UnroutedProcedure(id.to_string()));
        }

        Ok(())
    }

    /// Returns every route, enabled or not, in declaration order.
    pub fn routes(&self) -> impl Iterator<Item = &RouteDefinition> {
        self.routes.iter().map(AsRef::as_ref)
    }

    /// Returns the number of declared routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns true if no routes are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
