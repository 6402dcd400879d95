//! HTTP method-based routing.
//!
//! This module provides [`MethodRouter`], which maps HTTP methods to route
//! entries for a single path shape.

use http::Method;

use crate::error::RouteError;
use crate::template::PathTemplate;

/// A registered route: the procedure it targets and the template it was
/// declared with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    procedure_id: String,
    template: PathTemplate,
}

impl RouteEntry {
    /// Creates a route entry.
    #[must_use]
    pub fn new(procedure_id: impl Into<String>, template: PathTemplate) -> Self {
        Self {
            procedure_id: procedure_id.into(),
            template,
        }
    }

    /// Returns the bound procedure id.
    #[must_use]
    pub fn procedure_id(&self) -> &str {
        &self.procedure_id
    }

    /// Returns the declared template.
    #[must_use]
    pub fn template(&self) -> &PathTemplate {
        &self.template
    }
}

/// Maps HTTP methods to route entries for one path shape.
///
/// # Example
///
/// ```rust
/// use openproc_router::{MethodRouter, PathTemplate, RouteEntry};
/// use http::Method;
///
/// let template = PathTemplate::parse("/users").unwrap();
/// let mut router = MethodRouter::new();
/// router.insert(&Method::GET, RouteEntry::new("listUsers", template.clone())).unwrap();
/// router.insert(&Method::POST, RouteEntry::new("createUser", template)).unwrap();
///
/// assert_eq!(router.get(&Method::GET).map(|e| e.procedure_id()), Some("listUsers"));
/// assert!(router.get(&Method::DELETE).is_none());
/// assert_eq!(router.allowed_methods(), vec![Method::GET, Method::POST]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MethodRouter {
    get: Option<RouteEntry>,
    post: Option<RouteEntry>,
    put: Option<RouteEntry>,
    delete: Option<RouteEntry>,
    patch: Option<RouteEntry>,
    head: Option<RouteEntry>,
    options: Option<RouteEntry>,
    trace: Option<RouteEntry>,
}

impl MethodRouter {
    /// Creates a new empty method router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, method: &Method) -> Option<&Option<RouteEntry>> {
        Some(match *method {
            Method::GET => &self.get,
            Method::POST => &self.post,
            Method::PUT => &self.put,
            Method::DELETE => &self.delete,
            Method::PATCH => &self.patch,
            Method::HEAD => &self.head,
            Method::OPTIONS => &self.options,
            Method::TRACE => &self.trace,
            _ => return None,
        })
    }

    fn slot_mut(&mut self, method: &Method) -> Option<&mut Option<RouteEntry>> {
        Some(match *method {
            Method::GET => &mut self.get,
            Method::POST => &mut self.post,
            Method::PUT => &mut self.put,
            Method::DELETE => &mut self.delete,
            Method::PATCH => &mut self.patch,
            Method::HEAD => &mut self.head,
            Method::OPTIONS => &mut self.options,
            Method::TRACE => &mut self.trace,
            _ => return None,
        })
    }

    /// Registers an entry for a method.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::Conflict`] if the method is already taken and
    /// [`RouteError::UnsupportedMethod`] for methods outside the routable set.
    pub fn insert(&mut self, method: &Method, entry: RouteEntry) -> Result<(), RouteError> {
        let slot = self
            .slot_mut(method)
            .ok_or_else(|| RouteError::UnsupportedMethod(method.clone()))?;

        if let Some(existing) = slot {
            return Err(RouteError::Conflict {
                method: method.clone(),
                template: entry.template.as_str().to_string(),
                existing: existing.template.as_str().to_string(),
                existing_procedure: existing.procedure_id.clone(),
            });
        }

        *slot = Some(entry);
        Ok(())
    }

    /// Returns the entry registered for a method.
    #[must_use]
    pub fn get(&self, method: &Method) -> Option<&RouteEntry> {
        self.slot(method)?.as_ref()
    }

    /// Returns true if no methods are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.allowed_methods().is_empty()
    }

    /// Returns the registered methods, in a stable order.
    #[must_use]
    pub fn allowed_methods(&self) -> Vec<Method> {
        [
            (Method::GET, &self.get),
            (Method::POST, &self.post),
            (Method::PUT, &self.put),
            (Method::DELETE, &self.delete),
            (Method::PATCH, &self.patch),
            (Method::HEAD, &self.head),
            (Method::OPTIONS, &self.options),
            (Method::TRACE, &self.trace),
        ]
        .into_iter()
        .filter_map(|(method, slot)| slot.as_ref().map(|_| method))
        .collect()
    }

    /// Formats the `Allow` header value.
    #[must_use]
    pub fn allow_header(&self) -> String {
        self.allowed_methods()
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}
