//! High-level router API.
//!
//! This module provides the main [`Router`] struct which is the primary
//! interface for building and matching routes.

use http::Method;

use crate::error::RouteError;
use crate::method_router::{MethodRouter, RouteEntry};
use crate::node::Node;
use crate::params::Params;
use crate::template::PathTemplate;
use crate::{Lookup, RouteMatch};

/// A radix tree path matcher for OpenAPI path templates.
///
/// Routes are matched in O(k) time where k is the number of path segments,
/// plus backtracking when a higher-ranked branch dead-ends.
///
/// # Example
///
/// ```rust
/// use openproc_router::Router;
/// use http::Method;
///
/// let mut router = Router::new();
/// router.insert(&Method::GET, "/users", "listUsers").unwrap();
/// router.insert(&Method::GET, "/users/{id}", "getUser").unwrap();
///
/// let result = router.match_route(&Method::GET, "/users/123").unwrap();
/// assert_eq!(result.procedure_id, "getUser");
/// assert_eq!(result.params.get("id"), Some("123"));
/// ```
///
/// # Route Priority
///
/// When multiple routes could match, each position is tried in this order:
///
/// 1. **Literal segments** (e.g., `/users/me`)
/// 2. **Parameter segments** (e.g., `/users/{id}`)
/// 3. **Catch-all segments** (e.g., `/files/{path+}`)
///
/// A branch that cannot complete is abandoned and the next kind is tried,
/// so the match with the longest literal prefix wins.
#[derive(Debug, Clone)]
pub struct Router {
    root: Node,
    routes: Vec<(Method, PathTemplate, String)>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    /// Creates a new empty router.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: Node::root(),
            routes: Vec::new(),
        }
    }

    /// Parses `template` and binds it to `procedure_id` for `method`.
    ///
    /// # Errors
    ///
    /// Fails if the template is malformed, the method is not routable, or a
    /// structurally identical template is already registered for `method`
    /// (templates differing only in parameter names collide).
    pub fn insert(
        &mut self,
        method: &Method,
        template: &str,
        procedure_id: impl Into<String>,
    ) -> Result<(), RouteError> {
        let template = PathTemplate::parse(template)?;
        self.insert_template(method, template, procedure_id)
    }

    /// Binds an already compiled template.
    ///
    /// # Errors
    ///
    /// See [`Router::insert`].
    pub fn insert_template(
        &mut self,
        method: &Method,
        template: PathTemplate,
        procedure_id: impl Into<String>,
    ) -> Result<(), RouteError> {
        let procedure_id = procedure_id.into();
        let node = self.root.node_for(template.segments());
        node.methods.insert(
            method,
            RouteEntry::new(procedure_id.clone(), template.clone()),
        )?;
        self.routes.push((method.clone(), template, procedure_id));
        Ok(())
    }

    /// Matches a method and raw (still percent-encoded) path.
    ///
    /// Returns `None` when no route for `method` matches, or when a path
    /// segment does not decode to valid UTF-8.
    #[must_use]
    pub fn match_route(&self, method: &Method, path: &str) -> Option<RouteMatch<'_>> {
        let segments = decode_segments(path)?;
        let mut captures = Vec::new();
        let methods = self
            .root
            .match_segments(&segments, &mut captures, &|m: &MethodRouter| {
                m.get(method).is_some()
            })?;
        let entry = methods.get(method)?;

        let params = entry
            .template()
            .param_names()
            .map(str::to_string)
            .zip(captures)
            .collect::<Params>();

        Some(RouteMatch {
            procedure_id: entry.procedure_id(),
            template: entry.template(),
            params,
        })
    }

    /// Returns the methods registered for the best-ranked route matching
    /// `path`, regardless of the request method. Empty when nothing matches.
    #[must_use]
    pub fn allowed_methods(&self, path: &str) -> Vec<Method> {
        let Some(segments) = decode_segments(path) else {
            return Vec::new();
        };
        let mut captures = Vec::new();
        self.root
            .match_segments(&segments, &mut captures, &|m: &MethodRouter| !m.is_empty())
            .map(MethodRouter::allowed_methods)
            .unwrap_or_default()
    }

    /// Resolves a request into a match, a method mismatch, or nothing.
    #[must_use]
    pub fn lookup(&self, method: &Method, path: &str) -> Lookup<'_> {
        if let Some(found) = self.match_route(method, path) {
            return Lookup::Matched(found);
        }
        let allowed = self.allowed_methods(path);
        if allowed.is_empty() {
            Lookup::NotFound
        } else {
            Lookup::MethodNotAllowed(allowed)
        }
    }

    /// Returns registered routes in registration order.
    pub fn routes(&self) -> impl Iterator<Item = (&Method, &PathTemplate, &str)> {
        self.routes
            .iter()
            .map(|(method, template, proc_id)| (method, template, proc_id.as_str()))
    }

    /// Returns the number of routes registered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns true if no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Splits a path into non-empty, percent-decoded segments.
fn decode_segments(path: &str) -> Option<Vec<String>> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| urlencoding::decode(s).ok().map(|c| c.into_owned()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router(routes: &[(Method, &str, &str)]) -> Router {
        let mut router = Router::new();
        for (method, template, proc_id) in routes {
            router.insert(method, template, *proc_id).unwrap();
        }
        router
    }

    #[test]
    fn test_router_new() {
        let router = Router::new();
        assert!(router.is_empty());
        assert_eq!(router.len(), 0);
    }

    #[test]
    fn test_router_match_static() {
        let router = router(&[(Method::GET, "/users", "listUsers")]);

        let result = router.match_route(&Method::GET, "/users").unwrap();
        assert_eq!(result.procedure_id, "listUsers");
        assert!(result.params.is_empty());
    }

    #[test]
    fn test_router_match_root() {
        let router = router(&[(Method::GET, "/", "health")]);
        assert_eq!(
            router.match_route(&Method::GET, "/").unwrap().procedure_id,
            "health"
        );
        assert!(router.match_route(&Method::GET, "/x").is_none());
    }

    #[test]
    fn test_router_param_names_per_method() {
        let router = router(&[
            (Method::GET, "/users/{id}", "getUser"),
            (Method::DELETE, "/users/{userId}", "deleteUser"),
        ]);

        let get = router.match_route(&Method::GET, "/users/7").unwrap();
        assert_eq!(get.params.get("id"), Some("7"));

        let delete = router.match_route(&Method::DELETE, "/users/7").unwrap();
        assert_eq!(delete.params.get("userId"), Some("7"));
        assert_eq!(delete.params.get("id"), None);
    }

    #[test]
    fn test_router_percent_decoding() {
        let router = router(&[(Method::GET, "/users/{name}", "getUser")]);

        let result = router
            .match_route(&Method::GET, "/users/j%C3%BCrgen%20m")
            .unwrap();
        assert_eq!(result.params.get("name"), Some("jürgen m"));

        let result = router.match_route(&Method::GET, "/users/a%2Fb").unwrap();
        assert_eq!(result.params.get("name"), Some("a/b"));
    }

    #[test]
    fn test_router_invalid_utf8_is_no_match() {
        let router = router(&[(Method::GET, "/users/{name}", "getUser")]);
        assert!(router.match_route(&Method::GET, "/users/%FF%FE").is_none());
    }

    #[test]
    fn test_router_trailing_and_repeated_slashes() {
        let router = router(&[(Method::GET, "/users/{id}", "getUser")]);
        assert!(router.match_route(&Method::GET, "/users/1/").is_some());
        assert!(router.match_route(&Method::GET, "//users//1").is_some());
    }

    #[test]
    fn test_router_case_sensitive_literals() {
        let router = router(&[(Method::GET, "/users", "listUsers")]);
        assert!(router.match_route(&Method::GET, "/Users").is_none());
    }

    #[test]
    fn test_router_lookup_method_not_allowed() {
        let router = router(&[
            (Method::GET, "/users", "listUsers"),
            (Method::POST, "/users", "createUser"),
        ]);

        match router.lookup(&Method::DELETE, "/users") {
            Lookup::MethodNotAllowed(allowed) => {
                assert_eq!(allowed, vec![Method::GET, Method::POST]);
            }
            other => panic!("expected MethodNotAllowed, got {other:?}"),
        }
        assert!(matches!(
            router.lookup(&Method::GET, "/posts"),
            Lookup::NotFound
        ));
        assert!(matches!(
            router.lookup(&Method::GET, "/users"),
            Lookup::Matched(_)
        ));
    }

    #[test]
    fn test_router_duplicate_shape_rejected() {
        let mut router = router(&[(Method::GET, "/users/{id}", "getUser")]);
        let err = router
            .insert(&Method::GET, "/users/{userId}", "fetchUser")
            .unwrap_err();
        assert!(matches!(err, RouteError::Conflict { .. }));
        assert_eq!(router.len(), 1);

        router
            .insert(&Method::PUT, "/users/{userId}", "updateUser")
            .unwrap();
        assert_eq!(router.len(), 2);
    }

    #[test]
    fn test_router_routes_in_registration_order() {
        let router = router(&[
            (Method::POST, "/b", "second"),
            (Method::GET, "/a", "first"),
        ]);
        let listed: Vec<_> = router
            .routes()
            .map(|(m, t, p)| (m.clone(), t.as_str().to_string(), p.to_string()))
            .collect();
        assert_eq!(
            listed,
            vec![
                (Method::POST, "/b".to_string(), "second".to_string()),
                (Method::GET, "/a".to_string(), "first".to_string()),
            ]
        );
    }
}
