//! OpenAPI path template parsing.
//!
//! A template is a `/`-separated list of segments:
//!
//! | Syntax | Kind | Matches |
//! |--------|------|---------|
//! | `users` | literal | exactly `users` (case-sensitive) |
//! | `{id}` | parameter | exactly one segment |
//! | `{path+}` or `*path` | catch-all | one or more trailing segments |
//!
//! Empty segments are ignored, so `/users/` and `//users` compile to the
//! same template as `/users`.

use std::fmt;

use crate::error::RouteError;

/// A single compiled template segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Literal path segment (e.g., `users`).
    Literal(String),
    /// Named single-segment parameter (e.g., `{id}`).
    Param(String),
    /// Named trailing catch-all (e.g., `{path+}`).
    CatchAll(String),
}

impl Segment {
    /// Returns the parameter name, if this segment binds one.
    #[must_use]
    pub fn param_name(&self) -> Option<&str> {
        match self {
            Self::Literal(_) => None,
            Self::Param(name) | Self::CatchAll(name) => Some(name),
        }
    }
}

/// A compiled OpenAPI path template.
///
/// # Example
///
/// ```rust
/// use openproc_router::{PathTemplate, Segment};
///
/// let template = PathTemplate::parse("/orgs/{orgId}/files/{path+}").unwrap();
/// assert_eq!(template.param_names().collect::<Vec<_>>(), vec!["orgId", "path"]);
/// assert_eq!(template.segments()[0], Segment::Literal("orgs".to_string()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    /// Parses and validates a path template.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::InvalidTemplate`] when the template does not start
    /// with `/`, has unbalanced braces, an empty or duplicate parameter name,
    /// or a catch-all that is not the last segment.
    pub fn parse(template: &str) -> Result<Self, RouteError> {
        if !template.starts_with('/') {
            return Err(RouteError::invalid(template, "must start with '/'"));
        }

        let parts: Vec<&str> = template.split('/').filter(|s| !s.is_empty()).collect();
        let mut segments = Vec::with_capacity(parts.len());

        for (index, part) in parts.iter().enumerate() {
            let segment = Self::parse_segment(template, part)?;

            if matches!(segment, Segment::CatchAll(_)) && index + 1 != parts.len() {
                return Err(RouteError::invalid(
                    template,
                    "catch-all must be the last segment",
                ));
            }

            if let Some(name) = segment.param_name() {
                if segments
                    .iter()
                    .any(|s: &Segment| s.param_name() == Some(name))
                {
                    return Err(RouteError::invalid(
                        template,
                        format!("duplicate parameter '{name}'"),
                    ));
                }
            }

            segments.push(segment);
        }

        Ok(Self {
            raw: template.to_string(),
            segments,
        })
    }

    fn parse_segment(template: &str, part: &str) -> Result<Segment, RouteError> {
        if let Some(inner) = part.strip_prefix('{') {
            let inner = inner
                .strip_suffix('}')
                .ok_or_else(|| RouteError::invalid(template, "unclosed '{'"))?;
            let (name, catch_all) = match inner.strip_suffix('+') {
                Some(name) => (name, true),
                None => (inner, false),
            };
            Self::check_name(template, name)?;
            return Ok(if catch_all {
                Segment::CatchAll(name.to_string())
            } else {
                Segment::Param(name.to_string())
            });
        }

        if let Some(name) = part.strip_prefix('*') {
            Self::check_name(template, name)?;
            return Ok(Segment::CatchAll(name.to_string()));
        }

        if part.contains(['{', '}']) {
            return Err(RouteError::invalid(
                template,
                format!("segment '{part}' mixes literal text and a parameter"),
            ));
        }

        Ok(Segment::Literal(part.to_string()))
    }

    fn check_name(template: &str, name: &str) -> Result<(), RouteError> {
        if name.is_empty() {
            return Err(RouteError::invalid(template, "empty parameter name"));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
        {
            return Err(RouteError::invalid(
                template,
                format!("invalid parameter name '{name}'"),
            ));
        }
        Ok(())
    }

    /// Returns the template as originally written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the compiled segments.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns parameter names in template order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(Segment::param_name)
    }

    /// Returns `true` if the last segment is a catch-all.
    #[must_use]
    pub fn has_catch_all(&self) -> bool {
        matches!(self.segments.last(), Some(Segment::CatchAll(_)))
    }

    /// Renders the template in OpenAPI form (`{name}` for every parameter).
    #[must_use]
    pub fn to_openapi(&self) -> String {
        if self.segments.is_empty() {
            return "/".to_string();
        }
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(lit) => format!("/{lit}"),
                Segment::Param(name) | Segment::CatchAll(name) => format!("/{{{name}}}"),
            })
            .collect()
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_literal_and_params() {
        let t = PathTemplate::parse("/users/{id}/posts").unwrap();
        assert_eq!(
            t.segments(),
            &[
                Segment::Literal("users".to_string()),
                Segment::Param("id".to_string()),
                Segment::Literal("posts".to_string()),
            ]
        );
        assert!(!t.has_catch_all());
    }

    #[test]
    fn test_parse_catch_all_forms() {
        let plus = PathTemplate::parse("/files/{path+}").unwrap();
        let star = PathTemplate::parse("/files/*path").unwrap();
        assert_eq!(plus.segments(), star.segments());
        assert!(plus.has_catch_all());
        assert_eq!(plus.to_openapi(), "/files/{path}");
    }

    #[test]
    fn test_root_template() {
        let t = PathTemplate::parse("/").unwrap();
        assert!(t.segments().is_empty());
        assert_eq!(t.to_openapi(), "/");
    }

    #[test]
    fn test_empty_segments_ignored() {
        let t = PathTemplate::parse("//users///{id}/").unwrap();
        assert_eq!(t.segments().len(), 2);
    }

    #[test]
    fn test_rejects_malformed_templates() {
        for bad in [
            "users",
            "/users/{id",
            "/users/{}",
            "/users/id}",
            "/users/pre{id}",
            "/files/{path+}/tail",
            "/files/*rest/more",
            "/a/{id}/b/{id}",
            "/a/{bad name}",
        ] {
            assert!(
                matches!(
                    PathTemplate::parse(bad),
                    Err(RouteError::InvalidTemplate { .. })
                ),
                "expected '{bad}' to be rejected"
            );
        }
    }
}
