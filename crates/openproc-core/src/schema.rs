//! Declarative input/output schemas and a pure recursive validator.
//!
//! [`Schema`] is a closed set of variants covering the JSON shapes a route
//! can declare. Validation walks the schema (not the input), so issues come
//! out in declaration order, and returns a cleaned copy of the input with
//! unknown object keys stripped.
//!
//! # Example
//!
//! ```
//! use openproc_core::schema::{Schema, PathSegment};
//! use serde_json::json;
//!
//! let schema = Schema::object()
//!     .field("id", Schema::integer())
//!     .field("name", Schema::string().min_length(1))
//!     .optional("nickname", Schema::string());
//!
//! let clean = schema.validate(&json!({"id": 1, "name": "a", "extra": true})).unwrap();
//! assert_eq!(clean, json!({"id": 1, "name": "a"}));
//!
//! let issues = schema.validate(&json!({"id": 1})).unwrap_err();
//! assert_eq!(issues[0].path, vec![PathSegment::Key("name".into())]);
//! assert_eq!(issues[0].message, "Required");
//! ```

use std::fmt;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One step in the location of a validation issue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// Object key.
    Key(String),
    /// Array index.
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// One structured complaint about one input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Location of the offending value; empty for the root.
    pub path: Vec<PathSegment>,
    /// Human-readable description.
    pub message: String,
}

impl Issue {
    /// Creates an issue at `path`.
    #[must_use]
    pub fn new(path: Vec<PathSegment>, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            return write!(f, "{}", self.message);
        }
        let path = self
            .path
            .iter()
            .map(|segment| match segment {
                PathSegment::Key(key) => key.clone(),
                PathSegment::Index(index) => index.to_string(),
            })
            .collect::<Vec<_>>()
            .join(".");
        write!(f, "{path}: {}", self.message)
    }
}

/// A compiled regular expression that round-trips through serde as its
/// source string.
#[derive(Debug, Clone)]
pub struct Pattern(Regex);

impl Pattern {
    /// Compiles a pattern.
    ///
    /// # Errors
    ///
    /// Returns the regex compile error for invalid patterns.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Self)
    }

    /// Returns the pattern source.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    fn is_match(&self, s: &str) -> bool {
        self.0.is_match(s)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Serialize for Pattern {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Self::new(&source).map_err(serde::de::Error::custom)
    }
}

/// Well-known string formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StringFormat {
    /// `local@domain.tld`
    Email,
    /// RFC 4122 UUID.
    Uuid,
    /// RFC 3339 timestamp.
    DateTime,
    /// Absolute URI with a scheme.
    Uri,
}

impl StringFormat {
    fn accepts(self, s: &str) -> bool {
        match self {
            Self::Email => is_email(s),
            Self::Uuid => uuid::Uuid::parse_str(s).is_ok(),
            Self::DateTime => chrono::DateTime::parse_from_rfc3339(s).is_ok(),
            Self::Uri => s
                .parse::<http::Uri>()
                .map(|uri| uri.scheme().is_some())
                .unwrap_or(false),
        }
    }

    /// Returns the OpenAPI format name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Uuid => "uuid",
            Self::DateTime => "date-time",
            Self::Uri => "uri",
        }
    }
}

fn is_email(s: &str) -> bool {
    if s.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

/// An object property: its schema and whether it must be present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    /// Property schema.
    pub schema: Schema,
    /// Whether the key must be present.
    #[serde(default = "default_true")]
    pub required: bool,
}

fn default_true() -> bool {
    true
}

/// A declared JSON shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Schema {
    /// String type.
    String {
        /// Minimum length in characters.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_length: Option<usize>,
        /// Maximum length in characters.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_length: Option<usize>,
        /// Regex the value must match.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pattern: Option<Pattern>,
        /// Well-known format.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<StringFormat>,
    },
    /// Integer type.
    Integer {
        /// Inclusive minimum.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        minimum: Option<i64>,
        /// Inclusive maximum.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        maximum: Option<i64>,
    },
    /// Number (float) type.
    Number {
        /// Inclusive minimum.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        minimum: Option<f64>,
        /// Inclusive maximum.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        maximum: Option<f64>,
    },
    /// Boolean type.
    Boolean,
    /// One of a fixed set of values.
    Enum {
        /// Allowed values.
        values: Vec<Value>,
    },
    /// Array type.
    Array {
        /// Schema for array items.
        items: Box<Schema>,
        /// Minimum number of items.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_items: Option<usize>,
        /// Maximum number of items.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_items: Option<usize>,
    },
    /// Object type with ordered properties.
    Object {
        /// Properties in declaration order.
        #[serde(default)]
        properties: IndexMap<String, Property>,
        /// Keep keys not listed in `properties`.
        #[serde(default)]
        additional_properties: bool,
    },
    /// The inner schema, or `null`.
    Nullable {
        /// Schema for non-null values.
        inner: Box<Schema>,
    },
    /// Accepts anything.
    Any,
}

impl Schema {
    /// Creates a string schema.
    #[must_use]
    pub fn string() -> Self {
        Self::String {
            min_length: None,
            max_length: None,
            pattern: None,
            format: None,
        }
    }

    /// Creates an integer schema.
    #[must_use]
    pub fn integer() -> Self {
        Self::Integer {
            minimum: None,
            maximum: None,
        }
    }

    /// Creates a number schema.
    #[must_use]
    pub fn number() -> Self {
        Self::Number {
            minimum: None,
            maximum: None,
        }
    }

    /// Creates a boolean schema.
    #[must_use]
    pub fn boolean() -> Self {
        Self::Boolean
    }

    /// Creates an enum schema from string values.
    #[must_use]
    pub fn enumeration<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Enum {
            values: values.into_iter().map(|v| Value::String(v.into())).collect(),
        }
    }

    /// Creates an array schema.
    #[must_use]
    pub fn array(items: Schema) -> Self {
        Self::Array {
            items: Box::new(items),
            min_items: None,
            max_items: None,
        }
    }

    /// Creates an empty object schema; add fields with [`Schema::field`].
    #[must_use]
    pub fn object() -> Self {
        Self::Object {
            properties: IndexMap::new(),
            additional_properties: false,
        }
    }

    /// Wraps this schema so that `null` is also accepted.
    #[must_use]
    pub fn nullable(self) -> Self {
        Self::Nullable {
            inner: Box::new(self),
        }
    }

    /// Creates a schema that accepts any value.
    #[must_use]
    pub fn any() -> Self {
        Self::Any
    }

    /// Adds a required property to an object schema.
    #[must_use]
    pub fn field(self, name: impl Into<String>, schema: Schema) -> Self {
        self.property(name, schema, true)
    }

    /// Adds an optional property to an object schema.
    #[must_use]
    pub fn optional(self, name: impl Into<String>, schema: Schema) -> Self {
        self.property(name, schema, false)
    }

    fn property(mut self, name: impl Into<String>, schema: Schema, required: bool) -> Self {
        if let Self::Object { properties, .. } = &mut self {
            properties.insert(name.into(), Property { schema, required });
        }
        self
    }

    /// Allows keys not listed in an object schema to pass through.
    #[must_use]
    pub fn allow_additional(mut self) -> Self {
        if let Self::Object {
            additional_properties,
            ..
        } = &mut self
        {
            *additional_properties = true;
        }
        self
    }

    /// Sets the minimum length for string schemas.
    #[must_use]
    pub fn min_length(mut self, len: usize) -> Self {
        if let Self::String { min_length, .. } = &mut self {
            *min_length = Some(len);
        }
        self
    }

    /// Sets the maximum length for string schemas.
    #[must_use]
    pub fn max_length(mut self, len: usize) -> Self {
        if let Self::String { max_length, .. } = &mut self {
            *max_length = Some(len);
        }
        self
    }

    /// Sets the pattern for string schemas.
    #[must_use]
    pub fn pattern(mut self, regex: Pattern) -> Self {
        if let Self::String { pattern, .. } = &mut self {
            *pattern = Some(regex);
        }
        self
    }

    /// Sets the format for string schemas.
    #[must_use]
    pub fn format(mut self, value: StringFormat) -> Self {
        if let Self::String { format, .. } = &mut self {
            *format = Some(value);
        }
        self
    }

    /// Sets the minimum for integer schemas.
    #[must_use]
    pub fn minimum_int(mut self, min: i64) -> Self {
        if let Self::Integer { minimum, .. } = &mut self {
            *minimum = Some(min);
        }
        self
    }

    /// Sets the maximum for integer schemas.
    #[must_use]
    pub fn maximum_int(mut self, max: i64) -> Self {
        if let Self::Integer { maximum, .. } = &mut self {
            *maximum = Some(max);
        }
        self
    }

    /// Sets the minimum for number schemas.
    #[must_use]
    pub fn minimum(mut self, min: f64) -> Self {
        if let Self::Number { minimum, .. } = &mut self {
            *minimum = Some(min);
        }
        self
    }

    /// Sets the maximum for number schemas.
    #[must_use]
    pub fn maximum(mut self, max: f64) -> Self {
        if let Self::Number { maximum, .. } = &mut self {
            *maximum = Some(max);
        }
        self
    }

    /// Sets the minimum items for array schemas.
    #[must_use]
    pub fn min_items(mut self, min: usize) -> Self {
        if let Self::Array { min_items, .. } = &mut self {
            *min_items = Some(min);
        }
        self
    }

    /// Sets the maximum items for array schemas.
    #[must_use]
    pub fn max_items(mut self, max: usize) -> Self {
        if let Self::Array { max_items, .. } = &mut self {
            *max_items = Some(max);
        }
        self
    }

    /// Returns the schema with any `Nullable` wrappers removed.
    #[must_use]
    pub fn non_null(&self) -> &Schema {
        match self {
            Self::Nullable { inner } => inner.non_null(),
            other => other,
        }
    }

    /// Returns the schema of a named object property.
    #[must_use]
    pub fn property_schema(&self, name: &str) -> Option<&Schema> {
        match self.non_null() {
            Self::Object { properties, .. } => properties.get(name).map(|p| &p.schema),
            _ => None,
        }
    }

    /// Returns true for object schemas (possibly nullable).
    #[must_use]
    pub fn is_object(&self) -> bool {
        matches!(self.non_null(), Self::Object { .. })
    }

    /// Validates `value`, returning a cleaned copy or every issue found.
    ///
    /// # Errors
    ///
    /// Returns the issues in schema declaration order.
    pub fn validate(&self, value: &Value) -> Result<Value, Vec<Issue>> {
        let mut path = Vec::new();
        let mut issues = Vec::new();
        let cleaned = self.check(value, &mut path, &mut issues);
        if issues.is_empty() {
            Ok(cleaned)
        } else {
            Err(issues)
        }
    }

    fn check(&self, value: &Value, path: &mut Vec<PathSegment>, issues: &mut Vec<Issue>) -> Value {
        match self {
            Self::Any => value.clone(),

            Self::Nullable { inner } => {
                if value.is_null() {
                    Value::Null
                } else {
                    inner.check(value, path, issues)
                }
            }

            Self::String {
                min_length,
                max_length,
                pattern,
                format,
            } => {
                let Some(s) = value.as_str() else {
                    issues.push(type_issue(path, "string", value));
                    return value.clone();
                };
                let len = s.chars().count();
                if let Some(min) = min_length {
                    if len < *min {
                        issues.push(Issue::new(
                            path.clone(),
                            format!("String must contain at least {min} character(s)"),
                        ));
                    }
                }
                if let Some(max) = max_length {
                    if len > *max {
                        issues.push(Issue::new(
                            path.clone(),
                            format!("String must contain at most {max} character(s)"),
                        ));
                    }
                }
                if let Some(pattern) = pattern {
                    if !pattern.is_match(s) {
                        issues.push(Issue::new(
                            path.clone(),
                            format!("String must match pattern {}", pattern.as_str()),
                        ));
                    }
                }
                if let Some(format) = format {
                    if !format.accepts(s) {
                        issues.push(Issue::new(
                            path.clone(),
                            format!("Invalid {}", format.as_str()),
                        ));
                    }
                }
                value.clone()
            }

            Self::Integer { minimum, maximum } => {
                let Some(n) = as_integer(value) else {
                    let received = if value.is_number() { "float" } else { json_type(value) };
                    issues.push(Issue::new(
                        path.clone(),
                        format!("Expected integer, received {received}"),
                    ));
                    return value.clone();
                };
                if let Some(min) = minimum {
                    if n < *min {
                        issues.push(Issue::new(
                            path.clone(),
                            format!("Number must be greater than or equal to {min}"),
                        ));
                    }
                }
                if let Some(max) = maximum {
                    if n > *max {
                        issues.push(Issue::new(
                            path.clone(),
                            format!("Number must be less than or equal to {max}"),
                        ));
                    }
                }
                Value::from(n)
            }

            Self::Number { minimum, maximum } => {
                let Some(n) = value.as_f64() else {
                    issues.push(type_issue(path, "number", value));
                    return value.clone();
                };
                if let Some(min) = minimum {
                    if n < *min {
                        issues.push(Issue::new(
                            path.clone(),
                            format!("Number must be greater than or equal to {min}"),
                        ));
                    }
                }
                if let Some(max) = maximum {
                    if n > *max {
                        issues.push(Issue::new(
                            path.clone(),
                            format!("Number must be less than or equal to {max}"),
                        ));
                    }
                }
                value.clone()
            }

            Self::Boolean => {
                if !value.is_boolean() {
                    issues.push(type_issue(path, "boolean", value));
                }
                value.clone()
            }

            Self::Enum { values } => {
                if !values.contains(value) {
                    let expected = values
                        .iter()
                        .map(render_literal)
                        .collect::<Vec<_>>()
                        .join(" | ");
                    issues.push(Issue::new(
                        path.clone(),
                        format!(
                            "Invalid enum value. Expected {expected}, received {}",
                            render_literal(value)
                        ),
                    ));
                }
                value.clone()
            }

            Self::Array {
                items,
                min_items,
                max_items,
            } => {
                let Some(arr) = value.as_array() else {
                    issues.push(type_issue(path, "array", value));
                    return value.clone();
                };
                if let Some(min) = min_items {
                    if arr.len() < *min {
                        issues.push(Issue::new(
                            path.clone(),
                            format!("Array must contain at least {min} element(s)"),
                        ));
                    }
                }
                if let Some(max) = max_items {
                    if arr.len() > *max {
                        issues.push(Issue::new(
                            path.clone(),
                            format!("Array must contain at most {max} element(s)"),
                        ));
                    }
                }
                let cleaned = arr
                    .iter()
                    .enumerate()
                    .map(|(idx, item)| {
                        path.push(PathSegment::Index(idx));
                        let item = items.check(item, path, issues);
                        path.pop();
                        item
                    })
                    .collect();
                Value::Array(cleaned)
            }

            Self::Object {
                properties,
                additional_properties,
            } => {
                let Some(obj) = value.as_object() else {
                    issues.push(type_issue(path, "object", value));
                    return value.clone();
                };
                let mut cleaned = Map::new();
                for (key, property) in properties {
                    path.push(PathSegment::Key(key.clone()));
                    match obj.get(key) {
                        Some(field) => {
                            let field = property.schema.check(field, path, issues);
                            cleaned.insert(key.clone(), field);
                        }
                        None if property.required => {
                            issues.push(Issue::new(path.clone(), "Required"));
                        }
                        None => {}
                    }
                    path.pop();
                }
                if *additional_properties {
                    for (key, field) in obj {
                        if !properties.contains_key(key) {
                            cleaned.insert(key.clone(), field.clone());
                        }
                    }
                }
                Value::Object(cleaned)
            }
        }
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    let f = value.as_f64()?;
    // `i64::MAX as f64` rounds up to 2^63, which is already out of range.
    #[allow(clippy::cast_precision_loss)]
    let in_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
    if !in_range || f.fract() != 0.0 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    Some(f as i64)
}

fn type_issue(path: &[PathSegment], expected: &str, value: &Value) -> Issue {
    Issue::new(
        path.to_vec(),
        format!("Expected {expected}, received {}", json_type(value)),
    )
}

/// Returns a human-readable name for a JSON value type.
fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn render_literal(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{s}'"),
        other => other.to_string(),
    }
}
