//! Conversion of declared schemas to JSON Schema (OpenAPI 3.1 dialect).

use openproc_core::Schema;
use serde_json::{json, Map, Value};

/// Name of the shared error body schema under `components.schemas`.
pub const ERROR_SCHEMA_NAME: &str = "OpenApiErrorResponse";

/// Renders a declared schema as a JSON Schema object.
///
/// # Example
///
/// ```
/// use openproc_core::Schema;
/// use openproc_docs::json_schema;
/// use serde_json::json;
///
/// let schema = Schema::object()
///     .field("id", Schema::integer())
///     .optional("nickname", Schema::string().nullable());
///
/// assert_eq!(
///     json_schema(&schema),
///     json!({
///         "type": "object",
///         "properties": {
///             "id": {"type": "integer"},
///             "nickname": {"anyOf": [{"type": "string"}, {"type": "null"}]}
///         },
///         "required": ["id"],
///         "additionalProperties": false
///     })
/// );
/// ```
#[must_use]
pub fn json_schema(schema: &Schema) -> Value {
    match schema {
        Schema::String {
            min_length,
            max_length,
            pattern,
            format,
        } => {
            let mut out = typed("string");
            insert_opt(&mut out, "minLength", *min_length);
            insert_opt(&mut out, "maxLength", *max_length);
            insert_opt(&mut out, "pattern", pattern.as_ref().map(|p| p.as_str()));
            insert_opt(&mut out, "format", format.map(|f| f.as_str()));
            Value::Object(out)
        }
        Schema::Integer { minimum, maximum } => {
            let mut out = typed("integer");
            insert_opt(&mut out, "minimum", *minimum);
            insert_opt(&mut out, "maximum", *maximum);
            Value::Object(out)
        }
        Schema::Number { minimum, maximum } => {
            let mut out = typed("number");
            insert_opt(&mut out, "minimum", *minimum);
            insert_opt(&mut out, "maximum", *maximum);
            Value::Object(out)
        }
        Schema::Boolean => Value::Object(typed("boolean")),
        Schema::Enum { values } => json!({ "enum": values }),
        Schema::Array {
            items,
            min_items,
            max_items,
        } => {
            let mut out = typed("array");
            out.insert("items".to_string(), json_schema(items));
            insert_opt(&mut out, "minItems", *min_items);
            insert_opt(&mut out, "maxItems", *max_items);
            Value::Object(out)
        }
        Schema::Object {
            properties,
            additional_properties,
        } => {
            let mut out = typed("object");
            let rendered: Map<String, Value> = properties
                .iter()
                .map(|(name, property)| (name.clone(), json_schema(&property.schema)))
                .collect();
            let required: Vec<&str> = properties
                .iter()
                .filter(|(_, property)| property.required)
                .map(|(name, _)| name.as_str())
                .collect();

            if !rendered.is_empty() {
                out.insert("properties".to_string(), Value::Object(rendered));
            }
            if !required.is_empty() {
                out.insert("required".to_string(), json!(required));
            }
            out.insert(
                "additionalProperties".to_string(),
                Value::Bool(*additional_properties),
            );
            Value::Object(out)
        }
        Schema::Nullable { inner } => json!({
            "anyOf": [json_schema(inner), {"type": "null"}]
        }),
        Schema::Any => json!({}),
    }
}

/// JSON Schema of the error body every failure is written with.
#[must_use]
pub fn error_response_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "message": {"type": "string"},
            "code": {"type": "string"},
            "issues": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "path": {
                            "type": "array",
                            "items": {"anyOf": [{"type": "string"}, {"type": "integer"}]}
                        },
                        "message": {"type": "string"}
                    },
                    "required": ["path", "message"]
                }
            }
        },
        "required": ["message", "code"]
    })
}

fn typed(name: &str) -> Map<String, Value> {
    let mut out = Map::new();
    out.insert("type".to_string(), Value::String(name.to_string()));
    out
}

fn insert_opt<T: Into<Value>>(out: &mut Map<String, Value>, key: &str, value: Option<T>) {
    if let Some(value) = value {
        out.insert(key.to_string(), value.into());
    }
}
