//! String coercion against declared schemas.
//!
//! Path segments, query strings and form bodies only carry strings. Each
//! value is converted to the primitive its property declares. A value that
//! does not convert is left as the original string so the validator reports
//! the usual type issue for it.

use openproc_core::Schema;
use serde_json::{Map, Number, Value};

/// Coerces every field of a string-valued object against an object schema.
///
/// Fields without a declared property are only reduced to their first
/// occurrence; the validator decides whether they survive.
#[must_use]
pub fn coerce_fields(fields: Map<String, Value>, schema: Option<&Schema>) -> Map<String, Value> {
    fields
        .into_iter()
        .map(|(key, value)| {
            let target = schema.and_then(|s| s.property_schema(&key));
            let value = coerce_value(value, target);
            (key, value)
        })
        .collect()
}

/// Coerces one field value.
///
/// Arrays come from repeated keys. They are kept when the target is an
/// array and reduced to their first element otherwise. A single value for
/// an array target becomes a one-element array.
#[must_use]
pub fn coerce_value(value: Value, schema: Option<&Schema>) -> Value {
    let target = schema.map(Schema::non_null);
    match (value, target) {
        (Value::Array(values), Some(Schema::Array { items, .. })) => Value::Array(
            values
                .into_iter()
                .map(|v| coerce_scalar(v, Some(items.as_ref())))
                .collect(),
        ),
        (Value::Array(values), Some(Schema::Any)) => Value::Array(values),
        (Value::Array(values), target) => values
            .into_iter()
            .next()
            .map_or(Value::Null, |first| coerce_scalar(first, target)),
        (value @ Value::String(_), Some(Schema::Array { items, .. })) => {
            Value::Array(vec![coerce_scalar(value, Some(items.as_ref()))])
        }
        (value, target) => coerce_scalar(value, target),
    }
}

fn coerce_scalar(value: Value, schema: Option<&Schema>) -> Value {
    let Value::String(raw) = value else {
        return value;
    };
    let parsed = match schema.map(Schema::non_null) {
        Some(Schema::Integer { .. }) => raw.trim().parse::<i64>().ok().map(Value::from),
        Some(Schema::Number { .. }) => raw
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),
        Some(Schema::Boolean) => match raw.as_str() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        Some(Schema::Enum { values }) => values
            .iter()
            .find(|v| !v.is_string() && v.to_string() == raw)
            .cloned(),
        _ => None,
    };
    match parsed {
        Some(value) => value,
        None if raw == "null" && matches!(schema, Some(Schema::Nullable { .. })) => Value::Null,
        None => Value::String(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_primitives_coerced() {
        let schema = Schema::object()
            .field("id", Schema::integer())
            .field("ratio", Schema::number())
            .field("active", Schema::boolean())
            .field("name", Schema::string());

        let out = coerce_fields(
            fields(json!({"id": "42", "ratio": "0.5", "active": "true", "name": "7"})),
            Some(&schema),
        );
        assert_eq!(
            Value::Object(out),
            json!({"id": 42, "ratio": 0.5, "active": true, "name": "7"})
        );
    }

    #[test]
    fn test_failed_coercion_keeps_string() {
        let schema = Schema::object().field("id", Schema::integer());
        let out = coerce_fields(fields(json!({"id": "abc"})), Some(&schema));
        assert_eq!(out["id"], json!("abc"));
    }

    #[test]
    fn test_repeated_keys_into_array() {
        let schema = Schema::object()
            .field("ids", Schema::array(Schema::integer()))
            .field("sort", Schema::string());

        let out = coerce_fields(
            fields(json!({"ids": ["1", "2"], "sort": ["name", "age"]})),
            Some(&schema),
        );
        assert_eq!(out["ids"], json!([1, 2]));
        assert_eq!(out["sort"], json!("name"));
    }

    #[test]
    fn test_single_value_for_array_property() {
        let schema = Schema::object().field("ids", Schema::array(Schema::integer()));
        let out = coerce_fields(fields(json!({"ids": "5"})), Some(&schema));
        assert_eq!(out["ids"], json!([5]));
    }

    #[test]
    fn test_nullable_and_enum() {
        let schema = Schema::object()
            .field("limit", Schema::integer().nullable())
            .field(
                "level",
                Schema::Enum {
                    values: vec![json!(1), json!(2)],
                },
            );

        let out = coerce_fields(fields(json!({"limit": "null", "level": "2"})), Some(&schema));
        assert_eq!(out["limit"], Value::Null);
        assert_eq!(out["level"], json!(2));

        let out = coerce_fields(fields(json!({"limit": "10"})), Some(&schema));
        assert_eq!(out["limit"], json!(10));
    }

    #[test]
    fn test_unknown_fields_without_schema() {
        let out = coerce_fields(fields(json!({"a": ["x", "y"], "b": "1"})), None);
        assert_eq!(out["a"], json!("x"));
        assert_eq!(out["b"], json!("1"));
    }
}
