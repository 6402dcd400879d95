//! Query string and URL-encoded field parsing.
//!
//! Query strings and form bodies share one representation: a JSON object
//! whose values are strings, or arrays of strings for keys that occur more
//! than once. [`crate::coerce`] turns that into typed values.

use serde_json::{Map, Value};

use crate::{ExtractionError, ExtractionSource};

/// Parses a raw query string (without the leading `?`).
///
/// # Example
///
/// ```rust
/// use openproc_extract::parse_query;
/// use serde_json::json;
///
/// let fields = parse_query(Some("tag=a&tag=b&limit=10")).unwrap();
/// assert_eq!(fields["tag"], json!(["a", "b"]));
/// assert_eq!(fields["limit"], json!("10"));
/// ```
///
/// # Errors
///
/// Returns a malformed-query error if the string cannot be decoded.
pub fn parse_query(query: Option<&str>) -> Result<Map<String, Value>, ExtractionError> {
    let Some(query) = query.filter(|q| !q.is_empty()) else {
        return Ok(Map::new());
    };
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query)
        .map_err(|e| ExtractionError::malformed(ExtractionSource::Query, e.to_string()))?;
    Ok(group_pairs(pairs))
}

/// Parses `application/x-www-form-urlencoded` bytes.
pub(crate) fn parse_form(body: &[u8]) -> Result<Map<String, Value>, ExtractionError> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(body)
        .map_err(|e| ExtractionError::malformed(ExtractionSource::Body, e.to_string()))?;
    Ok(group_pairs(pairs))
}

/// Groups decoded pairs by key, keeping first-seen key order.
fn group_pairs(pairs: Vec<(String, String)>) -> Map<String, Value> {
    let mut fields = Map::new();
    for (key, value) in pairs {
        match fields.get_mut(&key) {
            Some(Value::Array(values)) => values.push(Value::String(value)),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, Value::String(value)]);
            }
            None => {
                fields.insert(key, Value::String(value));
            }
        }
    }
    fields
}
