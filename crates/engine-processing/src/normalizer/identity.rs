use crate::normalizer::coercion::to_json;
use model::core::value::Value;
use serde_json::Value as JsonValue;

/// Output form of a document identifier.
///
/// Identifiers delivered wrapped in a single-field document (`{"_id": {"$oid": ...}}`)
/// are unwrapped to the inner scalar; anything else converts as-is.
pub fn normalize_id(id: &Value) -> JsonValue {
    to_json(flatten_id(id))
}

pub fn flatten_id(id: &Value) -> &Value {
    if let Value::Document(doc) = id
        && doc.len() == 1
        && let Some(inner) = doc.values().next()
        && !matches!(inner, Value::Document(_) | Value::Array(_) | Value::Null)
    {
        return inner;
    }
    id
}
