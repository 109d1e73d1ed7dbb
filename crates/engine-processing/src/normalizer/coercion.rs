use crate::injector::format_timestamp;
use base64::{Engine, engine::general_purpose::STANDARD};
use bigdecimal::ToPrimitive;
use chrono::DateTime;
use model::core::{data_type::FieldType, value::Value};
use serde_json::{Map, Number, Value as JsonValue};

/// Converts a document value to its output form, honoring the declared field type.
///
/// A field declared as array always yields an array: scalars and single
/// documents are wrapped, nulls stay null.
pub fn coerce(value: &Value, declared: Option<FieldType>) -> JsonValue {
    match (declared, value) {
        (Some(FieldType::Array), Value::Array(_) | Value::Null) => to_json(value),
        (Some(FieldType::Array), _) => JsonValue::Array(vec![to_json(value)]),
        _ => to_json(value),
    }
}

/// Type-driven conversion with no schema involved.
pub fn to_json(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Boolean(b) => JsonValue::Bool(*b),
        Value::Int32(v) => JsonValue::from(*v),
        Value::Int64(v) => float(*v as f64),
        Value::Double(v) => float(*v),
        Value::Decimal(d) => match d.to_f64() {
            Some(v) => float(v),
            None => JsonValue::String(d.to_string()),
        },
        Value::String(s) => JsonValue::String(s.clone()),
        Value::ObjectId(oid) => JsonValue::String(oid.to_hex()),
        Value::Binary(bin) => JsonValue::String(STANDARD.encode(&bin.bytes)),
        Value::DateTime(ts) => JsonValue::String(format_timestamp(*ts)),
        Value::Timestamp { seconds, .. } => match DateTime::from_timestamp(i64::from(*seconds), 0)
        {
            Some(ts) => JsonValue::String(format_timestamp(ts)),
            None => JsonValue::Null,
        },
        Value::Document(doc) => JsonValue::Object(
            doc.iter()
                .map(|(k, v)| (k.clone(), to_json(v)))
                .collect::<Map<String, JsonValue>>(),
        ),
        Value::Array(items) => JsonValue::Array(items.iter().map(to_json).collect()),
    }
}

// JSON has no NaN or infinities; those travel as text.
fn float(v: f64) -> JsonValue {
    match Number::from_f64(v) {
        Some(n) => JsonValue::Number(n),
        None => JsonValue::String(v.to_string()),
    }
}
