use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt};

/// Field type promised to downstream consumers by schema discovery.
///
/// Serialized by its JSON-schema style name; aliases are accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FieldType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
    TimestampWithTimezone,
    Null,
}

lazy_static! {
    static ref FIELD_TYPE_MAP: HashMap<&'static str, FieldType> = build_field_type_map();
}

impl FieldType {
    /// Resolves a JSON-schema style type name (`"string"`, `"array"`, ...).
    pub fn from_name(type_name: &str) -> Result<Self, String> {
        let normalized = type_name.trim().to_ascii_lowercase();
        FIELD_TYPE_MAP
            .get(normalized.as_str())
            .copied()
            .ok_or_else(|| format!("Unknown field type: {type_name}"))
    }

    pub fn name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Integer => "integer",
            FieldType::Boolean => "boolean",
            FieldType::Object => "object",
            FieldType::Array => "array",
            FieldType::TimestampWithTimezone => "timestamp_with_timezone",
            FieldType::Null => "null",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<String> for FieldType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        FieldType::from_name(&value)
    }
}

impl From<FieldType> for String {
    fn from(value: FieldType) -> Self {
        value.name().to_string()
    }
}

fn build_field_type_map() -> HashMap<&'static str, FieldType> {
    let mut map = HashMap::new();
    map.insert("string", FieldType::String);
    map.insert("number", FieldType::Number);
    map.insert("double", FieldType::Number);
    map.insert("decimal", FieldType::Number);
    map.insert("integer", FieldType::Integer);
    map.insert("int", FieldType::Integer);
    map.insert("long", FieldType::Integer);
    map.insert("boolean", FieldType::Boolean);
    map.insert("bool", FieldType::Boolean);
    map.insert("object", FieldType::Object);
    map.insert("array", FieldType::Array);
    map.insert("timestamp_with_timezone", FieldType::TimestampWithTimezone);
    map.insert("date", FieldType::TimestampWithTimezone);
    map.insert("null", FieldType::Null);
    map
}
