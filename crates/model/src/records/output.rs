use crate::core::identifiers::StreamIdentifier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Typed, schema-conformant record handed to the destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub stream: StreamIdentifier,
    pub data: Map<String, JsonValue>,
    pub emitted_at: DateTime<Utc>,
    pub cursor: i64,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl OutputRecord {
    pub fn get(&self, field: &str) -> Option<&JsonValue> {
        self.data.get(field)
    }

    pub fn is_delete(&self) -> bool {
        self.deleted_at.is_some()
    }
}
