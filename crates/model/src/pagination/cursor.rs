use crate::core::value::{Binary, ObjectId, Value, ValueKind};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt};

/// Primary-key types an ordered snapshot scan can resume from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdType {
    ObjectId,
    String,
    Int,
    Long,
    Binary,
}

impl IdType {
    pub const SUPPORTED: [IdType; 5] = [
        IdType::ObjectId,
        IdType::String,
        IdType::Int,
        IdType::Long,
        IdType::Binary,
    ];

    pub fn from_kind(kind: ValueKind) -> Option<Self> {
        match kind {
            ValueKind::ObjectId => Some(IdType::ObjectId),
            ValueKind::String => Some(IdType::String),
            ValueKind::Int32 => Some(IdType::Int),
            ValueKind::Int64 => Some(IdType::Long),
            ValueKind::Binary => Some(IdType::Binary),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IdType::ObjectId => "ObjectId",
            IdType::String => "String",
            IdType::Int => "Int",
            IdType::Long => "Long",
            IdType::Binary => "Binary",
        }
    }

    /// Comma separated list of supported types, for operator-facing errors.
    pub fn supported_names() -> String {
        Self::SUPPORTED
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for IdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last primary key read by an ordered snapshot scan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimaryKey {
    ObjectId(ObjectId),
    String(String),
    Int(i32),
    Long(i64),
    Binary(Binary),
}

impl PrimaryKey {
    /// Returns `None` when the value's type cannot serve as a resumable key.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::ObjectId(oid) => Some(PrimaryKey::ObjectId(*oid)),
            Value::String(s) => Some(PrimaryKey::String(s.clone())),
            Value::Int32(v) => Some(PrimaryKey::Int(*v)),
            Value::Int64(v) => Some(PrimaryKey::Long(*v)),
            Value::Binary(b) => Some(PrimaryKey::Binary(b.clone())),
            _ => None,
        }
    }

    pub fn id_type(&self) -> IdType {
        match self {
            PrimaryKey::ObjectId(_) => IdType::ObjectId,
            PrimaryKey::String(_) => IdType::String,
            PrimaryKey::Int(_) => IdType::Int,
            PrimaryKey::Long(_) => IdType::Long,
            PrimaryKey::Binary(_) => IdType::Binary,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            PrimaryKey::ObjectId(oid) => Value::ObjectId(*oid),
            PrimaryKey::String(s) => Value::String(s.clone()),
            PrimaryKey::Int(v) => Value::Int32(*v),
            PrimaryKey::Long(v) => Value::Int64(*v),
            PrimaryKey::Binary(b) => Value::Binary(b.clone()),
        }
    }

    /// Ordering within one key type; keys of different types are incomparable.
    pub fn compare(&self, other: &PrimaryKey) -> Option<Ordering> {
        match (self, other) {
            (PrimaryKey::ObjectId(a), PrimaryKey::ObjectId(b)) => Some(a.cmp(b)),
            (PrimaryKey::String(a), PrimaryKey::String(b)) => Some(a.cmp(b)),
            (PrimaryKey::Int(a), PrimaryKey::Int(b)) => Some(a.cmp(b)),
            (PrimaryKey::Long(a), PrimaryKey::Long(b)) => Some(a.cmp(b)),
            (PrimaryKey::Binary(a), PrimaryKey::Binary(b)) => Some(a.bytes.cmp(&b.bytes)),
            _ => None,
        }
    }
}

impl fmt::Display for PrimaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimaryKey::ObjectId(oid) => write!(f, "{oid}"),
            PrimaryKey::String(s) => write!(f, "{s}"),
            PrimaryKey::Int(v) => write!(f, "{v}"),
            PrimaryKey::Long(v) => write!(f, "{v}"),
            PrimaryKey::Binary(b) => match b.as_uuid() {
                Some(uuid) => write!(f, "{uuid}"),
                None => {
                    let hex: String = b.bytes.iter().map(|byte| format!("{byte:02x}")).collect();
                    write!(f, "{hex}")
                }
            },
        }
    }
}
