use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, collections::BTreeMap, fmt, str::FromStr};
use thiserror::Error;
use uuid::Uuid;

/// A schema-less document: field name to value, ordered by field name.
pub type Document = BTreeMap<String, Value>;

/// Builds a [`Document`] from `(name, value)` pairs.
pub fn document<I, K, V>(fields: I) -> Document
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    fields
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ObjectIdError {
    #[error("ObjectId must be 24 hex characters, got {0}")]
    InvalidLength(usize),

    #[error("Invalid hex digit in ObjectId '{0}'")]
    InvalidHex(String),
}

/// 12-byte document identifier: 4-byte big-endian seconds, 5 random bytes, 3-byte counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    pub const fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> [u8; 12] {
        self.0
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Creation time embedded in the identifier, in epoch seconds.
    pub fn timestamp_secs(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }
}

impl FromStr for ObjectId {
    type Err = ObjectIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 24 {
            return Err(ObjectIdError::InvalidLength(s.len()));
        }

        let mut bytes = [0u8; 12];
        for (i, byte) in bytes.iter_mut().enumerate() {
            let pair = s
                .get(i * 2..i * 2 + 2)
                .ok_or_else(|| ObjectIdError::InvalidHex(s.to_string()))?;
            *byte =
                u8::from_str_radix(pair, 16).map_err(|_| ObjectIdError::InvalidHex(s.to_string()))?;
        }
        Ok(ObjectId(bytes))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinarySubtype {
    Generic,
    Function,
    UuidOld,
    Uuid,
    Md5,
    Encrypted,
    UserDefined(u8),
}

impl BinarySubtype {
    pub fn from_code(code: u8) -> Self {
        match code {
            0x00 => BinarySubtype::Generic,
            0x01 => BinarySubtype::Function,
            0x03 => BinarySubtype::UuidOld,
            0x04 => BinarySubtype::Uuid,
            0x05 => BinarySubtype::Md5,
            0x06 => BinarySubtype::Encrypted,
            other => BinarySubtype::UserDefined(other),
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            BinarySubtype::Generic => 0x00,
            BinarySubtype::Function => 0x01,
            BinarySubtype::UuidOld => 0x03,
            BinarySubtype::Uuid => 0x04,
            BinarySubtype::Md5 => 0x05,
            BinarySubtype::Encrypted => 0x06,
            BinarySubtype::UserDefined(code) => *code,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Binary {
    pub subtype: BinarySubtype,
    pub bytes: Vec<u8>,
}

impl Binary {
    pub fn generic(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            subtype: BinarySubtype::Generic,
            bytes: bytes.into(),
        }
    }

    pub fn uuid(uuid: Uuid) -> Self {
        Self {
            subtype: BinarySubtype::Uuid,
            bytes: uuid.as_bytes().to_vec(),
        }
    }

    /// The payload as a UUID when it carries the standard UUID subtype.
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self.subtype {
            BinarySubtype::Uuid => Uuid::from_slice(&self.bytes).ok(),
            _ => None,
        }
    }
}

/// Tag of a [`Value`], named after the source's `$type` aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValueKind {
    Null,
    Boolean,
    Int32,
    Int64,
    Double,
    Decimal,
    String,
    ObjectId,
    Binary,
    DateTime,
    Timestamp,
    Document,
    Array,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Boolean => "bool",
            ValueKind::Int32 => "int",
            ValueKind::Int64 => "long",
            ValueKind::Double => "double",
            ValueKind::Decimal => "decimal",
            ValueKind::String => "string",
            ValueKind::ObjectId => "objectId",
            ValueKind::Binary => "binData",
            ValueKind::DateTime => "date",
            ValueKind::Timestamp => "timestamp",
            ValueKind::Document => "object",
            ValueKind::Array => "array",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dynamically typed document field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Double(f64),
    Decimal(BigDecimal),
    String(String),
    ObjectId(ObjectId),
    Binary(Binary),
    DateTime(DateTime<Utc>),
    /// Internal replication timestamp: seconds plus an intra-second ordinal.
    Timestamp { seconds: u32, increment: u32 },
    Document(Document),
    Array(Vec<Value>),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Int32(_) => ValueKind::Int32,
            Value::Int64(_) => ValueKind::Int64,
            Value::Double(_) => ValueKind::Double,
            Value::Decimal(_) => ValueKind::Decimal,
            Value::String(_) => ValueKind::String,
            Value::ObjectId(_) => ValueKind::ObjectId,
            Value::Binary(_) => ValueKind::Binary,
            Value::DateTime(_) => ValueKind::DateTime,
            Value::Timestamp { .. } => ValueKind::Timestamp,
            Value::Document(_) => ValueKind::Document,
            Value::Array(_) => ValueKind::Array,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Orders two values of compatible kinds; `None` for incomparable kinds.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        use Value::*;
        match (self, other) {
            (Null, Null) => Some(Ordering::Equal),
            (Boolean(a), Boolean(b)) => Some(a.cmp(b)),
            (Int32(a), Int32(b)) => Some(a.cmp(b)),
            (Int64(a), Int64(b)) => Some(a.cmp(b)),
            (Int32(a), Int64(b)) => Some((*a as i64).cmp(b)),
            (Int64(a), Int32(b)) => Some(a.cmp(&(*b as i64))),
            (Double(a), Double(b)) => a.partial_cmp(b),
            (Decimal(a), Decimal(b)) => Some(a.cmp(b)),
            (String(a), String(b)) => Some(a.cmp(b)),
            (ObjectId(a), ObjectId(b)) => Some(a.cmp(b)),
            (Binary(a), Binary(b)) => Some(a.bytes.cmp(&b.bytes)),
            (DateTime(a), DateTime(b)) => Some(a.cmp(b)),
            (
                Timestamp {
                    seconds: s1,
                    increment: i1,
                },
                Timestamp {
                    seconds: s2,
                    increment: i2,
                },
            ) => Some((s1, i1).cmp(&(s2, i2))),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<ObjectId> for Value {
    fn from(v: ObjectId) -> Self {
        Value::ObjectId(v)
    }
}

impl From<Binary> for Value {
    fn from(v: Binary) -> Self {
        Value::Binary(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::DateTime(v)
    }
}

impl From<Document> for Value {
    fn from(v: Document) -> Self {
        Value::Document(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}
