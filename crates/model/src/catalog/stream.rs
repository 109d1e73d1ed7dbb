use crate::core::{data_type::FieldType, identifiers::StreamIdentifier};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identity field every document carries.
pub const ID_FIELD: &str = "_id";

/// Catch-all field holding the whole document in schemaless mode.
pub const SCHEMALESS_DATA_FIELD: &str = "data";

pub const CDC_UPDATED_AT: &str = "_ab_cdc_updated_at";
pub const CDC_DELETED_AT: &str = "_ab_cdc_deleted_at";
pub const CDC_CURSOR: &str = "_ab_cdc_cursor";

pub const CDC_META_FIELDS: [&str; 3] = [CDC_UPDATED_AT, CDC_DELETED_AT, CDC_CURSOR];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncMode {
    /// Snapshot once, then follow the change log.
    Incremental,
    /// Re-read the whole collection on every run.
    FullRefresh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaMode {
    /// Emit only discovered fields.
    #[default]
    Enforced,
    /// Emit every field, discovered or not.
    AllFields,
    /// Nest the whole document under [`SCHEMALESS_DATA_FIELD`].
    Schemaless,
}

impl SchemaMode {
    /// Whether records follow the discovered per-field schema.
    pub fn is_schema_enforced(&self) -> bool {
        !matches!(self, SchemaMode::Schemaless)
    }
}

/// Discovered field schema of one stream.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StreamSchema {
    pub fields: BTreeMap<String, FieldType>,
}

impl StreamSchema {
    pub fn new<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, FieldType)>,
        K: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(|(k, t)| (k.into(), t)).collect(),
        }
    }

    /// Schema shape produced by schemaless discovery.
    pub fn schemaless() -> Self {
        Self::new([
            (ID_FIELD, FieldType::String),
            (SCHEMALESS_DATA_FIELD, FieldType::Object),
        ])
    }

    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.fields.get(name).copied()
    }

    /// True when the only user fields are the identity and the catch-all field.
    pub fn is_schemaless_shape(&self) -> bool {
        self.fields.contains_key(SCHEMALESS_DATA_FIELD)
            && self.fields.keys().all(|k| {
                k == ID_FIELD || k == SCHEMALESS_DATA_FIELD || CDC_META_FIELDS.contains(&k.as_str())
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfiguredStream {
    pub id: StreamIdentifier,
    pub sync_mode: SyncMode,
    pub schema: StreamSchema,
}

impl ConfiguredStream {
    pub fn new(id: StreamIdentifier, sync_mode: SyncMode, schema: StreamSchema) -> Self {
        Self {
            id,
            sync_mode,
            schema,
        }
    }

    pub fn incremental(id: StreamIdentifier, schema: StreamSchema) -> Self {
        Self::new(id, SyncMode::Incremental, schema)
    }

    pub fn full_refresh(id: StreamIdentifier, schema: StreamSchema) -> Self {
        Self::new(id, SyncMode::FullRefresh, schema)
    }

    pub fn is_incremental(&self) -> bool {
        self.sync_mode == SyncMode::Incremental
    }
}
