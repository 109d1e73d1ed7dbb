use crate::{
    error::CdcError,
    injector::MetadataInjector,
    normalizer::{
        coercion::{coerce, to_json},
        identity::normalize_id,
    },
    position::extract_timestamp,
};
use chrono::{DateTime, Utc};
use model::{
    catalog::stream::{ConfiguredStream, ID_FIELD, SCHEMALESS_DATA_FIELD, SchemaMode},
    core::value::Document,
    records::{change::ChangeRecord, output::OutputRecord},
};
use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;

pub mod coercion;
pub mod identity;

/// Turns raw documents and change events into schema-conformant records.
pub struct DataNormalizer {
    mode: SchemaMode,
    injector: Arc<MetadataInjector>,
}

impl DataNormalizer {
    pub fn new(mode: SchemaMode, injector: Arc<MetadataInjector>) -> Self {
        Self { mode, injector }
    }

    pub fn mode(&self) -> SchemaMode {
        self.mode
    }

    /// Maps one document to output fields according to the schema mode.
    pub fn transform(&self, stream: &ConfiguredStream, doc: &Document) -> Map<String, JsonValue> {
        let mut data = Map::new();

        if self.mode == SchemaMode::Schemaless {
            if let Some(id) = doc.get(ID_FIELD) {
                data.insert(ID_FIELD.to_string(), normalize_id(id));
            }
            let nested = doc
                .iter()
                .map(|(name, value)| (name.clone(), to_json(value)))
                .collect::<Map<String, JsonValue>>();
            data.insert(SCHEMALESS_DATA_FIELD.to_string(), JsonValue::Object(nested));
            return data;
        }

        for (name, value) in doc {
            if name == ID_FIELD {
                data.insert(name.clone(), normalize_id(value));
                continue;
            }

            let declared = stream.schema.field_type(name);
            if declared.is_none() && self.mode == SchemaMode::Enforced {
                continue;
            }
            data.insert(name.clone(), coerce(value, declared));
        }

        data
    }

    /// Record for a document read by the snapshot scan.
    pub fn snapshot_record(&self, stream: &ConfiguredStream, doc: &Document) -> OutputRecord {
        let emitted_at = Utc::now();
        let data = self.transform(stream, doc);
        self.finish(stream, data, emitted_at, emitted_at, None)
    }

    /// Record for a change event; deletes carry only the identifier.
    pub fn change_record(
        &self,
        stream: &ConfiguredStream,
        record: &ChangeRecord,
    ) -> Result<OutputRecord, CdcError> {
        let timestamp = extract_timestamp(record)?;
        let emitted_at = Utc::now();
        let updated_at =
            DateTime::from_timestamp(i64::from(timestamp.seconds), 0).unwrap_or(emitted_at);

        if record.is_delete() {
            let mut data = Map::new();
            data.insert(ID_FIELD.to_string(), normalize_id(&record.key));
            return Ok(self.finish(stream, data, emitted_at, updated_at, Some(updated_at)));
        }

        let after = record.after.as_ref().ok_or_else(|| {
            CdcError::malformed(format!(
                "{:?} event for {} carries no document",
                record.operation, stream.id
            ))
        })?;

        let mut data = self.transform(stream, after);
        if !data.contains_key(ID_FIELD) && !record.key.is_null() {
            data.insert(ID_FIELD.to_string(), normalize_id(&record.key));
        }
        Ok(self.finish(stream, data, emitted_at, updated_at, None))
    }

    fn finish(
        &self,
        stream: &ConfiguredStream,
        mut data: Map<String, JsonValue>,
        emitted_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        deleted_at: Option<DateTime<Utc>>,
    ) -> OutputRecord {
        // Full refresh streams carry no CDC metadata.
        let cursor = if stream.is_incremental() {
            self.injector.inject(&mut data, updated_at, deleted_at)
        } else {
            self.injector.next_cursor()
        };

        OutputRecord {
            stream: stream.id.clone(),
            data,
            emitted_at,
            cursor,
            deleted_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{
        catalog::stream::{CDC_CURSOR, CDC_DELETED_AT, CDC_UPDATED_AT, StreamSchema},
        core::{
            data_type::FieldType,
            identifiers::StreamIdentifier,
            value::{Value, document},
        },
        pagination::position::SourceTimestamp,
    };
    use serde_json::json;

    fn normalizer(mode: SchemaMode) -> DataNormalizer {
        DataNormalizer::new(mode, Arc::new(MetadataInjector::new(Utc::now())))
    }

    fn orders() -> ConfiguredStream {
        ConfiguredStream::incremental(
            StreamIdentifier::new("shop", "orders"),
            StreamSchema::new([
                ("_id", FieldType::String),
                ("total", FieldType::Number),
                ("tags", FieldType::Array),
            ]),
        )
    }

    fn order_doc() -> Document {
        document([
            ("_id", Value::from("o-1")),
            ("total", Value::Int64(30)),
            ("tags", Value::from("new")),
            ("note", Value::from("undiscovered")),
        ])
    }

    #[test]
    fn enforced_mode_drops_undiscovered_fields() {
        let data = normalizer(SchemaMode::Enforced).transform(&orders(), &order_doc());
        assert_eq!(data["_id"], json!("o-1"));
        assert_eq!(data["total"], json!(30.0));
        assert_eq!(data["tags"], json!(["new"]));
        assert!(!data.contains_key("note"));
    }

    #[test]
    fn all_fields_mode_keeps_everything() {
        let data = normalizer(SchemaMode::AllFields).transform(&orders(), &order_doc());
        assert_eq!(data["note"], json!("undiscovered"));
        assert_eq!(data["tags"], json!(["new"]));
    }

    #[test]
    fn schemaless_mode_nests_the_document() {
        let data = normalizer(SchemaMode::Schemaless).transform(&orders(), &order_doc());
        assert_eq!(data.len(), 2);
        assert_eq!(data["_id"], json!("o-1"));
        assert_eq!(data["data"]["note"], json!("undiscovered"));
        assert_eq!(data["data"]["tags"], json!("new"));
    }

    #[test]
    fn declared_array_is_stable_for_every_input_shape() {
        let normalizer = normalizer(SchemaMode::Enforced);
        let inputs = [
            Value::from("scalar"),
            Value::Int32(3),
            Value::Document(document([("k", "v")])),
            Value::Array(vec![Value::from("a"), Value::from("b")]),
        ];
        for input in inputs {
            let doc = document([("_id", Value::from("x")), ("tags", input)]);
            assert!(normalizer.transform(&orders(), &doc)["tags"].is_array());
        }
    }

    #[test]
    fn incremental_records_carry_cdc_metadata() {
        let record = normalizer(SchemaMode::Enforced).snapshot_record(&orders(), &order_doc());
        assert_eq!(record.get(CDC_DELETED_AT), Some(&JsonValue::Null));
        assert!(record.get(CDC_UPDATED_AT).is_some());
        assert_eq!(record.get(CDC_CURSOR), Some(&json!(record.cursor)));
        assert!(!record.is_delete());
    }

    #[test]
    fn full_refresh_records_carry_no_metadata() {
        let stream = ConfiguredStream::full_refresh(
            StreamIdentifier::new("shop", "orders"),
            orders().schema,
        );
        let record = normalizer(SchemaMode::Enforced).snapshot_record(&stream, &order_doc());
        assert!(record.get(CDC_UPDATED_AT).is_none());
        assert!(record.get(CDC_CURSOR).is_none());
    }

    #[test]
    fn delete_carries_identifier_and_deletion_time() {
        let event = ChangeRecord::delete(
            StreamIdentifier::new("shop", "orders"),
            Value::Document(document([("_id", "o-9")])),
            SourceTimestamp::new(1_700_000_000, 1),
        );
        let record = normalizer(SchemaMode::Enforced)
            .change_record(&orders(), &event)
            .unwrap();

        assert!(record.is_delete());
        assert_eq!(record.get("_id"), Some(&json!("o-9")));
        assert_eq!(
            record.get(CDC_DELETED_AT),
            Some(&json!("2023-11-14T22:13:20.000Z"))
        );
    }

    #[test]
    fn update_without_document_is_malformed() {
        let mut event = ChangeRecord::update(
            StreamIdentifier::new("shop", "orders"),
            Value::from("o-1"),
            order_doc(),
            SourceTimestamp::new(10, 0),
        );
        event.after = None;
        let err = normalizer(SchemaMode::Enforced)
            .change_record(&orders(), &event)
            .unwrap_err();
        assert!(matches!(err, CdcError::MalformedEvent { .. }));
    }
}
