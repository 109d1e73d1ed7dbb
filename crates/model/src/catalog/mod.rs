use crate::core::identifiers::StreamIdentifier;
use serde::{Deserialize, Serialize};
use stream::ConfiguredStream;

pub mod stream;

/// Streams selected for replication, in the order they are synced.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConfiguredCatalog {
    pub streams: Vec<ConfiguredStream>,
}

impl ConfiguredCatalog {
    pub fn new(streams: Vec<ConfiguredStream>) -> Self {
        Self { streams }
    }

    pub fn get(&self, id: &StreamIdentifier) -> Option<&ConfiguredStream> {
        self.streams.iter().find(|s| &s.id == id)
    }

    pub fn incremental_streams(&self) -> impl Iterator<Item = &ConfiguredStream> {
        self.streams.iter().filter(|s| s.is_incremental())
    }

    /// Namespaces followed by the change log (incremental streams only).
    pub fn incremental_namespaces(&self) -> Vec<StreamIdentifier> {
        self.incremental_streams().map(|s| s.id.clone()).collect()
    }

    /// A catalog is schemaless when every stream was discovered in schemaless shape.
    pub fn is_schemaless(&self) -> bool {
        !self.streams.is_empty() && self.streams.iter().all(|s| s.schema.is_schemaless_shape())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::data_type::FieldType;
    use stream::{StreamSchema, SyncMode};

    #[test]
    fn only_incremental_streams_are_followed() {
        let catalog = ConfiguredCatalog::new(vec![
            ConfiguredStream::incremental(
                StreamIdentifier::new("db", "orders"),
                StreamSchema::new([("_id", FieldType::String)]),
            ),
            ConfiguredStream::new(
                StreamIdentifier::new("db", "audit"),
                SyncMode::FullRefresh,
                StreamSchema::default(),
            ),
        ]);

        assert_eq!(
            catalog.incremental_namespaces(),
            vec![StreamIdentifier::new("db", "orders")]
        );
        assert!(!catalog.is_schemaless());
    }

    #[test]
    fn schemaless_catalog_requires_every_stream_in_that_shape() {
        let catalog = ConfiguredCatalog::new(vec![ConfiguredStream::incremental(
            StreamIdentifier::new("db", "orders"),
            StreamSchema::schemaless(),
        )]);
        assert!(catalog.is_schemaless());
        assert!(!ConfiguredCatalog::default().is_schemaless());
    }

    #[test]
    fn catalog_reads_discovered_type_names() {
        let catalog: ConfiguredCatalog = serde_json::from_str(
            r#"{"streams": [{
                "id": {"namespace": "db", "name": "orders"},
                "sync_mode": "Incremental",
                "schema": {"fields": {"_id": "string", "tags": "array", "total": "double"}}
            }]}"#,
        )
        .unwrap();

        let orders = catalog.get(&StreamIdentifier::new("db", "orders")).unwrap();
        assert!(orders.is_incremental());
        assert_eq!(orders.schema.field_type("tags"), Some(FieldType::Array));
        assert_eq!(orders.schema.field_type("total"), Some(FieldType::Number));
    }
}
