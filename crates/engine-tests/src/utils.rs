use crate::fakes::FakeSource;
use engine_config::settings::validated::CdcSettings;
use engine_core::state::models::SyncCheckpoint;
use engine_processing::{
    initializer::CdcInitializer, message::SyncMessage, snapshot::SnapshotIterator,
    streaming::StreamingIterator,
};
use model::{
    catalog::{
        ConfiguredCatalog,
        stream::{ConfiguredStream, StreamSchema},
    },
    core::{
        data_type::FieldType,
        identifiers::StreamIdentifier,
        value::{Document, Value, document},
    },
    pagination::position::SourceTimestamp,
    records::output::OutputRecord,
};
use serde_json::Value as JsonValue;
use std::sync::Arc;

pub const DB: &str = "shop";

pub fn stream(name: &str) -> StreamIdentifier {
    StreamIdentifier::new(DB, name)
}

pub fn ts(seconds: u32, sequence: u32) -> SourceTimestamp {
    SourceTimestamp::new(seconds, sequence)
}

pub fn order_schema() -> StreamSchema {
    StreamSchema::new([
        ("_id", FieldType::String),
        ("total", FieldType::Number),
        ("tags", FieldType::Array),
    ])
}

pub fn incremental(name: &str) -> ConfiguredStream {
    ConfiguredStream::incremental(stream(name), order_schema())
}

pub fn catalog(names: &[&str]) -> ConfiguredCatalog {
    ConfiguredCatalog::new(names.iter().map(|n| incremental(n)).collect())
}

/// A small order document keyed by `id`.
pub fn order(id: impl Into<Value>, total: i32) -> Document {
    document([("_id", id.into()), ("total", Value::Int32(total))])
}

pub fn settings(checkpoint_interval: usize) -> CdcSettings {
    CdcSettings::builder()
        .checkpoint_interval(checkpoint_interval)
        .build()
        .expect("valid settings")
}

pub fn initializer(source: &FakeSource, settings: CdcSettings) -> CdcInitializer {
    CdcInitializer::new(
        Arc::new(source.clone()),
        Arc::new(source.clone()),
        settings,
    )
}

pub async fn drain_snapshot(it: &mut SnapshotIterator) -> Vec<SyncMessage> {
    let mut out = Vec::new();
    while let Some(message) = it.next().await.expect("snapshot item") {
        out.push(message);
    }
    out
}

/// Pulls until the fake change log runs dry.
pub async fn drain_streaming(it: &mut StreamingIterator) -> Vec<SyncMessage> {
    let mut out = Vec::new();
    while let Some(message) = it.next().await.expect("streaming item") {
        out.push(message);
    }
    out
}

pub fn records(messages: &[SyncMessage]) -> Vec<&OutputRecord> {
    messages.iter().filter_map(|m| m.as_record()).collect()
}

pub fn checkpoints(messages: &[SyncMessage]) -> Vec<&SyncCheckpoint> {
    messages.iter().filter_map(|m| m.as_checkpoint()).collect()
}

pub fn record_ids(messages: &[SyncMessage]) -> Vec<JsonValue> {
    records(messages)
        .into_iter()
        .map(|r| r.get("_id").cloned().unwrap_or(JsonValue::Null))
        .collect()
}

pub fn last_checkpoint(messages: &[SyncMessage]) -> SyncCheckpoint {
    checkpoints(messages)
        .last()
        .map(|cp| (*cp).clone())
        .expect("at least one checkpoint")
}
