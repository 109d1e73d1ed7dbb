use chrono::{DateTime, SecondsFormat, Utc};
use model::catalog::stream::{CDC_CURSOR, CDC_DELETED_AT, CDC_UPDATED_AT};
use serde_json::{Map, Value as JsonValue};
use std::sync::atomic::{AtomicI64, Ordering};

const CURSOR_SLOTS_PER_SECOND: i64 = 100_000_000;

/// Stamps records of incremental streams with CDC metadata.
///
/// One injector is built per run and shared by both iterators; cursors are
/// strictly increasing within the run and across runs started in later seconds.
#[derive(Debug)]
pub struct MetadataInjector {
    next_cursor: AtomicI64,
}

impl MetadataInjector {
    pub fn new(run_started_at: DateTime<Utc>) -> Self {
        Self {
            next_cursor: AtomicI64::new(run_started_at.timestamp() * CURSOR_SLOTS_PER_SECOND),
        }
    }

    pub fn next_cursor(&self) -> i64 {
        self.next_cursor.fetch_add(1, Ordering::Relaxed)
    }

    /// Adds the three metadata fields to `data` and returns the cursor it used.
    pub fn inject(
        &self,
        data: &mut Map<String, JsonValue>,
        updated_at: DateTime<Utc>,
        deleted_at: Option<DateTime<Utc>>,
    ) -> i64 {
        let cursor = self.next_cursor();
        data.insert(
            CDC_UPDATED_AT.to_string(),
            JsonValue::String(format_timestamp(updated_at)),
        );
        data.insert(
            CDC_DELETED_AT.to_string(),
            deleted_at
                .map(|ts| JsonValue::String(format_timestamp(ts)))
                .unwrap_or(JsonValue::Null),
        );
        data.insert(CDC_CURSOR.to_string(), JsonValue::from(cursor));
        cursor
    }
}

/// ISO-8601 with millisecond precision, always in UTC.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}
