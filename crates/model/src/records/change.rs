use crate::{
    core::{
        identifiers::StreamIdentifier,
        value::{Document, Value},
    },
    pagination::position::{GlobalCheckpoint, SourceTimestamp},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    Insert,
    Update,
    Delete,
    SnapshotRead,
}

/// Marks events the change-log client replays from a snapshot rather than observes live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SnapshotMarker {
    #[default]
    Live,
    Replay,
    /// Final replayed event of an in-progress resume batch.
    LastInBatch,
}

/// Raw event produced by the change-log client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub operation: Operation,
    pub key: Value,
    pub after: Option<Document>,
    pub namespace: Option<StreamIdentifier>,
    pub source_timestamp: Option<SourceTimestamp>,
    /// Position to resume from once this event has been applied.
    pub resume_position: Option<GlobalCheckpoint>,
    pub heartbeat_only: bool,
    pub snapshot: SnapshotMarker,
}

impl ChangeRecord {
    fn data(
        operation: Operation,
        namespace: StreamIdentifier,
        key: Value,
        after: Option<Document>,
        timestamp: SourceTimestamp,
    ) -> Self {
        Self {
            operation,
            key,
            after,
            namespace: Some(namespace),
            source_timestamp: Some(timestamp),
            resume_position: None,
            heartbeat_only: false,
            snapshot: SnapshotMarker::Live,
        }
    }

    pub fn insert(
        namespace: StreamIdentifier,
        key: Value,
        after: Document,
        timestamp: SourceTimestamp,
    ) -> Self {
        Self::data(Operation::Insert, namespace, key, Some(after), timestamp)
    }

    pub fn update(
        namespace: StreamIdentifier,
        key: Value,
        after: Document,
        timestamp: SourceTimestamp,
    ) -> Self {
        Self::data(Operation::Update, namespace, key, Some(after), timestamp)
    }

    pub fn delete(namespace: StreamIdentifier, key: Value, timestamp: SourceTimestamp) -> Self {
        Self::data(Operation::Delete, namespace, key, None, timestamp)
    }

    /// Data-less progress signal; `timestamp` is the heartbeat clock, absent when unknown.
    pub fn heartbeat(timestamp: Option<SourceTimestamp>) -> Self {
        Self {
            operation: Operation::SnapshotRead,
            key: Value::Null,
            after: None,
            namespace: None,
            source_timestamp: timestamp,
            resume_position: None,
            heartbeat_only: true,
            snapshot: SnapshotMarker::Live,
        }
    }

    pub fn with_resume_position(mut self, position: GlobalCheckpoint) -> Self {
        self.resume_position = Some(position);
        self
    }

    pub fn with_snapshot_marker(mut self, marker: SnapshotMarker) -> Self {
        self.snapshot = marker;
        self
    }

    pub fn is_delete(&self) -> bool {
        self.operation == Operation::Delete
    }
}
