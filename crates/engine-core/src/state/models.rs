use model::{
    core::identifiers::StreamIdentifier,
    pagination::{
        cursor::{IdType, PrimaryKey},
        position::GlobalCheckpoint,
    },
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SnapshotStatus {
    #[default]
    NotStarted,
    InProgress,
    Complete,
}

/// Snapshot progress of a single stream.
///
/// `InProgress` always carries `last_seen_key`, and `key_type` matches it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct StreamSnapshotState {
    pub status: SnapshotStatus,
    pub last_seen_key: Option<PrimaryKey>,
    pub key_type: Option<IdType>,
}

impl StreamSnapshotState {
    pub fn not_started() -> Self {
        Self::default()
    }

    pub fn in_progress(key: PrimaryKey) -> Self {
        Self {
            status: SnapshotStatus::InProgress,
            key_type: Some(key.id_type()),
            last_seen_key: Some(key),
        }
    }

    pub fn complete(last_seen_key: Option<PrimaryKey>, key_type: Option<IdType>) -> Self {
        Self {
            status: SnapshotStatus::Complete,
            key_type: last_seen_key.as_ref().map(|k| k.id_type()).or(key_type),
            last_seen_key,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == SnapshotStatus::Complete
    }

    /// Marker to resume an ordered scan from, present only mid-snapshot.
    pub fn resume_key(&self) -> Option<&PrimaryKey> {
        match self.status {
            SnapshotStatus::InProgress => self.last_seen_key.as_ref(),
            _ => None,
        }
    }
}

/// Persisted unit of progress for one logical sync.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct SyncCheckpoint {
    /// Absent until streaming has started at least once.
    pub global: Option<GlobalCheckpoint>,
    pub streams: BTreeMap<StreamIdentifier, StreamSnapshotState>,
    /// Schema enforcement the records were produced under.
    pub schema_enforced: Option<bool>,
}

impl SyncCheckpoint {
    pub fn stream(&self, id: &StreamIdentifier) -> Option<&StreamSnapshotState> {
        self.streams.get(id)
    }

    pub fn with_stream(mut self, id: StreamIdentifier, state: StreamSnapshotState) -> Self {
        self.streams.insert(id, state);
        self
    }

    pub fn with_global(mut self, global: GlobalCheckpoint) -> Self {
        self.global = Some(global);
        self
    }

    /// True when saving `next` over `self` would move the global position backwards.
    ///
    /// Clearing the position (a resnapshot run) is not a regression.
    pub fn would_regress(&self, next: &SyncCheckpoint) -> bool {
        match (&self.global, &next.global) {
            (Some(current), Some(candidate)) => candidate.timestamp < current.timestamp,
            _ => false,
        }
    }
}
