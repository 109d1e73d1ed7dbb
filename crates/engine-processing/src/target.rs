use crate::{
    error::CdcError,
    position::{extract_timestamp, is_same_offset},
};
use model::{
    pagination::position::{GlobalCheckpoint, SourceTimestamp},
    records::change::{ChangeRecord, SnapshotMarker},
};

/// Answers "has the change log caught up to where this run began".
///
/// The target is captured once, before the snapshot runs, and never moves.
#[derive(Debug, Clone)]
pub struct TargetPositionTracker {
    target: GlobalCheckpoint,
}

impl TargetPositionTracker {
    pub fn new(target: GlobalCheckpoint) -> Self {
        Self { target }
    }

    pub fn target(&self) -> &GlobalCheckpoint {
        &self.target
    }

    /// Replayed snapshot reads never satisfy the target, except the last
    /// one of an in-progress resume batch.
    pub fn reached_record(&self, record: &ChangeRecord) -> Result<bool, CdcError> {
        if record.heartbeat_only {
            return Ok(self.reached_heartbeat(record.source_timestamp));
        }

        match record.snapshot {
            SnapshotMarker::Replay => Ok(false),
            SnapshotMarker::LastInBatch => Ok(true),
            SnapshotMarker::Live => {
                let timestamp = extract_timestamp(record)?;
                Ok(timestamp >= self.target.timestamp)
            }
        }
    }

    /// An unknown heartbeat clock never satisfies the target.
    pub fn reached_heartbeat(&self, timestamp: Option<SourceTimestamp>) -> bool {
        timestamp.is_some_and(|ts| ts >= self.target.timestamp)
    }

    pub fn is_target(&self, position: &GlobalCheckpoint) -> bool {
        is_same_offset(&self.target, position)
    }
}
