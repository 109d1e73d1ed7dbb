use engine_core::state::models::SyncCheckpoint;
use model::records::output::OutputRecord;

/// Item produced by the snapshot and streaming iterators.
///
/// Only checkpoints may be persisted; records are handed to the destination.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncMessage {
    Record(OutputRecord),
    Checkpoint(SyncCheckpoint),
}

impl SyncMessage {
    pub fn as_record(&self) -> Option<&OutputRecord> {
        match self {
            SyncMessage::Record(record) => Some(record),
            SyncMessage::Checkpoint(_) => None,
        }
    }

    pub fn as_checkpoint(&self) -> Option<&SyncCheckpoint> {
        match self {
            SyncMessage::Checkpoint(cp) => Some(cp),
            SyncMessage::Record(_) => None,
        }
    }

    pub fn is_checkpoint(&self) -> bool {
        matches!(self, SyncMessage::Checkpoint(_))
    }
}
