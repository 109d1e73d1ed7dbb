use engine_core::state::models::{StreamSnapshotState, SyncCheckpoint};
use futures::lock::Mutex;
use model::{
    core::identifiers::StreamIdentifier,
    pagination::{
        cursor::{IdType, PrimaryKey},
        position::GlobalCheckpoint,
    },
};
use std::sync::Arc;
use tracing::warn;

/// Holds the checkpoint of the running sync.
///
/// Both iterators of a run share one manager. Every mutation returns the
/// full checkpoint to emit, so emitted checkpoints follow mutation order.
#[derive(Clone)]
pub struct StateManager {
    checkpoint: Arc<Mutex<SyncCheckpoint>>,
}

impl StateManager {
    pub fn new(checkpoint: SyncCheckpoint) -> Self {
        Self {
            checkpoint: Arc::new(Mutex::new(checkpoint)),
        }
    }

    /// Records snapshot progress of `stream` up to and including `key`.
    pub async fn advance(&self, stream: &StreamIdentifier, key: PrimaryKey) -> SyncCheckpoint {
        let mut checkpoint = self.checkpoint.lock().await;
        checkpoint
            .streams
            .insert(stream.clone(), StreamSnapshotState::in_progress(key));
        checkpoint.clone()
    }

    pub async fn complete(
        &self,
        stream: &StreamIdentifier,
        last_key: Option<PrimaryKey>,
        key_type: Option<IdType>,
    ) -> SyncCheckpoint {
        let mut checkpoint = self.checkpoint.lock().await;
        checkpoint.streams.insert(
            stream.clone(),
            StreamSnapshotState::complete(last_key, key_type),
        );
        checkpoint.clone()
    }

    /// Moves the global position forward; an older position is ignored.
    pub async fn set_global(&self, position: GlobalCheckpoint) -> SyncCheckpoint {
        let mut checkpoint = self.checkpoint.lock().await;
        match &checkpoint.global {
            Some(current) if position.timestamp < current.timestamp => {
                warn!(
                    current = %current,
                    proposed = %position,
                    "Ignoring resume position older than the current one"
                );
            }
            _ => checkpoint.global = Some(position),
        }
        checkpoint.clone()
    }
}
