use crate::state::models::SyncCheckpoint;
use async_trait::async_trait;
use std::error::Error;

pub mod memory_store;
pub mod models;
pub mod sled_store;

/// Persistence for serialized sync checkpoints, keyed by sync id.
///
/// A sync run owns its checkpoint exclusively for its lifetime; stores do not
/// coordinate concurrent runs of the same sync.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn save_checkpoint(
        &self,
        sync_id: &str,
        cp: &SyncCheckpoint,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;

    async fn load_checkpoint(
        &self,
        sync_id: &str,
    ) -> Result<Option<SyncCheckpoint>, Box<dyn Error + Send + Sync>>;
}
