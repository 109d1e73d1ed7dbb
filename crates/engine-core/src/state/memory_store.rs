use crate::state::{StateStore, models::SyncCheckpoint};
use async_trait::async_trait;
use std::{collections::HashMap, error::Error};
use tokio::sync::RwLock;
use tracing::warn;

/// Process-local store, for embedding and tests.
#[derive(Default)]
pub struct MemoryStateStore {
    checkpoints: RwLock<HashMap<String, SyncCheckpoint>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn save_checkpoint(
        &self,
        sync_id: &str,
        cp: &SyncCheckpoint,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut checkpoints = self.checkpoints.write().await;
        if let Some(existing) = checkpoints.get(sync_id) {
            if existing.would_regress(cp) {
                warn!(sync_id, "Refusing to persist a checkpoint older than the stored one");
                return Ok(());
            }
        }
        checkpoints.insert(sync_id.to_string(), cp.clone());
        Ok(())
    }

    async fn load_checkpoint(
        &self,
        sync_id: &str,
    ) -> Result<Option<SyncCheckpoint>, Box<dyn Error + Send + Sync>> {
        Ok(self.checkpoints.read().await.get(sync_id).cloned())
    }
}
