use crate::{
    error::StateStoreError,
    state::{StateStore, models::SyncCheckpoint},
};
use async_trait::async_trait;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use std::{error::Error, path::Path};
use tracing::warn;

pub struct SledStateStore {
    db: sled::Db,
}

impl SledStateStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, sled::Error> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    #[inline]
    fn chk_key(sync_id: &str) -> String {
        format!("chk:{}", sync_id)
    }
}

#[async_trait]
impl StateStore for SledStateStore {
    async fn save_checkpoint(
        &self,
        sync_id: &str,
        cp: &SyncCheckpoint,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let key = Self::chk_key(sync_id);
        let new_bytes = bincode::serialize(cp)
            .map_err(|e| StateStoreError::SaveCheckpoint(format!("{sync_id}: {e}")))?;

        // Check-then-set in one transaction so a stale writer cannot move the
        // persisted global position backwards.
        let result = self
            .db
            .transaction::<_, _, Box<dyn Error + Send + Sync>>(|tx_db| {
                if let Some(existing_bytes) = tx_db.get(&key)? {
                    let existing: SyncCheckpoint = bincode::deserialize(&existing_bytes)
                        .map_err(|e| ConflictableTransactionError::Abort(e.into()))?;

                    if existing.would_regress(cp) {
                        return Ok(false);
                    }
                }

                tx_db.insert(&*key, new_bytes.as_slice())?;
                Ok(true)
            });

        match result {
            Ok(true) => {
                self.db.flush()?;
                Ok(())
            }
            Ok(false) => {
                warn!(sync_id, "Refusing to persist a checkpoint older than the stored one");
                Ok(())
            }
            Err(TransactionError::Abort(e)) => Err(e),
            Err(TransactionError::Storage(e)) => Err(Box::new(e)),
        }
    }

    async fn load_checkpoint(
        &self,
        sync_id: &str,
    ) -> Result<Option<SyncCheckpoint>, Box<dyn Error + Send + Sync>> {
        let key = Self::chk_key(sync_id);
        match self.db.get(key)? {
            Some(bytes) => {
                let cp = bincode::deserialize(&bytes).map_err(|e| {
                    StateStoreError::LoadCheckpoint(format!("{sync_id}: {e}"))
                })?;
                Ok(Some(cp))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::models::StreamSnapshotState;
    use model::{
        core::identifiers::StreamIdentifier,
        pagination::{
            cursor::PrimaryKey,
            position::{GlobalCheckpoint, SourceTimestamp},
        },
    };
    use tempfile::tempdir;

    fn mk_cp(seconds: u32, last_key: i64) -> SyncCheckpoint {
        SyncCheckpoint::default()
            .with_global(GlobalCheckpoint::new(
                format!("token-{seconds}"),
                SourceTimestamp::new(seconds, 1),
            ))
            .with_stream(
                StreamIdentifier::new("db", "orders"),
                StreamSnapshotState::in_progress(PrimaryKey::Long(last_key)),
            )
    }

    #[tokio::test]
    async fn round_trips_checkpoint() {
        let dir = tempdir().unwrap();
        let store = SledStateStore::open(dir.path()).unwrap();

        store.save_checkpoint("sync", &mk_cp(10, 42)).await.unwrap();

        let cp = store.load_checkpoint("sync").await.unwrap().unwrap();
        assert_eq!(cp, mk_cp(10, 42));
        assert!(store.load_checkpoint("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn keeps_newer_global_position_over_stale_write() {
        let dir = tempdir().unwrap();
        let store = SledStateStore::open(dir.path()).unwrap();

        store.save_checkpoint("sync", &mk_cp(20, 7)).await.unwrap();
        // A stale writer replays an older position.
        store.save_checkpoint("sync", &mk_cp(10, 9)).await.unwrap();

        let cp = store.load_checkpoint("sync").await.unwrap().unwrap();
        assert_eq!(cp.global.unwrap().timestamp, SourceTimestamp::new(20, 1));
    }

    #[tokio::test]
    async fn accepts_cleared_position_after_reset() {
        let dir = tempdir().unwrap();
        let store = SledStateStore::open(dir.path()).unwrap();

        store.save_checkpoint("sync", &mk_cp(20, 7)).await.unwrap();
        store
            .save_checkpoint("sync", &SyncCheckpoint::default())
            .await
            .unwrap();

        let cp = store.load_checkpoint("sync").await.unwrap().unwrap();
        assert!(cp.global.is_none());
        assert!(cp.streams.is_empty());
    }

    #[tokio::test]
    async fn corrupt_checkpoint_fails_to_load() {
        let dir = tempdir().unwrap();
        let store = SledStateStore::open(dir.path()).unwrap();
        store
            .db
            .insert(SledStateStore::chk_key("sync"), &[0xff_u8, 0x01][..])
            .unwrap();

        let err = store.load_checkpoint("sync").await.unwrap_err();
        assert!(err.to_string().starts_with("Failed to load checkpoint: sync"));
    }
}
