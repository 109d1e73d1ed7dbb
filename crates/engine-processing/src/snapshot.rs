use crate::{
    error::CdcError, message::SyncMessage, normalizer::DataNormalizer, planner::PlannedStream,
    state_manager::StateManager,
};
use engine_core::{
    connectors::source::{BulkReadClient, DocumentScan},
    metrics::Metrics,
};
use futures::{Stream, stream};
use model::{
    catalog::stream::ID_FIELD,
    core::value::{Document, ValueKind},
    pagination::cursor::{IdType, PrimaryKey},
};
use std::{collections::VecDeque, sync::Arc};
use tracing::{debug, info, warn};

struct ActiveScan {
    planned: PlannedStream,
    scan: Box<dyn DocumentScan>,
    last_key: Option<PrimaryKey>,
    key_type: Option<IdType>,
    since_checkpoint: usize,
}

/// Copies planned streams one after another in primary-key order.
///
/// Emits a checkpoint every `checkpoint_interval` documents and once more when
/// a stream is exhausted. The open scan is closed on exhaustion, on error and
/// on [`SnapshotIterator::close`].
pub struct SnapshotIterator {
    bulk: Arc<dyn BulkReadClient>,
    normalizer: Arc<DataNormalizer>,
    state: StateManager,
    metrics: Metrics,
    checkpoint_interval: usize,
    pending: VecDeque<PlannedStream>,
    active: Option<ActiveScan>,
    queued: VecDeque<SyncMessage>,
    finished: bool,
}

impl SnapshotIterator {
    pub fn new(
        bulk: Arc<dyn BulkReadClient>,
        normalizer: Arc<DataNormalizer>,
        state: StateManager,
        metrics: Metrics,
        checkpoint_interval: usize,
        planned: Vec<PlannedStream>,
    ) -> Self {
        Self {
            bulk,
            normalizer,
            state,
            metrics,
            checkpoint_interval: checkpoint_interval.max(1),
            pending: planned.into(),
            active: None,
            queued: VecDeque::new(),
            finished: false,
        }
    }

    /// Streams not yet started, in copy order.
    pub fn pending_streams(&self) -> Vec<&PlannedStream> {
        self.pending.iter().collect()
    }

    pub async fn next(&mut self) -> Result<Option<SyncMessage>, CdcError> {
        loop {
            if let Some(message) = self.queued.pop_front() {
                return Ok(Some(message));
            }
            if self.finished {
                return Ok(None);
            }

            if self.active.is_none() {
                let Some(planned) = self.pending.pop_front() else {
                    self.finished = true;
                    continue;
                };
                self.open(planned).await?;
                continue;
            }

            let pulled = match self.active.as_mut() {
                Some(active) => active.scan.next().await,
                None => continue,
            };

            match pulled {
                Ok(Some(doc)) => self.accept(doc).await?,
                Ok(None) => self.complete_active().await,
                Err(e) => {
                    self.abort().await;
                    return Err(e.into());
                }
            }
        }
    }

    /// Releases the open scan and drops everything not yet emitted.
    pub async fn close(&mut self) {
        self.abort().await;
        self.queued.clear();
    }

    pub fn into_stream(self) -> impl Stream<Item = Result<SyncMessage, CdcError>> + Send {
        stream::unfold(self, |mut it| async move {
            match it.next().await {
                Ok(Some(message)) => Some((Ok(message), it)),
                Ok(None) => None,
                Err(e) => Some((Err(e), it)),
            }
        })
    }

    async fn open(&mut self, planned: PlannedStream) -> Result<(), CdcError> {
        let id = planned.stream.id.clone();
        let scan = match self
            .bulk
            .open_ordered_scan(&id, planned.resume_after.as_ref(), planned.chunk_size)
            .await
        {
            Ok(scan) => scan,
            Err(e) => {
                self.abort().await;
                return Err(e.into());
            }
        };

        info!(
            stream = %id,
            resume_after = ?planned.resume_after.as_ref().map(|k| k.to_string()),
            batch_size = planned.chunk_size,
            documents = ?planned.statistics.map(|s| s.count),
            "Starting snapshot"
        );

        self.active = Some(ActiveScan {
            key_type: planned.key_type,
            planned,
            scan,
            last_key: None,
            since_checkpoint: 0,
        });
        Ok(())
    }

    async fn accept(&mut self, doc: Document) -> Result<(), CdcError> {
        let Some(active) = self.active.as_mut() else {
            return Ok(());
        };
        let stream_id = active.planned.stream.id.clone();

        let key = match doc.get(ID_FIELD) {
            Some(id) => PrimaryKey::from_value(id).ok_or(id.kind()),
            None => Err(ValueKind::Null),
        };
        let key = match key {
            Ok(key) => key,
            Err(found) => {
                self.abort().await;
                return Err(CdcError::UnsupportedKeyType {
                    stream: stream_id,
                    found,
                });
            }
        };

        if let Some(expected) = active.key_type
            && expected != key.id_type()
        {
            let types = format!("{expected}, {}", key.id_type());
            self.abort().await;
            return Err(CdcError::InconsistentKeyType {
                stream: stream_id,
                types,
            });
        }

        let record = self.normalizer.snapshot_record(&active.planned.stream, &doc);
        debug!(stream = %stream_id, key = %key, "Snapshot document");

        active.key_type = Some(key.id_type());
        active.last_key = Some(key.clone());
        active.since_checkpoint += 1;
        let due = active.since_checkpoint >= self.checkpoint_interval;
        if due {
            active.since_checkpoint = 0;
        }

        self.metrics.increment_snapshot_documents(1);
        self.metrics.increment_records(1);
        self.queued.push_back(SyncMessage::Record(record));

        if due {
            let checkpoint = self.state.advance(&stream_id, key).await;
            self.metrics.increment_checkpoints(1);
            self.queued.push_back(SyncMessage::Checkpoint(checkpoint));
        }
        Ok(())
    }

    async fn complete_active(&mut self) {
        let Some(mut active) = self.active.take() else {
            return;
        };
        if let Err(e) = active.scan.close().await {
            warn!(stream = %active.planned.stream.id, error = %e, "Failed to close snapshot scan");
        }

        let checkpoint = self
            .state
            .complete(&active.planned.stream.id, active.last_key, active.key_type)
            .await;
        info!(stream = %active.planned.stream.id, "Snapshot complete");
        self.metrics.increment_checkpoints(1);
        self.queued.push_back(SyncMessage::Checkpoint(checkpoint));
    }

    async fn abort(&mut self) {
        if let Some(mut active) = self.active.take()
            && let Err(e) = active.scan.close().await
        {
            warn!(stream = %active.planned.stream.id, error = %e, "Failed to close snapshot scan");
        }
        self.pending.clear();
        self.finished = true;
    }
}
