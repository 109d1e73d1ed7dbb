use crate::{
    error::CdcError, message::SyncMessage, normalizer::DataNormalizer, position::extract_timestamp,
    state_manager::StateManager, target::TargetPositionTracker,
};
use engine_core::{
    connectors::source::{ChangeLogClient, ChangeStream},
    metrics::Metrics,
};
use futures::{Stream, stream};
use model::{
    catalog::stream::ConfiguredStream,
    core::identifiers::StreamIdentifier,
    pagination::position::GlobalCheckpoint,
    records::change::ChangeRecord,
};
use std::{
    collections::{BTreeMap, VecDeque},
    sync::Arc,
};
use tracing::{debug, info, warn};

/// Follows the change log of the incremental streams.
///
/// The cursor is opened lazily on the first pull, at `start_position`. Every
/// processed event or heartbeat is followed by a checkpoint carrying the new
/// global position. The iterator only ends when the source ends the change
/// stream or on [`StreamingIterator::close`].
pub struct StreamingIterator {
    client: Arc<dyn ChangeLogClient>,
    streams: BTreeMap<StreamIdentifier, ConfiguredStream>,
    start_position: Option<GlobalCheckpoint>,
    tracker: Option<TargetPositionTracker>,
    reached_target: bool,
    normalizer: Arc<DataNormalizer>,
    state: StateManager,
    metrics: Metrics,
    cursor: Option<Box<dyn ChangeStream>>,
    queued: VecDeque<SyncMessage>,
    started: bool,
    finished: bool,
}

impl StreamingIterator {
    pub fn new(
        client: Arc<dyn ChangeLogClient>,
        streams: Vec<ConfiguredStream>,
        start_position: Option<GlobalCheckpoint>,
        tracker: Option<TargetPositionTracker>,
        normalizer: Arc<DataNormalizer>,
        state: StateManager,
        metrics: Metrics,
    ) -> Self {
        Self {
            client,
            streams: streams.into_iter().map(|s| (s.id.clone(), s)).collect(),
            start_position,
            tracker,
            reached_target: false,
            normalizer,
            state,
            metrics,
            cursor: None,
            queued: VecDeque::new(),
            started: false,
            finished: false,
        }
    }

    pub fn namespaces(&self) -> Vec<StreamIdentifier> {
        self.streams.keys().cloned().collect()
    }

    pub fn start_position(&self) -> Option<&GlobalCheckpoint> {
        self.start_position.as_ref()
    }

    pub fn target(&self) -> Option<&GlobalCheckpoint> {
        self.tracker.as_ref().map(|t| t.target())
    }

    /// Whether the change log has caught up to where this run began.
    pub fn reached_target(&self) -> bool {
        self.reached_target
    }

    pub async fn next(&mut self) -> Result<Option<SyncMessage>, CdcError> {
        loop {
            if let Some(message) = self.queued.pop_front() {
                return Ok(Some(message));
            }
            if self.finished {
                return Ok(None);
            }

            if !self.started {
                self.started = true;
                self.open().await?;
                continue;
            }

            let pulled = match self.cursor.as_mut() {
                Some(cursor) => cursor.next().await,
                None => {
                    self.finished = true;
                    continue;
                }
            };

            match pulled {
                Ok(Some(event)) => {
                    if let Err(e) = self.handle(event).await {
                        self.shutdown().await;
                        return Err(e);
                    }
                }
                Ok(None) => {
                    info!("Change stream ended by the source");
                    self.shutdown().await;
                }
                Err(e) => {
                    self.shutdown().await;
                    return Err(e.into());
                }
            }
        }
    }

    /// Releases the change-log cursor and drops everything not yet emitted.
    pub async fn close(&mut self) {
        self.shutdown().await;
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

    async fn open(&mut self) -> Result<(), CdcError> {
        if self.streams.is_empty() {
            debug!("No incremental streams to follow");
            self.finished = true;
            return Ok(());
        }

        let namespaces = self.namespaces();
        let cursor = match self
            .client
            .open_cursor(self.start_position.as_ref(), &namespaces)
            .await
        {
            Ok(cursor) => cursor,
            Err(e) => {
                self.finished = true;
                return Err(e.into());
            }
        };

        let position = cursor
            .resume_position()
            .or_else(|| self.start_position.clone());
        self.cursor = Some(cursor);

        info!(
            streams = namespaces.len(),
            position = ?position.as_ref().map(|p| p.to_string()),
            "Change stream opened"
        );

        if let Some(position) = position {
            self.push_checkpoint(position).await;
        }
        Ok(())
    }

    async fn handle(&mut self, event: ChangeRecord) -> Result<(), CdcError> {
        let position = event
            .resume_position
            .clone()
            .or_else(|| self.cursor.as_ref().and_then(|c| c.resume_position()));

        if event.heartbeat_only {
            self.metrics.increment_heartbeats(1);
            if let Some(tracker) = &self.tracker
                && tracker.reached_heartbeat(event.source_timestamp)
            {
                self.mark_reached();
            }
        } else {
            let timestamp = extract_timestamp(&event)?;
            let namespace = event.namespace.as_ref().ok_or_else(|| {
                CdcError::malformed(format!("change event at {timestamp} has no namespace"))
            })?;
            self.metrics.increment_change_events(1);

            match self.streams.get(namespace) {
                Some(stream) => {
                    let record = self.normalizer.change_record(stream, &event)?;
                    debug!(stream = %namespace, operation = ?event.operation, "Change event");
                    self.metrics.increment_records(1);
                    self.queued.push_back(SyncMessage::Record(record));
                }
                None => {
                    debug!(stream = %namespace, "Skipping change event for unconfigured stream");
                }
            }

            if let Some(tracker) = &self.tracker
                && tracker.reached_record(&event)?
            {
                self.mark_reached();
            }
        }

        if let Some(position) = position {
            self.push_checkpoint(position).await;
        }
        Ok(())
    }

    fn mark_reached(&mut self) {
        if !self.reached_target {
            self.reached_target = true;
            info!(
                target = ?self.target().map(|t| t.to_string()),
                "Caught up to the position captured at run start"
            );
        }
    }

    async fn push_checkpoint(&mut self, position: GlobalCheckpoint) {
        let checkpoint = self.state.set_global(position).await;
        self.metrics.increment_checkpoints(1);
        self.queued.push_back(SyncMessage::Checkpoint(checkpoint));
    }

    async fn shutdown(&mut self) {
        if let Some(mut cursor) = self.cursor.take()
            && let Err(e) = cursor.close().await
        {
            warn!(error = %e, "Failed to close change stream");
        }
        self.finished = true;
    }
}
