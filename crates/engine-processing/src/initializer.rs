use crate::{
    error::CdcError,
    injector::MetadataInjector,
    normalizer::DataNormalizer,
    planner::SnapshotPlanner,
    position::capture_target_position,
    probe::{OffsetProber, OffsetValidity},
    snapshot::SnapshotIterator,
    state_manager::StateManager,
    streaming::StreamingIterator,
    target::TargetPositionTracker,
};
use chrono::Utc;
use engine_config::{settings::validated::CdcSettings, validation::schema_mode::check_schema_mode};
use engine_core::{
    connectors::source::{BulkReadClient, ChangeLogClient},
    metrics::Metrics,
    state::{StateStore, models::SyncCheckpoint},
};
use model::catalog::ConfiguredCatalog;
use std::sync::Arc;
use tracing::info;

/// The two iterators of one run. Drain `snapshot` fully before pulling `streaming`.
pub struct CdcIterators {
    pub snapshot: SnapshotIterator,
    pub streaming: StreamingIterator,
}

/// Composes a run: validates the saved position, plans the snapshot and
/// captures the target position.
pub struct CdcInitializer {
    change_log: Arc<dyn ChangeLogClient>,
    bulk: Arc<dyn BulkReadClient>,
    settings: CdcSettings,
    metrics: Metrics,
}

impl CdcInitializer {
    pub fn new(
        change_log: Arc<dyn ChangeLogClient>,
        bulk: Arc<dyn BulkReadClient>,
        settings: CdcSettings,
    ) -> Self {
        Self {
            change_log,
            bulk,
            settings,
            metrics: Metrics::new(),
        }
    }

    pub fn metrics(&self) -> Metrics {
        self.metrics.clone()
    }

    /// Loads the checkpoint of `sync_id` from `store` and composes the run from it.
    pub async fn create_iterators_from_store(
        &self,
        store: &dyn StateStore,
        sync_id: &str,
        catalog: &ConfiguredCatalog,
    ) -> Result<CdcIterators, CdcError> {
        let checkpoint = store
            .load_checkpoint(sync_id)
            .await
            .map_err(|source| CdcError::StateStore { source })?;
        self.create_iterators(checkpoint, catalog).await
    }

    pub async fn create_iterators(
        &self,
        checkpoint: Option<SyncCheckpoint>,
        catalog: &ConfiguredCatalog,
    ) -> Result<CdcIterators, CdcError> {
        let saved = checkpoint.unwrap_or_default();
        check_schema_mode(&self.settings, catalog, saved.schema_enforced)?;

        let namespaces = catalog.incremental_namespaces();
        let validity = if namespaces.is_empty() {
            OffsetValidity::Absent
        } else {
            OffsetProber::new(self.change_log.as_ref())
                .probe(saved.global.as_ref(), &namespaces)
                .await?
        };

        if validity == OffsetValidity::Invalid {
            if let Some(position) = saved.global.clone()
                && self.settings.fails_on_invalid_position()
            {
                return Err(CdcError::InvalidResumePosition { position });
            }
            info!(
                streams = catalog.streams.len(),
                "Saved resume position is no longer retained by the source, resnapshotting every stream"
            );
        }

        let planned = SnapshotPlanner::new(self.bulk.as_ref(), &self.settings)
            .plan(catalog, &saved, validity)
            .await?;

        let target = capture_target_position(self.change_log.as_ref(), &namespaces).await?;
        let start_position = if validity.is_valid() {
            saved.global.clone()
        } else {
            target.clone()
        };

        // Snapshot checkpoints already carry the streaming start position.
        let mut run = SyncCheckpoint {
            global: start_position.clone(),
            streams: if validity == OffsetValidity::Invalid {
                Default::default()
            } else {
                saved.streams.clone()
            },
            schema_enforced: Some(self.settings.is_schema_enforced()),
        };
        for stream in &catalog.streams {
            run.streams.entry(stream.id.clone()).or_default();
        }
        for stream in &planned {
            run.streams
                .insert(stream.stream.id.clone(), stream.initial_state());
        }

        info!(
            snapshot_streams = planned.len(),
            streaming_streams = namespaces.len(),
            validity = ?validity,
            target = ?target.as_ref().map(|t| t.to_string()),
            "Composed sync run"
        );

        let state = StateManager::new(run);
        let injector = Arc::new(MetadataInjector::new(Utc::now()));
        let normalizer = Arc::new(DataNormalizer::new(self.settings.schema_mode(), injector));

        let snapshot = SnapshotIterator::new(
            self.bulk.clone(),
            normalizer.clone(),
            state.clone(),
            self.metrics.clone(),
            self.settings.checkpoint_interval(),
            planned,
        );

        let streaming = StreamingIterator::new(
            self.change_log.clone(),
            catalog.incremental_streams().cloned().collect(),
            start_position,
            target.map(TargetPositionTracker::new),
            normalizer,
            state,
            self.metrics.clone(),
        );

        Ok(CdcIterators {
            snapshot,
            streaming,
        })
    }
}
