use crate::{error::CdcError, probe::OffsetValidity};
use engine_config::settings::validated::CdcSettings;
use engine_core::{
    connectors::source::{BulkReadClient, CollectionStatistics},
    state::models::{SnapshotStatus, StreamSnapshotState, SyncCheckpoint},
};
use model::{
    catalog::{ConfiguredCatalog, stream::ConfiguredStream},
    core::value::ValueKind,
    pagination::cursor::{IdType, PrimaryKey},
};
use tracing::{info, warn};

/// Documents per chunk when nothing better can be estimated.
pub const DEFAULT_CHUNK_SIZE: u64 = 1_000_000;

/// Estimated number of documents that fit in `target_bytes`.
pub fn chunk_size_for(stats: Option<&CollectionStatistics>, target_bytes: u64) -> u64 {
    match stats {
        Some(stats) if stats.count > 0 && stats.size_bytes > 0 && stats.size_bytes >= target_bytes => {
            let avg_doc_bytes = stats.size_bytes / stats.count;
            if avg_doc_bytes == 0 {
                DEFAULT_CHUNK_SIZE
            } else {
                target_bytes / avg_doc_bytes
            }
        }
        _ => DEFAULT_CHUNK_SIZE,
    }
}

/// A stream scheduled for snapshot.
#[derive(Debug, Clone)]
pub struct PlannedStream {
    pub stream: ConfiguredStream,
    /// Scan strictly after this key; `None` starts from the beginning.
    pub resume_after: Option<PrimaryKey>,
    pub key_type: Option<IdType>,
    pub statistics: Option<CollectionStatistics>,
    /// Documents the scan fetches per round trip.
    pub chunk_size: u64,
}

impl PlannedStream {
    /// State the run starts this stream from.
    pub fn initial_state(&self) -> StreamSnapshotState {
        match &self.resume_after {
            Some(key) => StreamSnapshotState::in_progress(key.clone()),
            None => StreamSnapshotState::not_started(),
        }
    }
}

pub struct SnapshotPlanner<'a> {
    bulk: &'a dyn BulkReadClient,
    settings: &'a CdcSettings,
}

impl<'a> SnapshotPlanner<'a> {
    pub fn new(bulk: &'a dyn BulkReadClient, settings: &'a CdcSettings) -> Self {
        Self { bulk, settings }
    }

    /// Decides which streams to snapshot and where each one resumes.
    ///
    /// Without a valid global position every stream is copied again, since
    /// streams already complete could not catch up through the change log.
    pub async fn plan(
        &self,
        catalog: &ConfiguredCatalog,
        checkpoint: &SyncCheckpoint,
        validity: OffsetValidity,
    ) -> Result<Vec<PlannedStream>, CdcError> {
        let mut planned = Vec::new();

        for stream in &catalog.streams {
            let saved = checkpoint.stream(&stream.id).cloned().unwrap_or_default();

            let resume_after = match (validity, stream.is_incremental(), saved.status) {
                (OffsetValidity::Invalid, _, _) => None,
                (OffsetValidity::Valid, true, SnapshotStatus::Complete) => continue,
                (_, _, SnapshotStatus::InProgress) => saved.resume_key().cloned(),
                _ => None,
            };

            let key_type = self.check_key_types(stream, resume_after.as_ref()).await?;
            let statistics = self.statistics(stream).await;
            let chunk_size =
                chunk_size_for(statistics.as_ref(), self.settings.snapshot_target_chunk_bytes());

            info!(
                stream = %stream.id,
                resume_after = ?resume_after.as_ref().map(|k| k.to_string()),
                chunk_size,
                "Scheduling stream for snapshot"
            );

            planned.push(PlannedStream {
                stream: stream.clone(),
                resume_after,
                key_type,
                statistics,
                chunk_size,
            });
        }

        Ok(planned)
    }

    async fn check_key_types(
        &self,
        stream: &ConfiguredStream,
        resume_after: Option<&PrimaryKey>,
    ) -> Result<Option<IdType>, CdcError> {
        let mut kinds = self.bulk.id_types(&stream.id).await?;
        kinds.sort();
        kinds.dedup();

        if kinds.len() > 1 {
            return Err(CdcError::InconsistentKeyType {
                stream: stream.id.clone(),
                types: join_kinds(&kinds),
            });
        }

        let discovered = match kinds.first() {
            Some(kind) => Some(IdType::from_kind(*kind).ok_or_else(|| {
                CdcError::UnsupportedKeyType {
                    stream: stream.id.clone(),
                    found: *kind,
                }
            })?),
            None => None,
        };

        let saved = resume_after.map(|k| k.id_type());
        match (saved, discovered) {
            (Some(saved), Some(discovered)) if saved != discovered => {
                Err(CdcError::InconsistentKeyType {
                    stream: stream.id.clone(),
                    types: format!("{saved} (saved), {discovered}"),
                })
            }
            (saved, discovered) => Ok(discovered.or(saved)),
        }
    }

    /// Estimation only; a failure here never fails the run.
    async fn statistics(&self, stream: &ConfiguredStream) -> Option<CollectionStatistics> {
        match self.bulk.collection_statistics(&stream.id).await {
            Ok(stats) => stats,
            Err(e) => {
                warn!(stream = %stream.id, error = %e, "Unable to read collection statistics");
                None
            }
        }
    }
}

fn join_kinds(kinds: &[ValueKind]) -> String {
    kinds
        .iter()
        .map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const GIB: u64 = 1024 * 1024 * 1024;

    fn stats(count: u64, size_bytes: u64) -> Option<CollectionStatistics> {
        Some(CollectionStatistics { count, size_bytes })
    }

    #[test]
    fn chunk_size_defaults_without_usable_statistics() {
        assert_eq!(chunk_size_for(None, GIB), DEFAULT_CHUNK_SIZE);
        assert_eq!(chunk_size_for(stats(0, 0).as_ref(), GIB), DEFAULT_CHUNK_SIZE);
        assert_eq!(chunk_size_for(stats(0, 1000).as_ref(), GIB), DEFAULT_CHUNK_SIZE);
        assert_eq!(chunk_size_for(stats(1000, 0).as_ref(), GIB), DEFAULT_CHUNK_SIZE);
        assert_eq!(chunk_size_for(stats(1000, 999).as_ref(), GIB), DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn chunk_size_scales_with_average_document_size() {
        assert_eq!(
            chunk_size_for(stats(1_000_000, 10 * GIB).as_ref(), GIB),
            100_003
        );
    }
}
