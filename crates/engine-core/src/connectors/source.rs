use crate::error::SourceError;
use async_trait::async_trait;
use model::{
    core::{
        identifiers::StreamIdentifier,
        value::{Document, ValueKind},
    },
    pagination::{cursor::PrimaryKey, position::GlobalCheckpoint},
    records::change::ChangeRecord,
};

/// Size statistics of a collection, used only for estimation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionStatistics {
    pub count: u64,
    pub size_bytes: u64,
}

/// Open cursor over the change log.
///
/// Implementations must release the server-side cursor when dropped; `close`
/// is the graceful path and is always attempted by the engine first.
#[async_trait]
pub trait ChangeStream: Send {
    /// Waits for the next event. `Ok(None)` means the source ended the stream.
    async fn next(&mut self) -> Result<Option<ChangeRecord>, SourceError>;

    /// Position from which a new cursor would continue after the last returned event.
    fn resume_position(&self) -> Option<GlobalCheckpoint>;

    async fn close(&mut self) -> Result<(), SourceError>;
}

#[async_trait]
pub trait ChangeLogClient: Send + Sync {
    /// Opens a cursor at `position`, or at the current head of the log when `None`.
    ///
    /// A position the source no longer retains fails with
    /// [`SourceError::PositionNotFound`].
    async fn open_cursor(
        &self,
        position: Option<&GlobalCheckpoint>,
        namespaces: &[StreamIdentifier],
    ) -> Result<Box<dyn ChangeStream>, SourceError>;

    /// Most recent position the log has reached for `namespace`.
    async fn current_position(
        &self,
        namespace: &StreamIdentifier,
    ) -> Result<GlobalCheckpoint, SourceError>;
}

/// Open ordered scan over a collection. Same release contract as [`ChangeStream`].
#[async_trait]
pub trait DocumentScan: Send {
    async fn next(&mut self) -> Result<Option<Document>, SourceError>;

    async fn close(&mut self) -> Result<(), SourceError>;
}

#[async_trait]
pub trait BulkReadClient: Send + Sync {
    /// Scans `stream` in ascending primary-key order, strictly after `after` when given.
    ///
    /// `batch_size` is how many documents the source should fetch per round trip.
    async fn open_ordered_scan(
        &self,
        stream: &StreamIdentifier,
        after: Option<&PrimaryKey>,
        batch_size: u64,
    ) -> Result<Box<dyn DocumentScan>, SourceError>;

    /// Distinct types of the `_id` field across the collection.
    async fn id_types(&self, stream: &StreamIdentifier) -> Result<Vec<ValueKind>, SourceError>;

    /// `Ok(None)` when the source has no statistics for the collection.
    async fn collection_statistics(
        &self,
        stream: &StreamIdentifier,
    ) -> Result<Option<CollectionStatistics>, SourceError>;
}
