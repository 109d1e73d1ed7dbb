use crate::error::CdcError;
use engine_core::connectors::source::ChangeLogClient;
use model::{
    core::identifiers::StreamIdentifier,
    pagination::position::{GlobalCheckpoint, SourceTimestamp},
    records::change::ChangeRecord,
};
use tracing::debug;

/// Latest of `candidates` by `(seconds, sequence)`.
pub fn most_recent_across_namespaces<I>(candidates: I) -> Option<GlobalCheckpoint>
where
    I: IntoIterator<Item = GlobalCheckpoint>,
{
    candidates.into_iter().max_by_key(|c| c.timestamp)
}

/// Logical clock of a change event.
pub fn extract_timestamp(record: &ChangeRecord) -> Result<SourceTimestamp, CdcError> {
    record.source_timestamp.ok_or_else(|| {
        let origin = record
            .namespace
            .as_ref()
            .map(|ns| ns.to_string())
            .unwrap_or_else(|| "heartbeat".to_string());
        CdcError::malformed(format!("{origin} event carries no source timestamp"))
    })
}

/// Position identity: token and clock. The transaction id is not part of it.
pub fn is_same_offset(a: &GlobalCheckpoint, b: &GlobalCheckpoint) -> bool {
    a.token == b.token && a.timestamp == b.timestamp
}

/// Asks the change log where each namespace currently is and keeps the most recent.
///
/// Returns `None` only when `namespaces` is empty.
pub async fn capture_target_position(
    client: &dyn ChangeLogClient,
    namespaces: &[StreamIdentifier],
) -> Result<Option<GlobalCheckpoint>, CdcError> {
    let mut candidates = Vec::with_capacity(namespaces.len());
    for namespace in namespaces {
        let position = client.current_position(namespace).await?;
        debug!(stream = %namespace, position = %position, "Current change log position");
        candidates.push(position);
    }
    Ok(most_recent_across_namespaces(candidates))
}
