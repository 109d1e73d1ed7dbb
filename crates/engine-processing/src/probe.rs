use crate::error::CdcError;
use engine_core::connectors::source::ChangeLogClient;
use model::{core::identifiers::StreamIdentifier, pagination::position::GlobalCheckpoint};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetValidity {
    /// Nothing was saved.
    Absent,
    Valid,
    /// The source no longer retains the saved position.
    Invalid,
}

impl OffsetValidity {
    pub fn is_valid(&self) -> bool {
        *self == OffsetValidity::Valid
    }
}

/// Checks whether a saved resume position can still be honored by opening a
/// short-lived cursor at it.
pub struct OffsetProber<'a> {
    client: &'a dyn ChangeLogClient,
}

impl<'a> OffsetProber<'a> {
    pub fn new(client: &'a dyn ChangeLogClient) -> Self {
        Self { client }
    }

    /// Only "position not found" makes a position invalid; every other failure
    /// propagates.
    pub async fn probe(
        &self,
        saved: Option<&GlobalCheckpoint>,
        namespaces: &[StreamIdentifier],
    ) -> Result<OffsetValidity, CdcError> {
        let Some(position) = saved else {
            return Ok(OffsetValidity::Absent);
        };

        match self.client.open_cursor(Some(position), namespaces).await {
            Ok(mut cursor) => {
                if let Err(e) = cursor.close().await {
                    warn!(error = %e, "Failed to close probe cursor");
                }
                debug!(position = %position, "Saved resume position is valid");
                Ok(OffsetValidity::Valid)
            }
            Err(e) if e.is_position_not_found() => {
                debug!(position = %position, error = %e, "Saved resume position is no longer retained");
                Ok(OffsetValidity::Invalid)
            }
            Err(e) => Err(CdcError::Source(e)),
        }
    }
}
