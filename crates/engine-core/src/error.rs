use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    /// The source no longer retains the requested resume position.
    #[error("Resume position is no longer available in the change log: {0}")]
    PositionNotFound(String),

    #[error("Connection to source failed: {0}")]
    Connection(String),

    #[error("Cursor operation failed: {0}")]
    Cursor(String),

    #[error("Unexpected source error: {0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl SourceError {
    pub fn is_position_not_found(&self) -> bool {
        matches!(self, SourceError::PositionNotFound(_))
    }
}

#[derive(Error, Debug)]
pub enum StateStoreError {
    #[error("Failed to save checkpoint: {0}")]
    SaveCheckpoint(String),

    #[error("Failed to load checkpoint: {0}")]
    LoadCheckpoint(String),
}
