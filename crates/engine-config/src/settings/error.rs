use thiserror::Error;

/// Errors raised when loading or validating sync settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("checkpoint_interval must be greater than zero")]
    InvalidCheckpointInterval,

    #[error("snapshot_target_chunk_bytes must be greater than zero")]
    InvalidChunkTarget,

    /// The settings document could not be parsed.
    #[error("Failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),

    /// Records already synced were produced under a different schema mode.
    #[error(
        "Mismatch between schema enforcing mode in sync configuration ({config}), catalog ({catalog}) and saved state ({state}). {remedy}"
    )]
    SchemaModeMismatch {
        config: bool,
        catalog: bool,
        state: bool,
        remedy: String,
    },
}
