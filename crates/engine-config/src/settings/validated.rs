use crate::settings::{InvalidPositionBehavior, error::SettingsError};
use model::catalog::stream::SchemaMode;

pub const DEFAULT_CHECKPOINT_INTERVAL: usize = 1000;
pub const DEFAULT_SNAPSHOT_TARGET_CHUNK_BYTES: u64 = 1024 * 1024 * 1024;

/// Immutable, validated configuration of one sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CdcSettings {
    /// Documents between snapshot state emissions
    checkpoint_interval: usize,
    /// How records are shaped against the discovered schema
    schema_mode: SchemaMode,
    /// Reaction to a resume position the source no longer retains
    invalid_position_behavior: InvalidPositionBehavior,
    /// Target size of one snapshot chunk, used for estimation only
    snapshot_target_chunk_bytes: u64,
}

impl Default for CdcSettings {
    fn default() -> Self {
        Self {
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
            schema_mode: SchemaMode::default(),
            invalid_position_behavior: InvalidPositionBehavior::default(),
            snapshot_target_chunk_bytes: DEFAULT_SNAPSHOT_TARGET_CHUNK_BYTES,
        }
    }
}

impl CdcSettings {
    pub fn builder() -> CdcSettingsBuilder {
        CdcSettingsBuilder::new()
    }

    pub fn checkpoint_interval(&self) -> usize {
        self.checkpoint_interval
    }

    pub fn schema_mode(&self) -> SchemaMode {
        self.schema_mode
    }

    pub fn invalid_position_behavior(&self) -> InvalidPositionBehavior {
        self.invalid_position_behavior
    }

    pub fn snapshot_target_chunk_bytes(&self) -> u64 {
        self.snapshot_target_chunk_bytes
    }

    pub fn is_schema_enforced(&self) -> bool {
        self.schema_mode.is_schema_enforced()
    }

    pub fn fails_on_invalid_position(&self) -> bool {
        self.invalid_position_behavior == InvalidPositionBehavior::FailSync
    }
}

#[derive(Debug, Default)]
pub struct CdcSettingsBuilder {
    pub checkpoint_interval: Option<usize>,
    pub schema_mode: Option<SchemaMode>,
    pub invalid_position_behavior: Option<InvalidPositionBehavior>,
    pub snapshot_target_chunk_bytes: Option<u64>,
}

impl CdcSettingsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn checkpoint_interval(mut self, interval: usize) -> Self {
        self.checkpoint_interval = Some(interval);
        self
    }

    pub fn schema_mode(mut self, mode: SchemaMode) -> Self {
        self.schema_mode = Some(mode);
        self
    }

    pub fn invalid_position_behavior(mut self, behavior: InvalidPositionBehavior) -> Self {
        self.invalid_position_behavior = Some(behavior);
        self
    }

    pub fn snapshot_target_chunk_bytes(mut self, bytes: u64) -> Self {
        self.snapshot_target_chunk_bytes = Some(bytes);
        self
    }

    pub fn build(self) -> Result<CdcSettings, SettingsError> {
        let checkpoint_interval = self
            .checkpoint_interval
            .unwrap_or(DEFAULT_CHECKPOINT_INTERVAL);
        if checkpoint_interval == 0 {
            return Err(SettingsError::InvalidCheckpointInterval);
        }

        let snapshot_target_chunk_bytes = self
            .snapshot_target_chunk_bytes
            .unwrap_or(DEFAULT_SNAPSHOT_TARGET_CHUNK_BYTES);
        if snapshot_target_chunk_bytes == 0 {
            return Err(SettingsError::InvalidChunkTarget);
        }

        Ok(CdcSettings {
            checkpoint_interval,
            schema_mode: self.schema_mode.unwrap_or_default(),
            invalid_position_behavior: self.invalid_position_behavior.unwrap_or_default(),
            snapshot_target_chunk_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = CdcSettings::default();
        assert_eq!(settings.checkpoint_interval(), 1000);
        assert_eq!(settings.snapshot_target_chunk_bytes(), 1_073_741_824);
        assert!(settings.is_schema_enforced());
        assert!(!settings.fails_on_invalid_position());
    }

    #[test]
    fn test_builder() {
        let settings = CdcSettings::builder()
            .checkpoint_interval(10)
            .schema_mode(SchemaMode::AllFields)
            .invalid_position_behavior(InvalidPositionBehavior::FailSync)
            .build()
            .unwrap();

        assert_eq!(settings.checkpoint_interval(), 10);
        assert!(settings.is_schema_enforced());
        assert!(settings.fails_on_invalid_position());
    }

    #[test]
    fn test_builder_rejects_zero_chunk_target() {
        let err = CdcSettings::builder()
            .snapshot_target_chunk_bytes(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, SettingsError::InvalidChunkTarget));
    }
}
