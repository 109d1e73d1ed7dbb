use crate::settings::{
    error::SettingsError,
    validated::{CdcSettings, CdcSettingsBuilder},
};
use model::catalog::stream::SchemaMode;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub mod error;
pub mod validated;

/// What to do when the saved resume position is no longer retained by the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidPositionBehavior {
    /// Drop every stream's snapshot progress and copy everything again.
    #[default]
    ResyncData,
    /// Abort the run and leave the decision to the operator.
    FailSync,
}

/// Settings as written by the user; every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawSettings {
    pub checkpoint_interval: Option<usize>,
    pub schema_mode: Option<SchemaMode>,
    pub invalid_position_behavior: Option<InvalidPositionBehavior>,
    pub snapshot_target_chunk_bytes: Option<u64>,
}

impl CdcSettings {
    /// Parses and validates settings from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let raw: RawSettings = serde_json::from_str(json)?;
        Self::from_raw(raw)
    }

    pub fn from_raw(raw: RawSettings) -> Result<Self, SettingsError> {
        let mut builder = CdcSettingsBuilder::new();

        if let Some(interval) = raw.checkpoint_interval {
            if interval > 100_000 {
                warn!(
                    interval,
                    "Checkpoint interval is very large, a crash may replay many documents"
                );
            }
            builder = builder.checkpoint_interval(interval);
        }
        if let Some(mode) = raw.schema_mode {
            builder = builder.schema_mode(mode);
        }
        if let Some(behavior) = raw.invalid_position_behavior {
            builder = builder.invalid_position_behavior(behavior);
        }
        if let Some(bytes) = raw.snapshot_target_chunk_bytes {
            builder = builder.snapshot_target_chunk_bytes(bytes);
        }

        let settings = builder.build()?;
        info!(
            checkpoint_interval = settings.checkpoint_interval(),
            schema_mode = ?settings.schema_mode(),
            invalid_position_behavior = ?settings.invalid_position_behavior(),
            "Settings validated"
        );
        Ok(settings)
    }
}
