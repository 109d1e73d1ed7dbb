use engine_config::settings::error::SettingsError;
use engine_core::error::SourceError;
use model::{
    core::{identifiers::StreamIdentifier, value::ValueKind},
    pagination::{cursor::IdType, position::GlobalCheckpoint},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CdcError {
    #[error("Primary keys in stream '{stream}' must be consistently typed, found: {types}")]
    InconsistentKeyType {
        stream: StreamIdentifier,
        types: String,
    },

    #[error(
        "Stream '{stream}' has an _id of type '{found}'. Only _id fields with the following types are currently supported: {supported}",
        supported = IdType::supported_names()
    )]
    UnsupportedKeyType {
        stream: StreamIdentifier,
        found: ValueKind,
    },

    #[error("Malformed change event: {reason}")]
    MalformedEvent { reason: String },

    #[error(
        "Saved resume position {position} is no longer available in the change log. Reset the streams to resynchronize."
    )]
    InvalidResumePosition { position: GlobalCheckpoint },

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("State store operation failed: {source}")]
    StateStore {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),
}

impl CdcError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        CdcError::MalformedEvent {
            reason: reason.into(),
        }
    }

    /// Fatal errors abort the run and must not be retried; the rest are
    /// connectivity or storage failures whose retry policy belongs to the caller.
    pub fn is_fatal(&self) -> bool {
        match self {
            CdcError::InconsistentKeyType { .. }
            | CdcError::UnsupportedKeyType { .. }
            | CdcError::MalformedEvent { .. }
            | CdcError::InvalidResumePosition { .. }
            | CdcError::Settings(_) => true,
            CdcError::Source(_) | CdcError::StateStore { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_type_errors_name_the_stream() {
        let err = CdcError::InconsistentKeyType {
            stream: StreamIdentifier::new("shop", "orders"),
            types: "objectId, string".to_string(),
        };
        assert!(err.is_fatal());
        assert!(err.to_string().contains("shop.orders"));
        assert!(err.to_string().contains("must be consistently typed"));

        let err = CdcError::UnsupportedKeyType {
            stream: StreamIdentifier::new("shop", "orders"),
            found: ValueKind::Double,
        };
        assert!(
            err.to_string()
                .contains("_id fields with the following types are currently supported: ObjectId, String, Int, Long, Binary")
        );
    }

    #[test]
    fn source_failures_are_left_to_the_caller() {
        let err = CdcError::from(SourceError::Connection("reset by peer".into()));
        assert!(!err.is_fatal());
    }
}
