use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical clock of the change log: wall-clock seconds plus an intra-second sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceTimestamp {
    pub seconds: u32,
    pub sequence: u32,
}

impl SourceTimestamp {
    pub const fn new(seconds: u32, sequence: u32) -> Self {
        Self { seconds, sequence }
    }
}

impl fmt::Display for SourceTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.seconds, self.sequence)
    }
}

/// Opaque resumable position in the change log, shared by every stream of one replica set.
///
/// `token` is whatever the source needs to reopen its cursor; ordering is defined by
/// `timestamp` alone. `transaction_id` is populated by the source and is not part of
/// the position's identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalCheckpoint {
    pub token: String,
    pub timestamp: SourceTimestamp,
    pub transaction_id: Option<String>,
}

impl GlobalCheckpoint {
    pub fn new(token: impl Into<String>, timestamp: SourceTimestamp) -> Self {
        Self {
            token: token.into(),
            timestamp,
            transaction_id: None,
        }
    }

    pub fn with_transaction_id(mut self, transaction_id: impl Into<String>) -> Self {
        self.transaction_id = Some(transaction_id.into());
        self
    }

    pub fn timestamp(&self) -> SourceTimestamp {
        self.timestamp
    }
}

impl fmt::Display for GlobalCheckpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.token, self.timestamp)
    }
}
