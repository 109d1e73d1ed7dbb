use serde::{Deserialize, Serialize};
use std::fmt;

/// A replicated collection, addressed by its database (namespace) and collection name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StreamIdentifier {
    pub namespace: String,
    pub name: String,
}

impl StreamIdentifier {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for StreamIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.name)
    }
}

impl From<(&str, &str)> for StreamIdentifier {
    fn from((namespace, name): (&str, &str)) -> Self {
        Self::new(namespace, name)
    }
}
