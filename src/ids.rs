use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier shared by every printing of a card (Scryfall's `oracle_id`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OracleId(pub String);

impl OracleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OracleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OracleId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}
