use serde::{Deserialize, Serialize};

use crate::color::ColorSet;
use crate::ids::OracleId;
use crate::name::normalize_name;

/// Static, immutable card metadata as served by the card tables and the
/// metadata cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRecord {
    /// Canonical name as authored ("Lightning Bolt", not "lightning bolt").
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oracle_id: Option<OracleId>,
    /// `None` when the source did not carry identity data. An empty set is a
    /// known colorless card.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_identity: Option<ColorSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_line: Option<String>,
}

impl CardRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            oracle_id: None,
            color_identity: None,
            type_line: None,
        }
    }

    pub fn oracle_id(mut self, id: impl Into<OracleId>) -> Self {
        self.oracle_id = Some(id.into());
        self
    }

    pub fn color_identity(mut self, colors: ColorSet) -> Self {
        self.color_identity = Some(colors);
        self
    }

    pub fn type_line(mut self, type_line: impl Into<String>) -> Self {
        self.type_line = Some(type_line.into());
        self
    }

    /// The equality key for this card.
    pub fn key(&self) -> String {
        normalize_name(&self.name)
    }

    /// Known, non-empty color identity.
    pub fn colored_identity(&self) -> Option<ColorSet> {
        self.color_identity.filter(|colors| !colors.is_empty())
    }
}
