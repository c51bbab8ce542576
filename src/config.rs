//! Configuration supplied by the embedding application.
//!
//! Nothing in this crate reads environment variables. Every knob lives here,
//! defaults match the production deployment, and the whole struct can be
//! loaded from JSON.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::LoadError;
use crate::rules::{CommanderColorTable, DowngradeTable};

pub const DEFAULT_CANON_TTL_MS: u64 = 5 * 60 * 1000;
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Where the canonicalizer finds its alias and card files, and how long a
/// loaded snapshot stays fresh.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CanonConfig {
    pub ttl_ms: u64,
    /// Directories searched for `aliases.jsonl` and `canonical_cards.jsonl`.
    pub data_dirs: Vec<PathBuf>,
    /// Explicit alias file, read before the directories.
    pub alias_file: Option<PathBuf>,
    /// Explicit card file, read before the directories.
    pub cards_file: Option<PathBuf>,
}

impl CanonConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    /// A config that searches only `dir`.
    pub fn with_data_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dirs: vec![dir.into()],
            ..Self::default()
        }
    }
}

impl Default for CanonConfig {
    fn default() -> Self {
        Self {
            ttl_ms: DEFAULT_CANON_TTL_MS,
            data_dirs: vec![PathBuf::from("data")],
            alias_file: None,
            cards_file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Maximum names per cache round-trip.
    pub batch_size: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Opt-in rules beyond already-in-deck, off-color and strict-downgrade.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    /// Reject blocks whose paired CUT names a card that is not in the deck.
    pub check_cut_in_deck: bool,
    /// Constructed formats: reject `ADD +n` when the deck would exceed this many copies.
    pub max_copies: Option<u32>,
    /// Reject ADDs the metadata cache has never heard of.
    pub reject_unknown_cards: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    pub canon: CanonConfig,
    pub resolver: ResolverConfig,
    pub rules: RuleConfig,
    pub downgrades: DowngradeTable,
    pub commander_colors: CommanderColorTable,
}

impl GuardConfig {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| LoadError::io(path, err))?;
        Self::from_json_str(&text).map_err(|err| LoadError::json(path, err))
    }
}
