pub mod canonical;
pub mod card;
pub mod color;
pub mod config;
pub mod directive;
pub mod error;
pub mod ids;
pub mod metadata;
pub mod name;
pub mod repair;
pub mod rules;

pub use canonical::{CanonStats, Canonical, Canonicalizer, Snapshot};
pub use card::CardRecord;
pub use color::{Color, ColorParseError, ColorSet};
pub use config::{CanonConfig, GuardConfig, ResolverConfig, RuleConfig};
pub use directive::{
    Block, Directive, DirectiveKind, Format, Marker, add_targets, cut_targets, enforce_brackets,
    parse_directives, scan_line,
};
pub use error::{CacheError, LoadError};
pub use ids::OracleId;
pub use metadata::{CardCache, InMemoryCardCache, MetadataResolver, ResolvedCards};
pub use name::{normalize_name, same_card};
pub use repair::{
    MIN_BLOCKS_BEFORE_REGENERATION, Pipeline, REGENERATION_SYSTEM_MESSAGE, RemovedDirective,
    RepairPass, RepairResult, repair,
};
pub use rules::{
    CommanderColorTable, DeckCard, DeckContext, DowngradePair, DowngradeTable, Reason, RulePass,
    Severity, ValidationVerdict, Validator, Verdict,
};
