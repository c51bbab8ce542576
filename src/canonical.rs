//! Card name canonicalization.
//!
//! Maps free-text card names and known aliases to a canonical identity using
//! two flat tables (alias → canonical key, canonical key → [`CardRecord`]).
//! The tables are loaded from newline-delimited JSON files on first use and
//! refreshed when older than the configured TTL. A reload builds a complete
//! new [`Snapshot`] and swaps it in, so readers only ever see whole tables.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, UNIX_EPOCH};

use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::card::CardRecord;
use crate::config::CanonConfig;
use crate::ids::OracleId;
use crate::name::normalize_name;

pub const ALIAS_FILE_NAME: &str = "aliases.jsonl";
pub const CARDS_FILE_NAME: &str = "canonical_cards.jsonl";

/// Aliases installed when no alias file yields a single entry.
const DEFAULT_ALIASES: [(&str, &str); 3] = [
    ("l. bolt", "lightning bolt"),
    ("lightning bolt", "lightning bolt"),
    ("sol ring", "sol ring"),
];

/// Result of canonicalizing a name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Canonical {
    /// Authored card name when the card table knows it, otherwise the
    /// normalized (possibly alias-mapped) input.
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oracle_id: Option<OracleId>,
}

impl Canonical {
    /// The equality key of the canonical name.
    pub fn key(&self) -> String {
        normalize_name(&self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DataFileKind {
    Aliases,
    Cards,
}

/// One immutable generation of the alias and card tables.
#[derive(Debug)]
pub struct Snapshot {
    aliases: HashMap<String, String>,
    cards: HashMap<String, CardRecord>,
    loaded_at: Instant,
    /// Fixture snapshots never expire by TTL.
    pinned: bool,
    version: String,
    files: Vec<PathBuf>,
}

impl Snapshot {
    fn from_tables(aliases: HashMap<String, String>, cards: HashMap<String, CardRecord>) -> Self {
        let version = format!("fixture:a{}:c{}", aliases.len(), cards.len());
        Self {
            aliases,
            cards,
            loaded_at: Instant::now(),
            pinned: true,
            version,
            files: Vec::new(),
        }
    }

    /// The same tables with a fresh load time.
    fn retained(&self) -> Self {
        Self {
            aliases: self.aliases.clone(),
            cards: self.cards.clone(),
            loaded_at: Instant::now(),
            pinned: self.pinned,
            version: self.version.clone(),
            files: self.files.clone(),
        }
    }

    fn is_stale(&self, ttl: Duration) -> bool {
        !self.pinned && self.loaded_at.elapsed() >= ttl
    }

    fn canonicalize(&self, raw: &str) -> Canonical {
        let key = normalize_name(raw);
        if key.is_empty() {
            return Canonical {
                name: String::new(),
                oracle_id: None,
            };
        }

        let mapped = self.aliases.get(&key).unwrap_or(&key);
        match self.cards.get(mapped).or_else(|| self.cards.get(&key)) {
            Some(record) => Canonical {
                name: record.name.clone(),
                oracle_id: record.oracle_id.clone(),
            },
            None => Canonical {
                name: mapped.clone(),
                oracle_id: None,
            },
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn alias_count(&self) -> usize {
        self.aliases.len()
    }

    pub fn card_count(&self) -> usize {
        self.cards.len()
    }

    /// Card record for an already-canonical key.
    pub fn card(&self, key: &str) -> Option<&CardRecord> {
        self.cards.get(key)
    }
}

/// Counters and load metadata, for health endpoints and tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonStats {
    pub hits: u64,
    pub misses: u64,
    pub loaded: bool,
    pub age_ms: Option<u64>,
    pub ttl_ms: u64,
    pub version: Option<String>,
    pub files: Vec<PathBuf>,
    pub alias_entries: usize,
    pub card_entries: usize,
}

/// Owns the canonicalization tables.
///
/// Construct one per process (or per test) and share it behind an `Arc`.
#[derive(Debug)]
pub struct Canonicalizer {
    config: CanonConfig,
    current: RwLock<Option<Arc<Snapshot>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Canonicalizer {
    /// Creates a canonicalizer that loads its tables lazily from `config`.
    pub fn new(config: CanonConfig) -> Self {
        Self {
            config,
            current: RwLock::new(None),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Creates a canonicalizer over fixed tables. Keys are normalized; the
    /// snapshot never expires (an explicit [`reload`](Self::reload) still
    /// replaces it with file data).
    pub fn from_tables<A, K, V>(aliases: A, cards: impl IntoIterator<Item = CardRecord>) -> Self
    where
        A: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let aliases = aliases
            .into_iter()
            .map(|(alias, canonical)| (normalize_name(alias.as_ref()), normalize_name(canonical.as_ref())))
            .filter(|(alias, canonical)| !alias.is_empty() && !canonical.is_empty())
            .collect();
        let cards = cards
            .into_iter()
            .map(|record| (record.key(), record))
            .collect();

        let canonicalizer = Self::new(CanonConfig::default());
        *canonicalizer.current.write() = Some(Arc::new(Snapshot::from_tables(aliases, cards)));
        canonicalizer
    }

    pub fn config(&self) -> &CanonConfig {
        &self.config
    }

    /// Canonicalizes `raw`. Never fails; an unknown name comes back normalized.
    pub fn canonicalize(&self, raw: &str) -> Canonical {
        let canonical = self.snapshot().canonicalize(raw);
        if canonical.name.is_empty() {
            self.misses.fetch_add(1, Ordering::Relaxed);
        } else {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        canonical
    }

    /// Shorthand for `normalize_name(&canonicalize(raw).name)`.
    pub fn canonical_key(&self, raw: &str) -> String {
        self.canonicalize(raw).key()
    }

    /// The current snapshot, loading or refreshing it if needed.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        let current = self.current.read().clone();
        match current {
            Some(snapshot) if !snapshot.is_stale(self.config.ttl()) => snapshot,
            _ => self.reload_snapshot(),
        }
    }

    /// Forces a reload from the configured files and returns the new version tag.
    pub fn reload(&self) -> String {
        self.reload_snapshot().version.clone()
    }

    fn reload_snapshot(&self) -> Arc<Snapshot> {
        let loaded = load_snapshot(&self.config);
        if !loaded.unreadable.is_empty() {
            let current = self.current.read().clone();
            if let Some(current) = current {
                tracing::warn!(
                    version = %current.version,
                    unreadable = loaded.unreadable.len(),
                    "canonical data unreadable; keeping last good tables"
                );
                let kept = Arc::new(current.retained());
                *self.current.write() = Some(Arc::clone(&kept));
                return kept;
            }
        }

        let next = Arc::new(loaded.snapshot);
        tracing::debug!(
            version = %next.version,
            aliases = next.aliases.len(),
            cards = next.cards.len(),
            files = next.files.len(),
            "canonical tables loaded"
        );
        *self.current.write() = Some(Arc::clone(&next));
        next
    }

    pub fn stats(&self) -> CanonStats {
        let current = self.current.read().clone();
        CanonStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            loaded: current.is_some(),
            age_ms: current
                .as_ref()
                .map(|snapshot| snapshot.loaded_at.elapsed().as_millis() as u64),
            ttl_ms: self.config.ttl_ms,
            version: current.as_ref().map(|snapshot| snapshot.version.clone()),
            files: current
                .as_ref()
                .map(|snapshot| snapshot.files.clone())
                .unwrap_or_default(),
            alias_entries: current.as_ref().map_or(0, |snapshot| snapshot.aliases.len()),
            card_entries: current.as_ref().map_or(0, |snapshot| snapshot.cards.len()),
        }
    }
}

impl Default for Canonicalizer {
    fn default() -> Self {
        Self::new(CanonConfig::default())
    }
}

fn candidate_files(config: &CanonConfig) -> Vec<(PathBuf, DataFileKind)> {
    let mut candidates = Vec::new();
    if let Some(path) = &config.alias_file {
        candidates.push((path.clone(), DataFileKind::Aliases));
    }
    if let Some(path) = &config.cards_file {
        candidates.push((path.clone(), DataFileKind::Cards));
    }
    for dir in &config.data_dirs {
        candidates.push((dir.join(ALIAS_FILE_NAME), DataFileKind::Aliases));
        candidates.push((dir.join(CARDS_FILE_NAME), DataFileKind::Cards));
    }

    let mut seen = Vec::with_capacity(candidates.len());
    candidates.retain(|(path, _)| {
        if seen.contains(path) {
            false
        } else {
            seen.push(path.clone());
            true
        }
    });
    candidates
}

enum DataFile {
    Missing,
    Unreadable,
    Text(String),
}

fn read_data_file(path: &Path) -> DataFile {
    match fs::read_to_string(path) {
        Ok(text) => DataFile::Text(text),
        Err(err) if err.kind() == io::ErrorKind::NotFound => DataFile::Missing,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "unreadable canonical data file");
            DataFile::Unreadable
        }
    }
}

/// First present, non-null value among `keys`, as a trimmed string.
fn string_field(value: &Value, keys: &[&str]) -> Option<String> {
    let field = keys
        .iter()
        .find_map(|key| value.get(*key).filter(|field| !field.is_null()))?;
    let text = match field {
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) => number.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn parse_alias_line(line: &str) -> Option<(String, String)> {
    let value: Value = serde_json::from_str(line).ok()?;
    let alias = normalize_name(&string_field(&value, &["alias", "from"])?);
    let canonical = normalize_name(&string_field(&value, &["canonical", "to", "name"])?);
    if alias.is_empty() || canonical.is_empty() {
        return None;
    }
    Some((alias, canonical))
}

fn parse_card_line(line: &str) -> Option<CardRecord> {
    let mut record: CardRecord = serde_json::from_str(line).ok()?;
    record.name = record.name.trim().to_string();
    (!record.name.is_empty()).then_some(record)
}

fn parse_alias_lines(text: &str, into: &mut HashMap<String, String>) -> usize {
    let mut skipped = 0;
    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        match parse_alias_line(line) {
            Some((alias, canonical)) => {
                into.insert(alias, canonical);
            }
            None => skipped += 1,
        }
    }
    skipped
}

pub(crate) fn parse_card_lines(text: &str, into: &mut HashMap<String, CardRecord>) -> usize {
    let mut skipped = 0;
    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        match parse_card_line(line) {
            Some(record) => {
                into.insert(record.key(), record);
            }
            None => skipped += 1,
        }
    }
    skipped
}

struct LoadedTables {
    snapshot: Snapshot,
    /// Files that exist but could not be read.
    unreadable: Vec<PathBuf>,
}

fn load_snapshot(config: &CanonConfig) -> LoadedTables {
    let mut aliases = HashMap::new();
    let mut cards = HashMap::new();
    let mut files = Vec::new();
    let mut unreadable = Vec::new();

    for (path, kind) in candidate_files(config) {
        let text = match read_data_file(&path) {
            DataFile::Text(text) => text,
            DataFile::Missing => continue,
            DataFile::Unreadable => {
                unreadable.push(path);
                continue;
            }
        };
        let skipped = match kind {
            DataFileKind::Aliases => parse_alias_lines(&text, &mut aliases),
            DataFileKind::Cards => parse_card_lines(&text, &mut cards),
        };
        if skipped > 0 {
            tracing::debug!(path = %path.display(), skipped, "skipped malformed canonical data lines");
        }
        files.push(path);
    }

    if aliases.is_empty() {
        aliases.extend(
            DEFAULT_ALIASES
                .iter()
                .map(|(alias, canonical)| (alias.to_string(), canonical.to_string())),
        );
    }

    let version = format!(
        "{}:a{}:c{}",
        files_version(&files),
        aliases.len(),
        cards.len()
    );

    LoadedTables {
        snapshot: Snapshot {
            aliases,
            cards,
            loaded_at: Instant::now(),
            pinned: false,
            version,
            files,
        },
        unreadable,
    }
}

/// Hash of path, size and modification time of every file used.
fn files_version(files: &[PathBuf]) -> String {
    let mut hasher = Sha256::new();
    for path in files {
        let Ok(meta) = fs::metadata(path) else {
            continue;
        };
        let modified = meta
            .modified()
            .ok()
            .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
            .map_or(0, |since| since.as_nanos());
        hasher.update(path.to_string_lossy().as_bytes());
        hasher.update(meta.len().to_string().as_bytes());
        hasher.update(modified.to_string().as_bytes());
    }
    let digest = format!("{:x}", hasher.finalize());
    digest[..12].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::ColorSet;

    fn fixture() -> Canonicalizer {
        Canonicalizer::from_tables(
            [("L. Bolt", "Lightning Bolt"), ("Signet", "Arcane Signet")],
            [
                CardRecord::new("Lightning Bolt")
                    .oracle_id("4457ed35")
                    .color_identity(ColorSet::RED),
                CardRecord::new("Arcane Signet"),
            ],
        )
    }

    #[test]
    fn test_whitespace_and_alias_equivalence() {
        let canon = fixture();
        let plain = canon.canonicalize("Lightning Bolt");
        assert_eq!(plain.name, "Lightning Bolt");
        assert_eq!(plain.oracle_id, Some(OracleId::new("4457ed35")));
        assert_eq!(canon.canonicalize("lightning   bolt"), plain);
        assert_eq!(canon.canonicalize("L. Bolt"), plain);
        assert_eq!(canon.canonicalize("l.  BOLT"), plain);
    }

    #[test]
    fn test_unknown_name_canonicalizes_to_itself() {
        let canon = fixture();
        let unknown = canon.canonicalize("  Some   Brand New Card ");
        assert_eq!(unknown.name, "some brand new card");
        assert_eq!(unknown.oracle_id, None);
    }

    #[test]
    fn test_alias_to_unknown_card_returns_mapped_key() {
        let canon = Canonicalizer::from_tables([("bob", "dark confidant")], Vec::new());
        assert_eq!(canon.canonicalize("Bob").name, "dark confidant");
    }

    #[test]
    fn test_empty_input_counts_as_miss() {
        let canon = fixture();
        assert_eq!(canon.canonicalize("   ").name, "");
        canon.canonicalize("Signet");
        let stats = canon.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.version.as_deref(), Some("fixture:a2:c2"));
    }

    #[test]
    fn test_fixture_snapshot_does_not_expire() {
        let canon = fixture();
        let before = canon.snapshot();
        let after = canon.snapshot();
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn test_parse_alias_line_key_precedence() {
        assert_eq!(
            parse_alias_line(r#"{"from":"Bolt","to":"Lightning Bolt"}"#),
            Some(("bolt".to_string(), "lightning bolt".to_string()))
        );
        assert_eq!(
            parse_alias_line(r#"{"alias":"Bolt","canonical":"Lightning Bolt","name":"x"}"#),
            Some(("bolt".to_string(), "lightning bolt".to_string()))
        );
        assert_eq!(parse_alias_line(r#"{"alias":"Bolt"}"#), None);
        assert_eq!(parse_alias_line("not json"), None);
    }

    #[test]
    fn test_parse_card_lines_skips_malformed() {
        let mut cards = HashMap::new();
        let skipped = parse_card_lines(
            "{\"name\":\" Sol Ring \",\"oracle_id\":\"abc\"}\n\n{\"oracle_id\":\"no-name\"}\n{broken\n{\"name\":\"Bolt\",\"color_identity\":[\"Q\"]}\n",
            &mut cards,
        );
        assert_eq!(skipped, 3);
        assert_eq!(cards.len(), 1);
        assert_eq!(cards["sol ring"].name, "Sol Ring");
    }

    #[test]
    fn test_missing_files_fall_back_to_default_aliases() {
        let canon = Canonicalizer::new(CanonConfig {
            data_dirs: vec![PathBuf::from("/nonexistent/deckguard-data")],
            ..CanonConfig::default()
        });
        assert_eq!(canon.canonicalize("L. Bolt").name, "lightning bolt");
        let stats = canon.stats();
        assert!(stats.loaded);
        assert!(stats.files.is_empty());
        assert_eq!(stats.alias_entries, DEFAULT_ALIASES.len());
        assert_eq!(stats.card_entries, 0);
    }
}
