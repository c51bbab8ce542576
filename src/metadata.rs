//! Batched card metadata lookups against an external name-keyed cache.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::canonical::parse_card_lines;
use crate::card::CardRecord;
use crate::config::ResolverConfig;
use crate::error::{CacheError, LoadError};
use crate::name::normalize_name;

/// Read interface of the card metadata store.
///
/// `fetch_many` receives normalized names and returns whatever records it has.
/// Keys in the returned map are the store's own keys and may differ from the
/// requested names in whitespace; missing names are simply absent.
pub trait CardCache: Send + Sync {
    fn fetch_many(&self, names: &[String]) -> Result<HashMap<String, CardRecord>, CacheError>;
}

/// Records returned by [`MetadataResolver::resolve_many`].
#[derive(Debug, Clone, Default)]
pub struct ResolvedCards {
    records: HashMap<String, CardRecord>,
}

impl ResolvedCards {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, record: CardRecord) {
        self.records.insert(key.into(), record);
    }

    /// Two-tier lookup: exact hit on the normalized name, then a scan that
    /// normalizes each stored key. The scan covers stores whose keys differ
    /// from ours only in internal whitespace.
    pub fn lookup(&self, name: &str) -> Option<&CardRecord> {
        let key = normalize_name(name);
        if let Some(record) = self.records.get(&key) {
            return Some(record);
        }
        self.records
            .iter()
            .find(|(stored, _)| normalize_name(stored) == key)
            .map(|(_, record)| record)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Normalizes, deduplicates and batches lookups against a [`CardCache`].
#[derive(Clone)]
pub struct MetadataResolver {
    cache: Arc<dyn CardCache>,
    batch_size: usize,
}

impl MetadataResolver {
    pub fn new(cache: Arc<dyn CardCache>, config: &ResolverConfig) -> Self {
        Self {
            cache,
            batch_size: config.batch_size.max(1),
        }
    }

    /// Resolves `names`. A failing batch is logged and its names left absent;
    /// callers treat absent metadata as unknown.
    pub fn resolve_many<S: AsRef<str>>(&self, names: &[S]) -> ResolvedCards {
        let mut seen = HashSet::new();
        let keys: Vec<String> = names
            .iter()
            .map(|name| normalize_name(name.as_ref()))
            .filter(|key| !key.is_empty() && seen.insert(key.clone()))
            .collect();

        let mut resolved = ResolvedCards::new();
        for batch in keys.chunks(self.batch_size) {
            match self.cache.fetch_many(batch) {
                Ok(records) => resolved.records.extend(records),
                Err(err) => {
                    tracing::warn!(
                        error = %err,
                        names = batch.len(),
                        "card metadata unavailable; treating batch as unknown"
                    );
                }
            }
        }

        tracing::debug!(
            requested = keys.len(),
            resolved = resolved.len(),
            "resolved card metadata"
        );
        resolved
    }
}

impl std::fmt::Debug for MetadataResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataResolver")
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

/// A [`CardCache`] held entirely in memory, keyed by normalized name.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCardCache {
    cards: HashMap<String, CardRecord>,
}

impl InMemoryCardCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: CardRecord) {
        self.cards.insert(record.key(), record);
    }

    /// Loads a `canonical_cards.jsonl`-shaped file; malformed lines are skipped.
    pub fn from_jsonl_path(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| LoadError::io(path, err))?;
        let mut cards = HashMap::new();
        let skipped = parse_card_lines(&text, &mut cards);
        if skipped > 0 {
            tracing::debug!(path = %path.display(), skipped, "skipped malformed card cache lines");
        }
        Ok(Self { cards })
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

impl FromIterator<CardRecord> for InMemoryCardCache {
    fn from_iter<T: IntoIterator<Item = CardRecord>>(iter: T) -> Self {
        let mut cache = Self::new();
        for record in iter {
            cache.insert(record);
        }
        cache
    }
}

impl CardCache for InMemoryCardCache {
    fn fetch_many(&self, names: &[String]) -> Result<HashMap<String, CardRecord>, CacheError> {
        Ok(names
            .iter()
            .filter_map(|name| {
                self.cards
                    .get(name)
                    .map(|record| (name.clone(), record.clone()))
            })
            .collect())
    }
}
