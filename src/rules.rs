//! Validation rules for parsed directives.
//!
//! Rules run per directive in a fixed order and the first failure wins:
//!
//! 1. already-in-deck (no metadata needed; constructed `ADD +n` is exempt)
//! 2. cut-not-in-deck, opt-in
//! 3. over-copy-limit, opt-in, constructed formats
//! 4. unknown-card, opt-in
//! 5. off-color, singleton format
//! 6. strict downgrade
//!
//! Rules 1-5 are hard failures, rule 6 is soft and runs in its own repair pass.
//! Missing metadata never fails a directive unless `reject_unknown_cards` is set.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::canonical::Canonicalizer;
use crate::color::ColorSet;
use crate::config::{GuardConfig, RuleConfig};
use crate::directive::{Directive, Format};
use crate::metadata::{CardCache, MetadataResolver, ResolvedCards};
use crate::name::normalize_name;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckCard {
    pub name: String,
    /// Copies in the deck; absent means one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
}

impl DeckCard {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            count: None,
        }
    }

    pub fn copies(&self) -> u32 {
        self.count.unwrap_or(1)
    }
}

/// The deck a piece of advice is about. Built fresh for every validation call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckContext {
    pub cards: Vec<DeckCard>,
    /// Explicit color identity; takes precedence over the commander table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_identity: Option<ColorSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commander: Option<String>,
    pub format: Format,
}

impl DeckContext {
    pub fn new(format: Format) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }

    pub fn commander_deck() -> Self {
        Self::new(Format::Commander)
    }

    pub fn card(mut self, name: impl Into<String>) -> Self {
        self.cards.push(DeckCard::new(name));
        self
    }

    pub fn card_copies(mut self, name: impl Into<String>, count: u32) -> Self {
        self.cards.push(DeckCard {
            name: name.into(),
            count: Some(count),
        });
        self
    }

    pub fn cards<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cards.extend(names.into_iter().map(DeckCard::new));
        self
    }

    pub fn color_identity(mut self, colors: ColorSet) -> Self {
        self.color_identity = Some(colors);
        self
    }

    pub fn commander(mut self, name: impl Into<String>) -> Self {
        self.commander = Some(name.into());
        self
    }
}

/// Why a directive failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reason {
    AlreadyInDeck,
    CutNotInDeck { cut: String },
    OverCopyLimit { in_deck: u32, requested: u32, limit: u32 },
    UnknownCard,
    OffColor { card: ColorSet, allowed: ColorSet },
    StrictDowngrade { cut: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Hard,
    Soft,
}

impl Reason {
    /// Stable identifier for telemetry.
    pub fn code(&self) -> &'static str {
        match self {
            Reason::AlreadyInDeck => "already_in_deck",
            Reason::CutNotInDeck { .. } => "cut_not_in_deck",
            Reason::OverCopyLimit { .. } => "over_copy_limit",
            Reason::UnknownCard => "unknown_card",
            Reason::OffColor { .. } => "off_color",
            Reason::StrictDowngrade { .. } => "strict_downgrade",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Reason::StrictDowngrade { .. } => Severity::Soft,
            Reason::AlreadyInDeck
            | Reason::CutNotInDeck { .. }
            | Reason::OverCopyLimit { .. }
            | Reason::UnknownCard
            | Reason::OffColor { .. } => Severity::Hard,
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::AlreadyInDeck => f.write_str("already in the deck"),
            Reason::CutNotInDeck { cut } => write!(f, "cut target {cut} is not in the deck"),
            Reason::OverCopyLimit {
                in_deck,
                requested,
                limit,
            } => write!(
                f,
                "{in_deck} in deck + {requested} requested exceeds {limit} copies"
            ),
            Reason::UnknownCard => f.write_str("not a known card"),
            Reason::OffColor { card, allowed } => {
                write!(f, "color identity {card} is outside {allowed}")
            }
            Reason::StrictDowngrade { cut } => write!(f, "strictly worse than {cut}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum Verdict {
    Valid,
    Invalid(Reason),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationVerdict {
    pub directive: Directive,
    pub verdict: Verdict,
}

impl ValidationVerdict {
    pub fn is_valid(&self) -> bool {
        matches!(self.verdict, Verdict::Valid)
    }

    pub fn reason(&self) -> Option<&Reason> {
        match &self.verdict {
            Verdict::Valid => None,
            Verdict::Invalid(reason) => Some(reason),
        }
    }
}

/// Which rules a validation run evaluates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RulePass {
    /// Rules 1-5.
    Hard,
    /// Rule 6 only.
    Downgrade,
    All,
}

impl RulePass {
    fn hard(self) -> bool {
        matches!(self, RulePass::Hard | RulePass::All)
    }

    fn downgrade(self) -> bool {
        matches!(self, RulePass::Downgrade | RulePass::All)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DowngradePair {
    pub add: String,
    pub cut: String,
}

const BUILTIN_DOWNGRADES: [(&str, &str); 11] = [
    ("Murder", "Putrefy"),
    ("Doom Blade", "Go for the Throat"),
    ("Terror", "Putrefy"),
    ("Cancel", "Counterspell"),
    ("Cancel", "Arcane Denial"),
    ("Divination", "Expressive Iteration"),
    ("Divination", "Memory Deluge"),
    ("Divination", "Night's Whisper"),
    ("Shock", "Lightning Bolt"),
    ("Naturalize", "Nature's Claim"),
    ("Naturalize", "Return to Nature"),
];

/// Known (add, cut) pairs where the addition is strictly worse than the cut.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "Vec<DowngradePair>")]
pub struct DowngradeTable {
    pairs: HashSet<(String, String)>,
}

impl DowngradeTable {
    pub fn empty() -> Self {
        Self {
            pairs: HashSet::new(),
        }
    }

    pub fn builtin() -> Self {
        let mut table = Self::empty();
        for (add, cut) in BUILTIN_DOWNGRADES {
            table.insert(add, cut);
        }
        table
    }

    pub fn insert(&mut self, add: &str, cut: &str) {
        self.pairs.insert((normalize_name(add), normalize_name(cut)));
    }

    pub fn is_downgrade(&self, add: &str, cut: &str) -> bool {
        self.pairs
            .contains(&(normalize_name(add), normalize_name(cut)))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl Default for DowngradeTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl From<Vec<DowngradePair>> for DowngradeTable {
    fn from(pairs: Vec<DowngradePair>) -> Self {
        let mut table = Self::empty();
        for pair in pairs {
            table.insert(&pair.add, &pair.cut);
        }
        table
    }
}

const BUILTIN_COMMANDER_COLORS: [(&str, &str); 9] = [
    ("Muldrotha, the Gravetide", "UBG"),
    ("Meren of Clan Nel Toth", "BG"),
    ("Karador, Ghost Chieftain", "WBG"),
    ("Sidisi, Brood Tyrant", "UBG"),
    ("Chainer, Dementia Master", "B"),
    ("Tasigur, the Golden Fang", "UBG"),
    ("The Mimeoplasm", "UBG"),
    ("The Scarab God", "UB"),
    ("Jarad, Golgari Lich Lord", "BG"),
];

/// Fallback color identities for commanders, used when the caller supplies a
/// commander name but no explicit identity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "HashMap<String, ColorSet>")]
pub struct CommanderColorTable {
    colors: HashMap<String, ColorSet>,
}

impl CommanderColorTable {
    pub fn empty() -> Self {
        Self {
            colors: HashMap::new(),
        }
    }

    pub fn builtin() -> Self {
        let mut table = Self::empty();
        for (name, symbols) in BUILTIN_COMMANDER_COLORS {
            if let Ok(colors) = ColorSet::from_symbols(symbols) {
                table.insert(name, colors);
            }
        }
        table
    }

    pub fn insert(&mut self, commander: &str, colors: ColorSet) {
        self.colors.insert(normalize_name(commander), colors);
    }

    pub fn get(&self, commander: &str) -> Option<ColorSet> {
        self.colors.get(&normalize_name(commander)).copied()
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

impl Default for CommanderColorTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl From<HashMap<String, ColorSet>> for CommanderColorTable {
    fn from(colors: HashMap<String, ColorSet>) -> Self {
        let mut table = Self::empty();
        for (name, set) in colors {
            table.insert(&name, set);
        }
        table
    }
}

/// Canonical keys of the deck, computed once per validation call.
struct DeckIndex {
    /// Deck cards only.
    deck: HashSet<String>,
    /// Deck cards plus the commander in singleton formats.
    present: HashSet<String>,
    copies: HashMap<String, u32>,
}

impl DeckIndex {
    fn build(canonicalizer: &Canonicalizer, context: &DeckContext) -> Self {
        let mut deck = HashSet::new();
        let mut copies: HashMap<String, u32> = HashMap::new();
        for card in &context.cards {
            let key = canonicalizer.canonical_key(&card.name);
            if key.is_empty() {
                continue;
            }
            let count = copies.entry(key.clone()).or_default();
            *count = count.saturating_add(card.copies());
            deck.insert(key);
        }

        let mut present = deck.clone();
        if context.format.is_singleton()
            && let Some(commander) = &context.commander
        {
            let key = canonicalizer.canonical_key(commander);
            if !key.is_empty() {
                present.insert(key);
            }
        }

        Self {
            deck,
            present,
            copies,
        }
    }
}

/// Evaluates directives against a deck.
#[derive(Debug, Clone)]
pub struct Validator {
    canonicalizer: Arc<Canonicalizer>,
    resolver: MetadataResolver,
    rules: RuleConfig,
    downgrades: DowngradeTable,
    commander_colors: CommanderColorTable,
}

impl Validator {
    pub fn new(
        canonicalizer: Arc<Canonicalizer>,
        resolver: MetadataResolver,
        config: &GuardConfig,
    ) -> Self {
        Self {
            canonicalizer,
            resolver,
            rules: config.rules.clone(),
            downgrades: config.downgrades.clone(),
            commander_colors: config.commander_colors.clone(),
        }
    }

    /// Builds a validator with a fresh canonicalizer over `config.canon`.
    pub fn from_config(config: &GuardConfig, cache: Arc<dyn CardCache>) -> Self {
        Self::new(
            Arc::new(Canonicalizer::new(config.canon.clone())),
            MetadataResolver::new(cache, &config.resolver),
            config,
        )
    }

    pub fn canonicalizer(&self) -> &Arc<Canonicalizer> {
        &self.canonicalizer
    }

    /// Color identity the deck is restricted to; empty means unconstrained.
    pub fn allowed_colors(&self, context: &DeckContext) -> ColorSet {
        if let Some(explicit) = context.color_identity.filter(|colors| !colors.is_empty()) {
            return explicit;
        }
        context
            .commander
            .as_deref()
            .and_then(|commander| self.commander_colors.get(commander))
            .unwrap_or_default()
    }

    /// Runs every rule.
    pub fn validate(&self, directives: &[Directive], context: &DeckContext) -> Vec<ValidationVerdict> {
        self.validate_pass(directives, context, RulePass::All)
    }

    pub fn validate_pass(
        &self,
        directives: &[Directive],
        context: &DeckContext,
        pass: RulePass,
    ) -> Vec<ValidationVerdict> {
        if directives.is_empty() {
            return Vec::new();
        }

        let index = DeckIndex::build(&self.canonicalizer, context);
        let canonical_names: Vec<String> = directives
            .iter()
            .map(|directive| self.canonicalizer.canonicalize(&directive.name).name)
            .collect();

        let early: Vec<Option<Reason>> = directives
            .iter()
            .zip(&canonical_names)
            .map(|(directive, canonical)| {
                if pass.hard() {
                    self.check_without_metadata(directive, canonical, &index, context)
                } else {
                    None
                }
            })
            .collect();

        let allowed = self.allowed_colors(context);
        let needs_metadata = pass.hard()
            && ((context.format.is_singleton() && !allowed.is_empty())
                || self.rules.reject_unknown_cards);
        let resolved = if needs_metadata {
            let pending: Vec<&str> = canonical_names
                .iter()
                .zip(&early)
                .filter(|(_, reason)| reason.is_none())
                .map(|(name, _)| name.as_str())
                .collect();
            self.resolver.resolve_many(&pending)
        } else {
            ResolvedCards::new()
        };

        let verdicts: Vec<ValidationVerdict> = directives
            .iter()
            .zip(canonical_names.iter().zip(early))
            .map(|(directive, (canonical, early))| {
                let reason = early
                    .or_else(|| {
                        needs_metadata
                            .then(|| self.check_metadata(canonical, &resolved, allowed, context))
                            .flatten()
                    })
                    .or_else(|| {
                        pass.downgrade()
                            .then(|| self.check_downgrade(directive, canonical))
                            .flatten()
                    });
                ValidationVerdict {
                    directive: directive.clone(),
                    verdict: match reason {
                        Some(reason) => Verdict::Invalid(reason),
                        None => Verdict::Valid,
                    },
                }
            })
            .collect();

        tracing::debug!(
            directives = directives.len(),
            invalid = verdicts.iter().filter(|v| !v.is_valid()).count(),
            ?pass,
            "validated directives"
        );
        verdicts
    }

    fn check_without_metadata(
        &self,
        directive: &Directive,
        canonical: &str,
        index: &DeckIndex,
        context: &DeckContext,
    ) -> Option<Reason> {
        let key = normalize_name(canonical);
        // An explicit `ADD +n` in a constructed deck asks for more copies;
        // the copy limit decides those.
        let adds_copies = context.format == Format::Constructed && directive.copies.is_some();
        if !adds_copies && index.present.contains(&key) {
            return Some(Reason::AlreadyInDeck);
        }

        if self.rules.check_cut_in_deck
            && let Some(cut) = &directive.cut
            && !index.deck.contains(&self.canonicalizer.canonical_key(cut))
        {
            return Some(Reason::CutNotInDeck { cut: cut.clone() });
        }

        if let (Format::Constructed, Some(limit), Some(requested)) =
            (context.format, self.rules.max_copies, directive.copies)
        {
            let in_deck = index.copies.get(&key).copied().unwrap_or(0);
            if in_deck.saturating_add(requested) > limit {
                return Some(Reason::OverCopyLimit {
                    in_deck,
                    requested,
                    limit,
                });
            }
        }

        None
    }

    fn check_metadata(
        &self,
        canonical: &str,
        resolved: &ResolvedCards,
        allowed: ColorSet,
        context: &DeckContext,
    ) -> Option<Reason> {
        let Some(record) = resolved.lookup(canonical) else {
            return self.rules.reject_unknown_cards.then_some(Reason::UnknownCard);
        };

        if !context.format.is_singleton() || allowed.is_empty() {
            return None;
        }
        let card = record.colored_identity()?;
        (!card.is_subset_of(allowed)).then_some(Reason::OffColor { card, allowed })
    }

    fn check_downgrade(&self, directive: &Directive, canonical: &str) -> Option<Reason> {
        let cut = directive.cut.as_ref()?;
        let cut_canonical = self.canonicalizer.canonicalize(cut).name;
        self.downgrades
            .is_downgrade(canonical, &cut_canonical)
            .then(|| Reason::StrictDowngrade { cut: cut.clone() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardRecord;
    use crate::config::ResolverConfig;
    use crate::directive::parse_directives;
    use crate::metadata::InMemoryCardCache;

    fn validator_with(rules: RuleConfig) -> Validator {
        let cache: InMemoryCardCache = [
            CardRecord::new("Lightning Bolt").color_identity(ColorSet::RED),
            CardRecord::new("Counterspell").color_identity(ColorSet::BLUE),
            CardRecord::new("Sol Ring").color_identity(ColorSet::COLORLESS),
            CardRecord::new("Murder").color_identity(ColorSet::BLACK),
            CardRecord::new("Opt").color_identity(ColorSet::BLUE),
        ]
        .into_iter()
        .collect();
        let config = GuardConfig {
            rules,
            ..GuardConfig::default()
        };
        Validator::new(
            Arc::new(Canonicalizer::from_tables([("bolt", "lightning bolt")], Vec::new())),
            MetadataResolver::new(Arc::new(cache), &ResolverConfig::default()),
            &config,
        )
    }

    fn validator() -> Validator {
        validator_with(RuleConfig::default())
    }

    fn reasons(verdicts: &[ValidationVerdict]) -> Vec<Option<&'static str>> {
        verdicts.iter().map(|v| v.reason().map(Reason::code)).collect()
    }

    #[test]
    fn test_already_in_deck_ignores_case_and_accents() {
        let context = DeckContext::commander_deck().cards(["Sol Ring", "Séance"]);
        let directives = parse_directives(
            "ADD [[SOL  RING]]\nADD [[seance]]\nADD [[Counterspell]]",
            Format::Commander,
        );
        let verdicts = validator().validate(&directives, &context);
        assert_eq!(
            reasons(&verdicts),
            vec![Some("already_in_deck"), Some("already_in_deck"), None]
        );
    }

    #[test]
    fn test_commander_counts_as_present() {
        let context = DeckContext::commander_deck().commander("The Scarab God");
        let directives = parse_directives("ADD [[The Scarab God]]", Format::Commander);
        assert_eq!(
            reasons(&validator().validate(&directives, &context)),
            vec![Some("already_in_deck")]
        );
    }

    #[test]
    fn test_alias_matches_deck_card() {
        let context = DeckContext::commander_deck().card("Lightning Bolt");
        let directives = parse_directives("ADD [[Bolt]]", Format::Commander);
        assert_eq!(
            reasons(&validator().validate(&directives, &context)),
            vec![Some("already_in_deck")]
        );
    }

    #[test]
    fn test_off_color_with_explicit_identity() {
        let context = DeckContext::commander_deck()
            .color_identity(ColorSet::from_symbols("UBG").unwrap());
        let directives = parse_directives(
            "ADD [[Lightning Bolt]]\nADD [[Counterspell]]\nADD [[Sol Ring]]",
            Format::Commander,
        );
        let verdicts = validator().validate(&directives, &context);
        assert_eq!(reasons(&verdicts), vec![Some("off_color"), None, None]);
        assert_eq!(
            verdicts[0].reason(),
            Some(&Reason::OffColor {
                card: ColorSet::RED,
                allowed: ColorSet::from_symbols("UBG").unwrap(),
            })
        );
    }

    #[test]
    fn test_off_color_from_commander_table() {
        let context = DeckContext::commander_deck().commander("The Scarab God");
        let directives = parse_directives("ADD [[Lightning Bolt]]", Format::Commander);
        assert_eq!(
            reasons(&validator().validate(&directives, &context)),
            vec![Some("off_color")]
        );
    }

    #[test]
    fn test_unknown_card_fails_open() {
        let context = DeckContext::commander_deck().color_identity(ColorSet::BLUE);
        let directives = parse_directives("ADD [[Totally Invented Card]]", Format::Commander);
        assert_eq!(reasons(&validator().validate(&directives, &context)), vec![None]);

        let strict = validator_with(RuleConfig {
            reject_unknown_cards: true,
            ..RuleConfig::default()
        });
        assert_eq!(
            reasons(&strict.validate(&directives, &context)),
            vec![Some("unknown_card")]
        );
    }

    #[test]
    fn test_no_color_constraint_outside_commander() {
        let context = DeckContext::new(Format::Constructed).color_identity(ColorSet::BLUE);
        let directives = parse_directives("ADD +4 [[Lightning Bolt]]", Format::Constructed);
        assert_eq!(reasons(&validator().validate(&directives, &context)), vec![None]);
    }

    #[test]
    fn test_strict_downgrade_pair() {
        let context = DeckContext::commander_deck().card("Putrefy");
        let directives = parse_directives(
            "ADD [[Murder]]\nSame job, cheaper.\nCUT [[Putrefy]]\nADD [[Murder]]\nCUT [[Sol Ring]]",
            Format::Commander,
        );
        let verdicts = validator().validate(&directives, &context);
        assert_eq!(reasons(&verdicts), vec![Some("strict_downgrade"), None]);

        let hard_only = validator().validate_pass(&directives, &context, RulePass::Hard);
        assert!(hard_only.iter().all(ValidationVerdict::is_valid));
    }

    #[test]
    fn test_cut_not_in_deck_opt_in() {
        let context = DeckContext::commander_deck().card("Mind Stone");
        let directives = parse_directives(
            "ADD [[Sol Ring]] / CUT [[Mind Stone]]\nADD [[Counterspell]] / CUT [[Negate]]",
            Format::Commander,
        );
        assert_eq!(
            reasons(&validator().validate(&directives, &context)),
            vec![None, None]
        );

        let strict = validator_with(RuleConfig {
            check_cut_in_deck: true,
            ..RuleConfig::default()
        });
        assert_eq!(
            reasons(&strict.validate(&directives, &context)),
            vec![None, Some("cut_not_in_deck")]
        );
    }

    #[test]
    fn test_over_copy_limit_opt_in() {
        let context = DeckContext::new(Format::Constructed).card_copies("Opt", 3);
        let directives =
            parse_directives("ADD +2 [[Opt]]\nADD +4 [[Counterspell]]", Format::Constructed);
        let strict = validator_with(RuleConfig {
            max_copies: Some(4),
            ..RuleConfig::default()
        });
        let verdicts = strict.validate(&directives, &context);
        assert_eq!(reasons(&verdicts), vec![Some("over_copy_limit"), None]);
        assert_eq!(
            verdicts[0].reason(),
            Some(&Reason::OverCopyLimit {
                in_deck: 3,
                requested: 2,
                limit: 4,
            })
        );
    }

    #[test]
    fn test_copy_limit_counts_existing_copies() {
        let context = DeckContext::new(Format::Constructed).card_copies("Opt", 2);
        let strict = validator_with(RuleConfig {
            max_copies: Some(4),
            ..RuleConfig::default()
        });

        let within = parse_directives("ADD +1 [[Opt]]", Format::Constructed);
        assert_eq!(reasons(&strict.validate(&within, &context)), vec![None]);

        let over = parse_directives("ADD +3 [[Opt]]", Format::Constructed);
        assert_eq!(
            strict.validate(&over, &context)[0].reason(),
            Some(&Reason::OverCopyLimit {
                in_deck: 2,
                requested: 3,
                limit: 4,
            })
        );
    }

    #[test]
    fn test_copy_limit_saturates_huge_counts() {
        let context = DeckContext::new(Format::Constructed)
            .card_copies("Opt", 3)
            .card_copies("Counterspell", u32::MAX)
            .card_copies("Counterspell", 1);
        let strict = validator_with(RuleConfig {
            max_copies: Some(4),
            ..RuleConfig::default()
        });
        let directives = parse_directives(
            "ADD +4294967295 [[Opt]]\nADD +1 [[Counterspell]]",
            Format::Constructed,
        );
        let verdicts = strict.validate(&directives, &context);
        assert_eq!(
            verdicts[0].reason(),
            Some(&Reason::OverCopyLimit {
                in_deck: 3,
                requested: u32::MAX,
                limit: 4,
            })
        );
        assert_eq!(
            verdicts[1].reason(),
            Some(&Reason::OverCopyLimit {
                in_deck: u32::MAX,
                requested: 1,
                limit: 4,
            })
        );
    }

    #[test]
    fn test_constructed_extra_copies_pass_without_limit() {
        let context = DeckContext::new(Format::Constructed).card_copies("Opt", 2);
        let directives = parse_directives("ADD +2 [[Opt]]", Format::Constructed);
        assert_eq!(reasons(&validator().validate(&directives, &context)), vec![None]);
    }

    #[test]
    fn test_validation_does_not_touch_context() {
        let context = DeckContext::commander_deck()
            .cards(["Sol Ring"])
            .commander("The Scarab God");
        let snapshot = context.clone();
        let directives = parse_directives("ADD [[Sol Ring]]\nADD [[Opt]]", Format::Commander);
        validator().validate(&directives, &context);
        assert_eq!(context, snapshot);
    }

    #[test]
    fn test_deck_context_from_json() {
        let context: DeckContext = serde_json::from_str(
            r#"{"cards":[{"name":"Sol Ring"},{"name":"Opt","count":3}],"color_identity":["U","B"],"format":"edh"}"#,
        )
        .unwrap();
        assert_eq!(context.format, Format::Commander);
        assert_eq!(context.cards[1].copies(), 3);
        assert_eq!(context.color_identity, Some(ColorSet::BLUE.union(ColorSet::BLACK)));
    }
}
