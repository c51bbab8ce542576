//! Directive extraction from generated advice text.
//!
//! A directive is a bracketed card marker introduced by a keyword:
//!
//! ```text
//! ADD [[Card Name]]          singleton (commander) format
//! ADD +2 [[Card Name]]       constructed formats carry a copy count
//! CUT [[Card Name]]          either format; pairs with the ADD of its block
//! ```
//!
//! Keywords are case-insensitive and may sit anywhere in a line, but must not
//! be glued to a preceding letter or digit. A marker with unbalanced brackets
//! or an empty name is ordinary prose.
//!
//! Every ADD line opens a block that runs until the next ADD line or the end
//! of the text. Blocks are the unit of removal during repair.

use std::collections::HashSet;
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::name::normalize_name;

/// Deck format, which selects the ADD grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Format {
    /// Singleton format with a commander and color identity.
    #[default]
    Commander,
    /// Any multi-copy format (modern, pioneer, standard, ...).
    Constructed,
}

impl Format {
    /// Maps a format key. `commander` and `edh` are singleton; anything else
    /// is treated as a multi-copy constructed format.
    pub fn from_key(key: &str) -> Self {
        match key.trim().to_ascii_lowercase().as_str() {
            "commander" | "edh" => Format::Commander,
            _ => Format::Constructed,
        }
    }

    pub fn is_singleton(self) -> bool {
        matches!(self, Format::Commander)
    }
}

impl FromStr for Format {
    type Err = std::convert::Infallible;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_key(key))
    }
}

impl From<String> for Format {
    fn from(key: String) -> Self {
        Self::from_key(&key)
    }
}

impl From<Format> for String {
    fn from(format: Format) -> Self {
        format.to_string()
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Commander => f.write_str("commander"),
            Format::Constructed => f.write_str("constructed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectiveKind {
    Add,
    Cut,
}

impl DirectiveKind {
    fn keyword(self) -> &'static str {
        match self {
            DirectiveKind::Add => "ADD",
            DirectiveKind::Cut => "CUT",
        }
    }
}

/// One marker found in a single line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub kind: DirectiveKind,
    pub name: String,
    /// `ADD +n` count, constructed formats only.
    pub copies: Option<u32>,
}

/// Half-open line range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Block {
    pub start: usize,
    pub end: usize,
}

impl Block {
    pub fn range(self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(self) -> bool {
        self.end <= self.start
    }

    pub fn contains(self, line: usize) -> bool {
        self.range().contains(&line)
    }
}

/// An ADD directive and the block it opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Directive {
    /// Card name as written inside the brackets, trimmed.
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copies: Option<u32>,
    /// Last CUT marker inside the block, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cut: Option<String>,
    pub block: Block,
}

impl Directive {
    pub fn key(&self) -> String {
        normalize_name(&self.name)
    }

    pub fn cut_key(&self) -> Option<String> {
        self.cut.as_deref().map(normalize_name)
    }
}

/// Byte offset of the next `keyword` at or after `from`, matched
/// case-insensitively and not preceded by an alphanumeric character.
fn find_keyword(line: &str, keyword: &str, from: usize) -> Option<usize> {
    let bytes = line.as_bytes();
    let needle = keyword.as_bytes();
    if needle.is_empty() || bytes.len() < needle.len() {
        return None;
    }
    (from..=bytes.len() - needle.len()).find(|&idx| {
        bytes[idx..idx + needle.len()].eq_ignore_ascii_case(needle)
            && line[..idx]
                .chars()
                .next_back()
                .is_none_or(|prev| !prev.is_alphanumeric())
    })
}

/// Parses `[[name]]` at the start of `rest`, returning the trimmed name and
/// the number of bytes consumed.
fn parse_bracket_name(rest: &str) -> Option<(String, usize)> {
    let inner = rest.strip_prefix("[[")?;
    let close = inner.find(']')?;
    if !inner[close..].starts_with("]]") {
        return None;
    }
    let raw = &inner[..close];
    if raw.contains('[') {
        return None;
    }
    let name = raw.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), 2 + close + 2))
}

/// Parses the marker whose keyword ends at byte `after_keyword`, returning it
/// and the byte offset just past the closing brackets.
fn parse_marker(
    line: &str,
    after_keyword: usize,
    kind: DirectiveKind,
    format: Format,
) -> Option<(Marker, usize)> {
    let rest = &line[after_keyword..];
    let mut offset = rest.len() - rest.trim_start().len();

    let mut copies = None;
    if kind == DirectiveKind::Add && format == Format::Constructed {
        let tail = rest[offset..].strip_prefix('+')?;
        let digits = tail.len() - tail.trim_start_matches(|ch: char| ch.is_ascii_digit()).len();
        if digits == 0 {
            return None;
        }
        copies = Some(tail[..digits].parse::<u32>().ok()?);
        offset += 1 + digits;
        let after_digits = &rest[offset..];
        offset += after_digits.len() - after_digits.trim_start().len();
    }

    let (name, consumed) = parse_bracket_name(&rest[offset..])?;
    Some((Marker { kind, name, copies }, after_keyword + offset + consumed))
}

/// All markers in one line, in order of appearance.
pub fn scan_line(line: &str, format: Format) -> Vec<Marker> {
    let mut found: Vec<(usize, Marker)> = Vec::new();
    for kind in [DirectiveKind::Add, DirectiveKind::Cut] {
        let keyword = kind.keyword();
        let mut from = 0;
        while let Some(pos) = find_keyword(line, keyword, from) {
            let after_keyword = pos + keyword.len();
            match parse_marker(line, after_keyword, kind, format) {
                Some((marker, end)) => {
                    found.push((pos, marker));
                    from = end;
                }
                None => from = after_keyword,
            }
        }
    }
    found.sort_by_key(|(pos, _)| *pos);
    found.into_iter().map(|(_, marker)| marker).collect()
}

fn last_cut(markers: &[Marker]) -> Option<String> {
    markers
        .iter()
        .rev()
        .find(|marker| marker.kind == DirectiveKind::Cut)
        .map(|marker| marker.name.clone())
}

/// Splits `text` into ADD directives and their blocks.
///
/// Lines are separated by `\n`. The first ADD marker on a line opens a block;
/// later ADD markers on the same line are ignored for segmentation. CUT
/// markers never open blocks and are ignored before the first ADD.
pub fn parse_directives(text: &str, format: Format) -> Vec<Directive> {
    let mut directives: Vec<Directive> = Vec::new();

    for (idx, line) in text.split('\n').enumerate() {
        let markers = scan_line(line, format);
        let add = markers
            .iter()
            .position(|marker| marker.kind == DirectiveKind::Add);

        match add {
            Some(pos) => {
                let marker = &markers[pos];
                directives.push(Directive {
                    name: marker.name.clone(),
                    copies: marker.copies,
                    cut: last_cut(&markers[pos + 1..]),
                    block: Block {
                        start: idx,
                        end: idx + 1,
                    },
                });
            }
            None => {
                if let Some(current) = directives.last_mut() {
                    current.block.end = idx + 1;
                    if let Some(cut) = last_cut(&markers) {
                        current.cut = Some(cut);
                    }
                }
            }
        }
    }

    directives
}

fn dedupe_names(names: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .filter(|name| seen.insert(normalize_name(name)))
        .collect()
}

/// Every ADD target in the text, deduplicated by normalized name (first
/// spelling wins). Unlike [`parse_directives`] this includes every ADD marker
/// on a line, not just the first.
pub fn add_targets(text: &str, format: Format) -> Vec<String> {
    dedupe_names(
        text.split('\n')
            .flat_map(|line| scan_line(line, format))
            .filter(|marker| marker.kind == DirectiveKind::Add)
            .map(|marker| marker.name),
    )
}

/// Every CUT target in the text, deduplicated by normalized name.
pub fn cut_targets(text: &str) -> Vec<String> {
    dedupe_names(
        text.split('\n')
            .flat_map(|line| scan_line(line, Format::Commander))
            .filter(|marker| marker.kind == DirectiveKind::Cut)
            .map(|marker| marker.name),
    )
}

fn enforce_line(line: &str) -> Option<String> {
    for (pos, _) in line.match_indices("ADD") {
        if line[..pos]
            .chars()
            .next_back()
            .is_some_and(char::is_alphanumeric)
        {
            continue;
        }
        let after = &line[pos + 3..];
        if !after.starts_with(char::is_whitespace) {
            continue;
        }
        let Some(slash) = after.find('/') else {
            continue;
        };
        let add = after[..slash].trim();
        let Some(cut_part) = after[slash + 1..].trim_start().strip_prefix("CUT") else {
            continue;
        };
        if !cut_part.starts_with(char::is_whitespace) {
            continue;
        }
        let cut_with_tail = cut_part.trim_start();
        let cut = cut_with_tail.trim_end();
        let tail = &cut_with_tail[cut.len()..];

        let bracket_free = |name: &str| !name.is_empty() && !name.contains(['[', ']']);
        if !bracket_free(add) || !bracket_free(cut) {
            continue;
        }
        return Some(format!(
            "{}ADD [[{add}]] / CUT [[{cut}]]{tail}",
            &line[..pos]
        ));
    }
    None
}

/// Wraps bare one-line `ADD X / CUT Y` pairs in brackets so the parser sees
/// them. Lines that already use brackets, or do not match, are untouched.
pub fn enforce_brackets(text: &str) -> String {
    text.split('\n')
        .map(|line| match enforce_line(line) {
            Some(rewritten) => rewritten,
            None => line.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(directives: &[Directive]) -> Vec<&str> {
        directives.iter().map(|d| d.name.as_str()).collect()
    }

    #[test]
    fn test_format_from_key() {
        assert_eq!(Format::from_key("Commander"), Format::Commander);
        assert_eq!(Format::from_key("edh"), Format::Commander);
        assert_eq!(Format::from_key("modern"), Format::Constructed);
        assert_eq!(Format::from_key("sixty-card"), Format::Constructed);
    }

    #[test]
    fn test_scan_commander_add_with_prose() {
        let markers = scan_line("1. Consider: add [[ Sol Ring ]] for ramp", Format::Commander);
        assert_eq!(
            markers,
            vec![Marker {
                kind: DirectiveKind::Add,
                name: "Sol Ring".to_string(),
                copies: None,
            }]
        );
    }

    #[test]
    fn test_scan_constructed_requires_count() {
        assert!(scan_line("ADD [[Opt]]", Format::Constructed).is_empty());
        let markers = scan_line("- ADD +2 [[Opt]]", Format::Constructed);
        assert_eq!(markers[0].copies, Some(2));
        assert_eq!(markers[0].name, "Opt");
        assert!(scan_line("ADD +2 [[Opt]]", Format::Commander).is_empty());
    }

    #[test]
    fn test_scan_rejects_malformed_brackets() {
        for line in [
            "ADD [[Sol Ring]",
            "ADD [Sol Ring]]",
            "ADD [[   ]]",
            "ADD [[Sol [[Ring]]",
            "PADD [[Sol Ring]]",
            "ADD Sol Ring",
        ] {
            assert!(
                scan_line(line, Format::Commander).is_empty(),
                "should not match: {line}"
            );
        }
    }

    #[test]
    fn test_scan_continues_after_failed_keyword() {
        let markers = scan_line("Add some ramp: ADD [[Arcane Signet]]", Format::Commander);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].name, "Arcane Signet");
    }

    #[test]
    fn test_scan_add_and_cut_on_one_line() {
        let markers = scan_line("ADD [[Murder]] / CUT [[Putrefy]]", Format::Commander);
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].kind, DirectiveKind::Add);
        assert_eq!(markers[1].kind, DirectiveKind::Cut);
        assert_eq!(markers[1].name, "Putrefy");
    }

    #[test]
    fn test_blocks_extend_to_next_add() {
        let text = "Intro line\nADD [[Sol Ring]]\nwhy: ramp\nCUT [[Mind Stone]]\n\nADD [[Arcane Signet]]\nmore";
        let directives = parse_directives(text, Format::Commander);
        assert_eq!(names(&directives), vec!["Sol Ring", "Arcane Signet"]);
        assert_eq!(directives[0].block.range(), 1..5);
        assert_eq!(directives[0].cut.as_deref(), Some("Mind Stone"));
        assert_eq!(directives[1].block.range(), 5..7);
        assert_eq!(directives[1].cut, None);
    }

    #[test]
    fn test_blocks_partition_directive_region() {
        let text = "a\nb\nADD [[One]]\nc\nADD [[Two]]\nADD [[Three]]\nd\ne\n";
        let line_count = text.split('\n').count();
        let directives = parse_directives(text, Format::Commander);
        assert_eq!(directives.len(), 3);

        let mut covered = Vec::new();
        for directive in &directives {
            assert!(!directive.block.is_empty());
            covered.extend(directive.block.range());
        }
        let expected: Vec<usize> = (directives[0].block.start..line_count).collect();
        assert_eq!(covered, expected);
    }

    #[test]
    fn test_cut_before_first_add_is_ignored() {
        let directives = parse_directives("CUT [[Putrefy]]\nADD [[Murder]]", Format::Commander);
        assert_eq!(directives.len(), 1);
        assert_eq!(directives[0].block.range(), 1..2);
        assert_eq!(directives[0].cut, None);
    }

    #[test]
    fn test_repeated_directives_keep_separate_blocks() {
        let directives =
            parse_directives("ADD [[Sol Ring]]\nx\nADD [[sol ring]]", Format::Commander);
        assert_eq!(directives.len(), 2);
        assert_eq!(directives[0].key(), directives[1].key());
    }

    #[test]
    fn test_targets_dedupe_by_normalized_name() {
        let text = "ADD [[Sol Ring]] and ADD [[Mana Crypt]]\nADD [[SOL  RING]]\nCUT [[Putrefy]]\nCUT [[putrefy]]";
        assert_eq!(
            add_targets(text, Format::Commander),
            vec!["Sol Ring".to_string(), "Mana Crypt".to_string()]
        );
        assert_eq!(cut_targets(text), vec!["Putrefy".to_string()]);
    }

    #[test]
    fn test_no_markers_no_directives() {
        assert!(parse_directives("Just prose.\nNothing to see.", Format::Commander).is_empty());
        assert!(parse_directives("", Format::Constructed).is_empty());
    }

    #[test]
    fn test_enforce_brackets_rewrites_bare_pairs() {
        let text = "Upgrades:\n1. ADD Sol Ring / CUT Mind Stone  \nADD [[Opt]] / CUT [[Shock]]\nADDITIONAL notes / CUT here";
        assert_eq!(
            enforce_brackets(text),
            "Upgrades:\n1. ADD [[Sol Ring]] / CUT [[Mind Stone]]  \nADD [[Opt]] / CUT [[Shock]]\nADDITIONAL notes / CUT here"
        );
    }
}
