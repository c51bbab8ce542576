//! Card name normalization.
//!
//! Every comparison between card names in this crate (deck membership, alias
//! lookup, metadata lookup, the downgrade and commander tables) goes through
//! [`normalize_name`].

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Normalizes a card name to its equality key.
///
/// Lower-cases, decomposes accented characters and drops the combining marks,
/// trims, and collapses runs of internal whitespace to a single space.
/// Punctuation is kept, so `"L. Bolt"` and `"L Bolt"` are different keys.
pub fn normalize_name(raw: &str) -> String {
    let decomposed: String = raw
        .nfkd()
        .filter(|ch| !is_combining_mark(*ch))
        .flat_map(char::to_lowercase)
        .collect();

    let mut out = String::with_capacity(decomposed.len());
    for word in decomposed.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

/// Returns true if both names normalize to the same key.
pub fn same_card(a: &str, b: &str) -> bool {
    normalize_name(a) == normalize_name(b)
}
