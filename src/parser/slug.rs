//! Candidate slug generation for patent identifier tokens.
//!
//! A slug is a jurisdiction-prefixed, optionally kind-code-suffixed identifier
//! (`US11162431B2`) addressing one document page on the lookup site. Each token
//! expands into an ordered list of slugs, most specific first.

use std::sync::LazyLock;

use regex::Regex;

/// Jurisdiction assumed when a token carries no recognized prefix.
pub const DEFAULT_JURISDICTION: &str = "US";

/// Jurisdiction prefixes preserved when present at the start of a token.
pub const KNOWN_JURISDICTIONS: [&str; 17] = [
    "US", "EP", "WO", "JP", "KR", "CN", "CA", "AU", "DE", "GB", "ES", "FR", "RU", "IN", "BR", "MX",
    "TW",
];

/// Kind codes tried for jurisdictions without their own table.
const DEFAULT_FALLBACK_KINDS: &[&str] = &["B2", "B1", "A1"];

/// Per-jurisdiction fallback kind codes, most likely first.
const KIND_FALLBACKS: &[(&str, &[&str])] = &[
    ("US", &["B2", "B1", "A1"]),
    ("EP", &["B1", "A1"]),
    ("WO", &["A1"]),
    ("JP", &["B2", "A"]),
    ("CN", &["B", "A"]),
    ("KR", &["B1", "A"]),
    ("CA", &["C", "A1"]),
    ("AU", &["B2", "A1"]),
];

static KIND_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[ABSEHP][0-9]$").unwrap_or_else(|e| panic!("invalid static regex: {e}"))
});

/// Returns the fallback kind codes for a jurisdiction, most likely first.
#[must_use]
pub fn fallback_kinds(jurisdiction: &str) -> &'static [&'static str] {
    KIND_FALLBACKS
        .iter()
        .find(|(code, _)| *code == jurisdiction)
        .map_or(DEFAULT_FALLBACK_KINDS, |&(_, kinds)| kinds)
}

/// Expands a token into ordered, de-duplicated candidate slugs.
///
/// Order: exact jurisdiction + number + detected kind (when a kind suffix was
/// found), then the bare jurisdiction + number, then the jurisdiction's
/// fallback kinds other than the detected one. The core is the digits left
/// after stripping prefix and kind, so `USRE49123E1` searches `US49123E1`.
/// If no digit remains, the cleaned token under its jurisdiction is the only
/// candidate.
///
/// The result is never empty for a non-empty token.
///
/// # Example
///
/// ```
/// use patent_bundler::parser::slug_candidates;
///
/// let slugs = slug_candidates("11162431B2");
/// assert_eq!(slugs, vec!["US11162431B2", "US11162431", "US11162431B1", "US11162431A1"]);
/// ```
#[must_use]
pub fn slug_candidates(token: &str) -> Vec<String> {
    let cleaned: String = token
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect();

    let (jurisdiction, rest) = KNOWN_JURISDICTIONS
        .iter()
        .find_map(|code| cleaned.strip_prefix(*code).map(|rest| (*code, rest)))
        .unwrap_or((DEFAULT_JURISDICTION, cleaned.as_str()));

    let (core, kind) = match KIND_SUFFIX_RE.find(rest) {
        Some(m) => (&rest[..m.start()], Some(m.as_str())),
        None => (rest, None),
    };

    let core: String = core.chars().filter(char::is_ascii_digit).collect();
    if core.is_empty() {
        let prefix = if cleaned.starts_with(jurisdiction) { "" } else { jurisdiction };
        return vec![format!("{prefix}{cleaned}")];
    }

    let mut slugs: Vec<String> = Vec::new();
    let mut push = |slug: String| {
        if !slugs.contains(&slug) {
            slugs.push(slug);
        }
    };

    if let Some(kind) = kind {
        push(format!("{jurisdiction}{core}{kind}"));
    }
    push(format!("{jurisdiction}{core}"));
    for fallback in fallback_kinds(jurisdiction) {
        if Some(*fallback) != kind {
            push(format!("{jurisdiction}{core}{fallback}"));
        }
    }

    slugs
}
