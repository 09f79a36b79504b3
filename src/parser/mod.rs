//! Input parsing module for extracting patent identifier tokens.
//!
//! This module turns free-form text (pasted claims charts, emails, citation
//! lists) into normalized identifier tokens, and expands each token into the
//! candidate slugs used to address documents on the lookup site.
//!
//! # Example
//!
//! ```
//! use patent_bundler::parser::extract_tokens;
//!
//! let tokens = extract_tokens("10,859,001 and 11162431B2");
//! assert_eq!(tokens, vec!["10859001", "11162431B2"]);
//! ```

mod input;
pub mod slug;

pub use input::TokenBatch;
pub use slug::{DEFAULT_JURISDICTION, KNOWN_JURISDICTIONS, slug_candidates};

use std::collections::HashSet;

use tracing::debug;

/// Minimum length of a piece to be kept as a token.
pub const MIN_TOKEN_LEN: usize = 5;

/// Default cap on tokens processed per request.
pub const DEFAULT_MAX_TOKENS: usize = 50;

/// Extracts unique, uppercase identifier tokens from raw text.
///
/// Line endings are normalized, commas, hyphens, slashes and whitespace act
/// as separators, and pieces shorter than [`MIN_TOKEN_LEN`] or without a
/// digit are dropped. Digit-group commas (`10,859,001`) are joined first so
/// that grouped numbers survive as one token.
///
/// Empty or separator-only input yields an empty vector.
#[tracing::instrument(skip(text), fields(input_len = text.len()))]
#[must_use]
pub fn extract_tokens(text: &str) -> Vec<String> {
    if text.trim().is_empty() {
        debug!("Empty input provided");
        return Vec::new();
    }

    let normalized = join_digit_groups(&text.replace("\r\n", "\n").replace('\r', "\n"));
    let upper = normalized.to_uppercase();

    let mut seen: HashSet<&str> = HashSet::new();
    let mut tokens = Vec::new();
    for piece in upper.split(|c: char| !c.is_ascii_alphanumeric()) {
        if piece.len() < MIN_TOKEN_LEN || !piece.bytes().any(|b| b.is_ascii_digit()) {
            continue;
        }
        if seen.insert(piece) {
            tokens.push(piece.to_string());
        }
    }

    debug!(tokens = tokens.len(), "Extraction complete");
    tokens
}

/// Extracts tokens and caps them at `max_tokens`, recording truncation.
#[must_use]
pub fn extract_token_batch(text: &str, max_tokens: usize) -> TokenBatch {
    TokenBatch::capped(extract_tokens(text), max_tokens)
}

/// Removes commas used as thousands separators inside a number.
///
/// A comma is dropped when a digit precedes it and exactly three digits
/// follow it before the next non-digit.
fn join_digit_groups(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());

    for (index, &c) in chars.iter().enumerate() {
        if c == ',' && is_digit_group_comma(&chars, index) {
            continue;
        }
        out.push(c);
    }
    out
}

fn is_digit_group_comma(chars: &[char], index: usize) -> bool {
    let preceded_by_digit = index > 0 && chars[index - 1].is_ascii_digit();
    let group = chars.get(index + 1..index + 4);
    let group_is_digits = group.is_some_and(|g| g.iter().all(char::is_ascii_digit));
    let boundary_after = chars.get(index + 4).is_none_or(|c| !c.is_ascii_digit());
    preceded_by_digit && group_is_digits && boundary_after
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_grouped_number_and_kind_suffix() {
        let tokens = extract_tokens("10,859,001 and 11162431B2");
        assert_eq!(tokens, vec!["10859001", "11162431B2"]);
    }

    #[test]
    fn test_extract_empty_input() {
        assert!(extract_tokens("").is_empty());
        assert!(extract_tokens("   \n\t  ").is_empty());
    }

    #[test]
    fn test_extract_separator_only_input() {
        assert!(extract_tokens(",,, --- /// \r\n").is_empty());
    }

    #[test]
    fn test_extract_uppercases_tokens() {
        assert_eq!(extract_tokens("us11162431b2"), vec!["US11162431B2"]);
    }

    #[test]
    fn test_extract_drops_short_and_digitless_pieces() {
        let tokens = extract_tokens("US 1234 patent ABCDEFG 98765");
        assert_eq!(tokens, vec!["98765"]);
    }

    #[test]
    fn test_extract_deduplicates_preserving_first_seen_order() {
        let tokens = extract_tokens("22222\n11111\r\n22222, 33333 11111");
        assert_eq!(tokens, vec!["22222", "11111", "33333"]);
    }

    #[test]
    fn test_extract_hyphen_and_slash_are_separators() {
        let tokens = extract_tokens("EP-1234567-B1/WO2020123456A1");
        assert_eq!(tokens, vec!["1234567", "WO2020123456A1"]);
    }

    #[test]
    fn test_extract_list_commas_still_separate() {
        let tokens = extract_tokens("12345678,87654321");
        assert_eq!(tokens, vec!["12345678", "87654321"]);
    }

    #[test]
    fn test_extract_is_idempotent() {
        let text = "US10,859,001B2; 9876543 and us9876543, EP1234567A1";
        assert_eq!(extract_tokens(text), extract_tokens(text));
    }

    #[test]
    fn test_join_digit_groups_only_touches_thousands_commas() {
        assert_eq!(join_digit_groups("1,234,567"), "1234567");
        assert_eq!(join_digit_groups("12,3456"), "12,3456");
        assert_eq!(join_digit_groups("a,123"), "a,123");
        assert_eq!(join_digit_groups("12, 345"), "12, 345");
    }

    #[test]
    fn test_extract_token_batch_flags_truncation() {
        let batch = extract_token_batch("11111 22222 33333 44444", 3);
        assert_eq!(batch.tokens, vec!["11111", "22222", "33333"]);
        assert_eq!(batch.total, 4);
        assert!(batch.truncated());
    }
}
