//! Types representing extracted identifier tokens.

use std::fmt;

/// Tokens extracted from one block of input text, capped at a request limit.
///
/// `tokens` holds at most the configured maximum, in first-seen order.
/// `total` counts every unique token found before the cap was applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenBatch {
    /// Tokens accepted for processing.
    pub tokens: Vec<String>,
    /// Number of unique tokens found in the input.
    pub total: usize,
}

impl TokenBatch {
    /// Caps `tokens` at `max_tokens`, remembering how many were found.
    #[must_use]
    pub fn capped(mut tokens: Vec<String>, max_tokens: usize) -> Self {
        let total = tokens.len();
        tokens.truncate(max_tokens);
        Self { tokens, total }
    }

    /// Returns true when the input held more tokens than were accepted.
    #[must_use]
    pub fn truncated(&self) -> bool {
        self.total > self.tokens.len()
    }

    /// Returns the number of accepted tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns true if no tokens were accepted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl fmt::Display for TokenBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.truncated() {
            write!(f, "{} of {} tokens", self.tokens.len(), self.total)
        } else {
            write!(f, "{} tokens", self.tokens.len())
        }
    }
}
