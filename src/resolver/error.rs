//! Error types for document resolution.
//!
//! Resolution failures are expected outcomes: callers log them and treat the
//! slug as "not found". The variants exist so logs say why.

use thiserror::Error;

/// Errors that can occur while resolving a slug to a document URL.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Network-level failure (DNS, connection refused, TLS, body read).
    #[error("network error looking up {slug} at {url}: {source}")]
    Network {
        /// Slug being resolved.
        slug: String,
        /// Lookup page URL.
        url: String,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// Lookup exceeded its deadline.
    #[error("timeout looking up {slug} at {url}")]
    Timeout {
        /// Slug being resolved.
        slug: String,
        /// Lookup page URL.
        url: String,
    },

    /// Lookup page answered with a non-success status.
    #[error("HTTP {status} looking up {slug} after {attempts} attempt(s)")]
    HttpStatus {
        /// Slug being resolved.
        slug: String,
        /// Final HTTP status code.
        status: u16,
        /// Attempts made, including the first.
        attempts: u32,
    },

    /// Lookup page loaded but no matcher found a document link.
    #[error("no document link found on page for {slug}")]
    NoLink {
        /// Slug being resolved.
        slug: String,
    },

    /// The lookup HTTP client could not be constructed.
    #[error("failed to build lookup HTTP client: {reason}")]
    ClientBuild {
        /// Builder failure description.
        reason: String,
    },
}

impl ResolveError {
    /// Creates a network or timeout error from a reqwest error.
    pub fn from_request(slug: &str, url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout {
                slug: slug.to_string(),
                url: url.to_string(),
            }
        } else {
            Self::Network {
                slug: slug.to_string(),
                url: url.to_string(),
                source,
            }
        }
    }

    /// Creates an HTTP status error.
    #[must_use]
    pub fn http_status(slug: &str, status: u16, attempts: u32) -> Self {
        Self::HttpStatus {
            slug: slug.to_string(),
            status,
            attempts,
        }
    }

    /// Creates a missing-link error.
    #[must_use]
    pub fn no_link(slug: &str) -> Self {
        Self::NoLink {
            slug: slug.to_string(),
        }
    }

    /// Creates a client construction error.
    #[must_use]
    pub fn client_build(reason: impl std::fmt::Display) -> Self {
        Self::ClientBuild {
            reason: reason.to_string(),
        }
    }
}
