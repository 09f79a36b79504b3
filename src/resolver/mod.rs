//! Document resolution: slug → direct document URL.
//!
//! A [`Resolver`] turns one candidate slug into a [`Resolution`]. Failure to
//! resolve is an ordinary outcome, not an error: timeouts, permanent HTTP
//! statuses, and pages without a document link all come back as
//! [`Resolution::NotFound`]. Only 429 and 5xx lookup responses are retried,
//! with backoff governed by [`RetryPolicy`].
//!
//! # Architecture
//!
//! - [`Resolver`] - async trait the coordinator calls once per slug
//! - [`GooglePatentsResolver`] - scrapes the public patent page for its PDF link
//! - [`LinkMatcher`] - one link-extraction strategy; tried in priority order
//! - [`RetryPolicy`] - attempt count and backoff growth for lookups
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use patent_bundler::resolver::{GooglePatentsResolver, Resolution, Resolver, RetryPolicy};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let resolver = GooglePatentsResolver::new(Duration::from_secs(25), RetryPolicy::default())?;
//! if let Resolution::Found(doc) = resolver.resolve("US11162431B2").await {
//!     println!("{} -> {}", doc.slug, doc.url);
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod google_patents;
mod http_client;
pub mod matchers;
mod retry;

pub use error::ResolveError;
pub use google_patents::{DEFAULT_LOOKUP_BASE_URL, GooglePatentsResolver};
pub use http_client::build_http_client;
pub use matchers::{LinkMatcher, RegexMatcher, default_matchers, find_document_url};
pub use retry::{
    DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS, FailureType, RetryDecision, RetryPolicy,
    classify_status, parse_retry_after,
};

use async_trait::async_trait;

/// A direct document URL and the slug whose page produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDocument {
    /// Direct document URL.
    pub url: String,
    /// Slug that resolved.
    pub slug: String,
}

impl ResolvedDocument {
    /// Creates a resolved document.
    #[must_use]
    pub fn new(url: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            slug: slug.into(),
        }
    }
}

/// Outcome of resolving one slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A document URL was found.
    Found(ResolvedDocument),
    /// The slug did not lead to a document.
    NotFound,
}

/// Trait implemented by document resolvers.
///
/// # Object Safety
///
/// Uses `async_trait` so the coordinator can hold `Arc<dyn Resolver>`.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Returns the resolver's name for logs.
    fn name(&self) -> &str;

    /// Resolves one slug. Never fails; unresolvable slugs are `NotFound`.
    async fn resolve(&self, slug: &str) -> Resolution;
}

/// Tries `slugs` in order and returns the first that resolves.
///
/// Later candidates are only fetched when earlier ones miss.
pub async fn resolve_first(resolver: &dyn Resolver, slugs: &[String]) -> Option<ResolvedDocument> {
    for slug in slugs {
        if let Resolution::Found(document) = resolver.resolve(slug).await {
            return Some(document);
        }
    }
    None
}
