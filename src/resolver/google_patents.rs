//! Google Patents resolver: scrapes a patent page for its PDF link.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::RETRY_AFTER;
use tracing::{debug, info, warn};

use super::http_client::build_http_client;
use super::matchers::{LinkMatcher, default_matchers, find_document_url};
use super::retry::{RetryDecision, RetryPolicy, classify_status, parse_retry_after};
use super::{Resolution, ResolveError, ResolvedDocument, Resolver};

/// Public lookup site root.
pub const DEFAULT_LOOKUP_BASE_URL: &str = "https://patents.google.com";

/// Resolves slugs by fetching `<base>/patent/<slug>/en` and scanning the HTML.
pub struct GooglePatentsResolver {
    client: Client,
    base_url: String,
    retry_policy: RetryPolicy,
    matchers: Vec<Box<dyn LinkMatcher>>,
}

impl GooglePatentsResolver {
    /// Creates a resolver against the public lookup site.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::ClientBuild`] when HTTP client construction fails.
    pub fn new(timeout: Duration, retry_policy: RetryPolicy) -> Result<Self, ResolveError> {
        Self::with_base_url(DEFAULT_LOOKUP_BASE_URL, timeout, retry_policy)
    }

    /// Creates a resolver against a custom site root (mirrors and tests).
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::ClientBuild`] when HTTP client construction fails.
    pub fn with_base_url(
        base_url: impl Into<String>,
        timeout: Duration,
        retry_policy: RetryPolicy,
    ) -> Result<Self, ResolveError> {
        Ok(Self {
            client: build_http_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry_policy,
            matchers: default_matchers(),
        })
    }

    /// Replaces the link matchers, in priority order.
    #[must_use]
    pub fn with_matchers(mut self, matchers: Vec<Box<dyn LinkMatcher>>) -> Self {
        self.matchers = matchers;
        self
    }

    /// Returns the lookup page URL for a slug.
    #[must_use]
    pub fn lookup_url(&self, slug: &str) -> String {
        format!("{}/patent/{}/en", self.base_url, urlencoding::encode(slug))
    }

    /// Fetches the lookup page, retrying 429 and 5xx responses per policy.
    async fn fetch_page(&self, slug: &str) -> Result<String, ResolveError> {
        let url = self.lookup_url(slug);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            debug!(attempt, url = %url, "fetching lookup page");

            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| ResolveError::from_request(slug, &url, e))?;

            let status = response.status();
            if status.is_success() {
                return response
                    .text()
                    .await
                    .map_err(|e| ResolveError::from_request(slug, &url, e));
            }

            let status_code = status.as_u16();
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after);

            match self
                .retry_policy
                .should_retry(classify_status(status_code), attempt)
            {
                RetryDecision::Retry {
                    delay: backoff_delay,
                    attempt: next_attempt,
                } => {
                    let delay = retry_after
                        .map(|d| self.retry_policy.clamp_server_delay(d))
                        .unwrap_or(backoff_delay);
                    info!(
                        slug,
                        status = status_code,
                        attempt = next_attempt,
                        max_attempts = self.retry_policy.max_attempts(),
                        delay_ms = delay.as_millis(),
                        using_retry_after = retry_after.is_some(),
                        "retrying lookup"
                    );
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::DoNotRetry { reason } => {
                    debug!(slug, status = status_code, %reason, "not retrying lookup");
                    return Err(ResolveError::http_status(slug, status_code, attempt));
                }
            }
        }
    }

    async fn try_resolve(&self, slug: &str) -> Result<ResolvedDocument, ResolveError> {
        let html = self.fetch_page(slug).await?;
        let url = find_document_url(&html, &self.matchers).ok_or_else(|| ResolveError::no_link(slug))?;
        Ok(ResolvedDocument::new(url, slug))
    }
}

impl std::fmt::Debug for GooglePatentsResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GooglePatentsResolver")
            .field("base_url", &self.base_url)
            .field("retry_policy", &self.retry_policy)
            .field("matchers", &self.matchers.len())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Resolver for GooglePatentsResolver {
    fn name(&self) -> &'static str {
        "google_patents"
    }

    #[tracing::instrument(skip(self), fields(resolver = "google_patents"))]
    async fn resolve(&self, slug: &str) -> Resolution {
        match self.try_resolve(slug).await {
            Ok(document) => {
                debug!(url = %document.url, "resolved document link");
                Resolution::Found(document)
            }
            Err(error @ (ResolveError::NoLink { .. } | ResolveError::HttpStatus { .. })) => {
                debug!(error = %error, "slug not found");
                Resolution::NotFound
            }
            Err(error) => {
                warn!(error = %error, "lookup failed; treating slug as not found");
                Resolution::NotFound
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn resolver(base: &str) -> GooglePatentsResolver {
        GooglePatentsResolver::with_base_url(base, Duration::from_secs(5), RetryPolicy::immediate(3))
            .unwrap()
    }

    #[test]
    fn test_lookup_url_format() {
        let r = resolver("https://patents.google.com");
        assert_eq!(
            r.lookup_url("US11162431B2"),
            "https://patents.google.com/patent/US11162431B2/en"
        );
    }

    #[test]
    fn test_lookup_url_trims_trailing_slash_and_encodes() {
        let r = resolver("http://127.0.0.1:9000/");
        assert_eq!(
            r.lookup_url("US 1/2"),
            "http://127.0.0.1:9000/patent/US%201%2F2/en"
        );
    }

    #[test]
    fn test_name() {
        assert_eq!(resolver(DEFAULT_LOOKUP_BASE_URL).name(), "google_patents");
    }
}
