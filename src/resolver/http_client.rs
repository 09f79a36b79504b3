//! Shared HTTP client construction for lookup and document requests.
//!
//! Both clients present the browser identity, follow redirects, accept gzip,
//! and bound every request by the configured per-attempt timeout.

use std::time::Duration;

use reqwest::Client;

use crate::user_agent::BROWSER_USER_AGENT;

use super::ResolveError;

/// Upper bound on the connect phase, independent of the overall timeout.
const MAX_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Builds an HTTP client whose requests are bounded by `timeout`.
///
/// # Errors
///
/// Returns [`ResolveError::ClientBuild`] when the TLS backend or resolver
/// configuration cannot be initialized.
pub fn build_http_client(timeout: Duration) -> Result<Client, ResolveError> {
    Client::builder()
        .connect_timeout(timeout.min(MAX_CONNECT_TIMEOUT))
        .timeout(timeout)
        .user_agent(BROWSER_USER_AGENT)
        .gzip(true)
        .build()
        .map_err(ResolveError::client_build)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_http_client_with_short_timeout() {
        assert!(build_http_client(Duration::from_millis(250)).is_ok());
    }
}
