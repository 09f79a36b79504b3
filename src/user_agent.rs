//! Shared User-Agent strings for lookup and download HTTP clients.
//!
//! The document site rejects obviously automated signatures, so both clients
//! present a desktop browser identity. The tool identity only appears in
//! startup logs.

/// Desktop browser User-Agent sent on lookup page and document requests.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36";

/// Service name reported by the health endpoint.
pub const SERVICE_NAME: &str = "patent-bundler";

/// Tool identity (`patent-bundler/<version>`).
#[must_use]
pub fn tool_identity() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("{SERVICE_NAME}/{version}")
}
