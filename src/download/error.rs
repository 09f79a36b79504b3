//! Error types for the download module.
//!
//! These errors describe a single document fetch. The coordinator turns them
//! into per-token failure outcomes; they never abort a whole request.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while fetching one document.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Network-level error (DNS resolution, connection refused, TLS, broken stream).
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before the body was fully received.
    #[error("timeout downloading {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Non-success HTTP status from the document host.
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// File system error while staging the document.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The resolved URL is malformed or not http(s).
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The download HTTP client could not be constructed.
    #[error("failed to build download HTTP client: {source}")]
    ClientBuild {
        /// The underlying builder error.
        #[source]
        source: reqwest::Error,
    },
}

impl DownloadError {
    /// Creates a network or timeout error from a reqwest error.
    pub fn from_request(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout { url: url.into() }
        } else {
            Self::Network {
                url: url.into(),
                source,
            }
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Short reason suitable for a manifest row.
    ///
    /// HTTP failures embed the upstream status code.
    #[must_use]
    pub fn manifest_reason(&self) -> String {
        match self {
            Self::HttpStatus { status, .. } => format!("download failed (HTTP {status})"),
            Self::Timeout { .. } => "download failed (timeout)".to_string(),
            Self::Network { .. } => "download failed (network error)".to_string(),
            Self::Io { .. } => "download failed (could not stage file)".to_string(),
            Self::InvalidUrl { .. } => "download failed (invalid document URL)".to_string(),
            Self::ClientBuild { .. } => "download failed (client unavailable)".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_display_and_reason() {
        let error = DownloadError::http_status("https://example.com/doc.pdf", 404);
        let msg = error.to_string();
        assert!(msg.contains("404"), "Expected '404' in: {msg}");
        assert!(msg.contains("https://example.com/doc.pdf"));
        assert_eq!(error.manifest_reason(), "download failed (HTTP 404)");
    }

    #[test]
    fn test_timeout_display() {
        let error = DownloadError::timeout("https://example.com/doc.pdf");
        assert!(error.to_string().contains("timeout"));
        assert_eq!(error.manifest_reason(), "download failed (timeout)");
    }

    #[test]
    fn test_io_display_contains_path() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let error = DownloadError::io(PathBuf::from("/tmp/stage/001_US1.pdf"), io_error);
        assert!(error.to_string().contains("/tmp/stage/001_US1.pdf"));
    }

    #[test]
    fn test_invalid_url_display() {
        let error = DownloadError::invalid_url("ftp://example.com/x.pdf");
        assert!(error.to_string().contains("invalid URL"));
        assert!(!error.manifest_reason().contains(','));
    }
}
