//! HTTP client wrapper for streaming documents into the staging directory.

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, instrument, warn};
use url::Url;

use super::error::DownloadError;
use crate::user_agent::BROWSER_USER_AGENT;

/// Upper bound on the connect phase, independent of the overall timeout.
const MAX_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for document downloads.
///
/// Created once per bundle request and shared by every job so connections are
/// pooled. Each request is bounded by the configured timeout, which covers
/// the whole body transfer.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use std::time::Duration;
/// use patent_bundler::download::HttpClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new(Duration::from_secs(25))?;
/// let bytes = client
///     .download_to_path("https://example.com/US1.pdf", Path::new("/tmp/US1.pdf"))
///     .await?;
/// println!("staged {bytes} bytes");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a client whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::ClientBuild`] when the TLS backend cannot be
    /// initialized.
    pub fn new(timeout: Duration) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .connect_timeout(timeout.min(MAX_CONNECT_TIMEOUT))
            .timeout(timeout)
            .user_agent(BROWSER_USER_AGENT)
            .gzip(true)
            .build()
            .map_err(|source| DownloadError::ClientBuild { source })?;
        Ok(Self { client })
    }

    /// Downloads `url` into `file_path`, returning bytes written.
    ///
    /// The file is created (or truncated) before the body is streamed. On any
    /// failure after creation the partial file is removed.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if:
    /// - The URL is not http(s)
    /// - The request fails or times out
    /// - The server returns a non-success status
    /// - Writing to disk fails
    #[instrument(skip(self, url, file_path), fields(url = %url))]
    pub async fn download_to_path(&self, url: &str, file_path: &Path) -> Result<u64, DownloadError> {
        validate_url(url)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadError::from_request(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(url, status.as_u16()));
        }

        let mut file = File::create(file_path)
            .await
            .map_err(|e| DownloadError::io(file_path, e))?;

        match stream_to_file(&mut file, response, url, file_path).await {
            Ok(bytes) => {
                debug!(bytes, path = %file_path.display(), "document staged");
                Ok(bytes)
            }
            Err(error) => {
                drop(file);
                if let Err(remove_error) = tokio::fs::remove_file(file_path).await {
                    warn!(
                        path = %file_path.display(),
                        error = %remove_error,
                        "failed to remove partial download"
                    );
                }
                Err(error)
            }
        }
    }
}

fn validate_url(url: &str) -> Result<(), DownloadError> {
    match Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        _ => Err(DownloadError::invalid_url(url)),
    }
}

/// Streams response body to file, returning bytes written.
async fn stream_to_file(
    file: &mut File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::from_request(url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(file_path, e))?;

        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(file_path, e))?;

    Ok(bytes_written)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url_accepts_http_and_https() {
        assert!(validate_url("https://patentimages.storage.googleapis.com/a/US1.pdf").is_ok());
        assert!(validate_url("http://127.0.0.1:8080/US1.pdf").is_ok());
    }

    #[test]
    fn test_validate_url_rejects_other_schemes() {
        assert!(matches!(
            validate_url("ftp://example.com/US1.pdf"),
            Err(DownloadError::InvalidUrl { .. })
        ));
        assert!(matches!(
            validate_url("not a url"),
            Err(DownloadError::InvalidUrl { .. })
        ));
    }

    #[tokio::test]
    async fn test_download_invalid_url_creates_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("001_US1.pdf");
        let client = HttpClient::new(Duration::from_secs(1)).unwrap();

        let result = client.download_to_path("file:///etc/passwd", &path).await;

        assert!(matches!(result, Err(DownloadError::InvalidUrl { .. })));
        assert!(!path.exists());
    }

    /// Serves one response that promises more body than it sends, then hangs up.
    async fn serve_truncated_body() -> String {
        use tokio::io::AsyncReadExt;
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0_u8; 1024];
            let _ = socket.read(&mut request).await;
            socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\nContent-Type: application/pdf\r\nContent-Length: 100000\r\n\r\n%PDF-1.4 partial",
                )
                .await
                .unwrap();
            socket.flush().await.unwrap();
        });
        format!("http://{addr}/US1.pdf")
    }

    #[tokio::test]
    async fn test_broken_body_removes_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("000_US1.pdf");
        let client = HttpClient::new(Duration::from_secs(5)).unwrap();
        let url = serve_truncated_body().await;

        let result = client.download_to_path(&url, &path).await;

        assert!(result.is_err(), "truncated body should fail: {result:?}");
        assert!(!path.exists(), "partial file should be removed");
    }

    #[tokio::test]
    async fn test_slow_document_times_out() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"%PDF-1.4".to_vec())
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("000_US1.pdf");
        let client = HttpClient::new(Duration::from_millis(200)).unwrap();

        let err = client
            .download_to_path(&format!("{}/US1.pdf", server.uri()), &path)
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::Timeout { .. }), "{err:?}");
        assert_eq!(err.manifest_reason(), "download failed (timeout)");
        assert!(!path.exists());
    }
}
