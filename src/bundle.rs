//! End-to-end pipeline: free text in, staged archive out.
//!
//! [`BundleService::prepare`] extracts tokens, runs the coordinator inside a
//! fresh [`Workspace`], and assembles the archive. The returned
//! [`PreparedBundle`] owns the workspace; streaming or saving the archive
//! consumes it and removes the workspace when done. Every terminal failure
//! removes the workspace before returning.

use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use futures_util::Stream;
use thiserror::Error;
use tokio_util::io::ReaderStream;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::archive::{ArchiveAssembler, ArchiveSummary};
use crate::download::{
    CoordinatorReport, DEFAULT_CONCURRENCY, DownloadCoordinator, FailureDetail, HttpClient,
};
use crate::parser::{DEFAULT_MAX_TOKENS, extract_token_batch};
use crate::resolver::{DEFAULT_LOOKUP_BASE_URL, GooglePatentsResolver, Resolver, RetryPolicy};
use crate::workspace::Workspace;

/// Default per-attempt network timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(25_000);

/// Name of the archive file inside the workspace.
const STAGED_ARCHIVE_NAME: &str = "bundle.zip";

/// Pipeline tunables.
#[derive(Debug, Clone)]
pub struct BundleConfig {
    /// Per-attempt timeout for lookups and downloads.
    pub timeout: Duration,
    /// Maximum jobs in flight per request.
    pub concurrency: usize,
    /// Tokens processed per request; extras are dropped and reported.
    pub max_tokens: usize,
    /// Lookup retry policy.
    pub retry_policy: RetryPolicy,
    /// Document-site root.
    pub lookup_base_url: String,
    /// Directory workspaces are created in; system temp dir when `None`.
    pub workspace_root: Option<PathBuf>,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            concurrency: DEFAULT_CONCURRENCY,
            max_tokens: DEFAULT_MAX_TOKENS,
            retry_policy: RetryPolicy::default(),
            lookup_base_url: DEFAULT_LOOKUP_BASE_URL.to_string(),
            workspace_root: None,
        }
    }
}

/// Request-level failures.
#[derive(Debug, Error)]
pub enum BundleError {
    /// The input contained no identifiers.
    #[error("no patent identifiers found")]
    NoTokens,

    /// Every token failed.
    #[error("no documents could be resolved for {} token(s)", .details.len())]
    NoPdfs {
        /// One entry per token, in input order.
        details: Vec<FailureDetail>,
    },

    /// Unexpected fault; details are logged under the correlation id only.
    #[error("internal error (correlation id {correlation_id})")]
    Internal {
        /// Identifier linking the caller's error to the log entry.
        correlation_id: Uuid,
    },

    /// The service could not be built from its configuration.
    #[error("invalid bundle configuration: {reason}")]
    Config {
        /// What was wrong.
        reason: String,
    },

    /// The finished archive could not be written to its destination.
    #[error("failed to write archive to {path}: {source}")]
    Output {
        /// Destination path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl BundleError {
    /// Logs `cause` under a fresh correlation id and returns `Internal`.
    pub fn internal(cause: impl std::fmt::Display) -> Self {
        Self::Internal {
            correlation_id: report_internal(cause),
        }
    }

    fn config(reason: impl std::fmt::Display) -> Self {
        Self::Config {
            reason: reason.to_string(),
        }
    }

    /// Stable machine-readable code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoTokens => "NO_TOKENS",
            Self::NoPdfs { .. } => "NO_PDFS",
            Self::Internal { .. } | Self::Config { .. } | Self::Output { .. } => "INTERNAL",
        }
    }
}

/// Runs the resolve-fetch-bundle pipeline.
#[derive(Debug)]
pub struct BundleService {
    coordinator: DownloadCoordinator,
    assembler: ArchiveAssembler,
    max_tokens: usize,
    workspace_root: Option<PathBuf>,
}

impl BundleService {
    /// Builds the service with the Google Patents resolver.
    ///
    /// # Errors
    ///
    /// Returns [`BundleError::Config`] if an HTTP client cannot be built or a
    /// tunable is out of range.
    pub fn new(config: &BundleConfig) -> Result<Self, BundleError> {
        let resolver = GooglePatentsResolver::with_base_url(
            config.lookup_base_url.as_str(),
            config.timeout,
            config.retry_policy.clone(),
        )
        .map_err(BundleError::config)?;
        Self::with_resolver(config, Arc::new(resolver))
    }

    /// Builds the service around a caller-supplied resolver.
    ///
    /// # Errors
    ///
    /// Returns [`BundleError::Config`] if the download client cannot be built
    /// or a tunable is out of range.
    pub fn with_resolver(
        config: &BundleConfig,
        resolver: Arc<dyn Resolver>,
    ) -> Result<Self, BundleError> {
        if config.max_tokens == 0 {
            return Err(BundleError::config("max_tokens must be at least 1"));
        }
        let client = HttpClient::new(config.timeout).map_err(BundleError::config)?;
        let coordinator = DownloadCoordinator::new(config.concurrency, resolver, client)
            .map_err(BundleError::config)?;

        Ok(Self {
            coordinator,
            assembler: ArchiveAssembler::new(),
            max_tokens: config.max_tokens,
            workspace_root: config.workspace_root.clone(),
        })
    }

    /// Tokens processed per request.
    #[must_use]
    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Runs the pipeline for `text`.
    ///
    /// # Errors
    ///
    /// - [`BundleError::NoTokens`] when nothing was extracted (no workspace is created)
    /// - [`BundleError::NoPdfs`] when every token failed
    /// - [`BundleError::Internal`] on unexpected faults
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    pub async fn prepare(&self, text: &str) -> Result<PreparedBundle, BundleError> {
        let batch = extract_token_batch(text, self.max_tokens);
        if batch.is_empty() {
            info!("no identifiers in input");
            return Err(BundleError::NoTokens);
        }
        if batch.truncated() {
            warn!(processed = batch.len(), total = batch.total, "token list truncated");
        }

        let mut workspace = match &self.workspace_root {
            Some(root) => Workspace::create_in(root),
            None => Workspace::create(),
        }
        .map_err(BundleError::internal)?;

        let report = match self.coordinator.run(&batch, workspace.path()).await {
            Ok(report) => report,
            Err(e) => {
                discard(&mut workspace);
                return Err(BundleError::internal(e));
            }
        };

        if report.success_count() == 0 {
            info!(tokens = report.processed(), "no documents resolved");
            discard(&mut workspace);
            return Err(BundleError::NoPdfs {
                details: report.failure_details(),
            });
        }

        let archive_path = workspace.path().join(STAGED_ARCHIVE_NAME);
        let assembler = self.assembler.clone();
        let target = archive_path.clone();
        let joined = tokio::task::spawn_blocking(move || {
            let written = assembler.write_to_path(&report, &target);
            (report, written)
        })
        .await;

        let (report, summary) = match joined {
            Ok((report, Ok(summary))) => (report, summary),
            Ok((_, Err(e))) => {
                discard(&mut workspace);
                return Err(BundleError::internal(e));
            }
            Err(e) => {
                discard(&mut workspace);
                return Err(BundleError::internal(e));
            }
        };

        let file_name = bundle_file_name(SystemTime::now());
        info!(
            file_name = %file_name,
            documents = summary.document_entries.len(),
            tokens = report.processed(),
            truncated = report.truncated(),
            "bundle ready"
        );

        Ok(PreparedBundle {
            workspace,
            archive_path,
            file_name,
            report,
            summary,
        })
    }
}

/// Logs an unexpected fault and returns the correlation id it was logged under.
pub fn report_internal(cause: impl std::fmt::Display) -> Uuid {
    let correlation_id = Uuid::new_v4();
    error!(%correlation_id, error = %cause, "internal bundle failure");
    correlation_id
}

fn discard(workspace: &mut Workspace) {
    if let Err(error) = workspace.cleanup() {
        warn!(error = %error, "failed to remove workspace");
    }
}

/// Suggested download name: `patent_bundle_<unix-millis>.zip`.
#[must_use]
pub fn bundle_file_name(now: SystemTime) -> String {
    let millis = now
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!("patent_bundle_{millis}.zip")
}

/// A finished archive still sitting in its workspace.
#[derive(Debug)]
pub struct PreparedBundle {
    workspace: Workspace,
    archive_path: PathBuf,
    file_name: String,
    report: CoordinatorReport,
    summary: ArchiveSummary,
}

impl PreparedBundle {
    /// Suggested download name.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Per-token outcomes.
    #[must_use]
    pub fn report(&self) -> &CoordinatorReport {
        &self.report
    }

    /// Archive contents.
    #[must_use]
    pub fn summary(&self) -> &ArchiveSummary {
        &self.summary
    }

    /// Returns true if tokens beyond the cap were dropped.
    #[must_use]
    pub fn truncated(&self) -> bool {
        self.report.truncated()
    }

    /// Path of the archive inside the workspace.
    #[must_use]
    pub fn archive_path(&self) -> &Path {
        &self.archive_path
    }

    /// Workspace directory.
    #[must_use]
    pub fn workspace_path(&self) -> &Path {
        self.workspace.path()
    }

    /// Opens the archive as a byte stream that owns the workspace.
    ///
    /// # Errors
    ///
    /// Returns [`BundleError::Internal`] if the archive cannot be opened; the
    /// workspace is removed in that case too.
    pub async fn into_stream(self) -> Result<ArchiveStream, BundleError> {
        let file = tokio::fs::File::open(&self.archive_path)
            .await
            .map_err(BundleError::internal)?;
        Ok(ArchiveStream {
            inner: ReaderStream::new(file),
            workspace: self.workspace,
        })
    }

    /// Copies the archive to `destination` and removes the workspace.
    ///
    /// # Errors
    ///
    /// Returns [`BundleError::Output`] if the copy fails.
    pub async fn save_to(mut self, destination: &Path) -> Result<u64, BundleError> {
        let copied = tokio::fs::copy(&self.archive_path, destination)
            .await
            .map_err(|source| BundleError::Output {
                path: destination.to_path_buf(),
                source,
            });
        discard(&mut self.workspace);
        copied
    }
}

/// Archive bytes streamed from the workspace.
///
/// The workspace is removed as soon as the stream ends or fails, and on drop
/// if the consumer goes away first.
#[derive(Debug)]
pub struct ArchiveStream {
    inner: ReaderStream<tokio::fs::File>,
    workspace: Workspace,
}

impl Stream for ArchiveStream {
    type Item = std::io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_next(cx);
        match &polled {
            Poll::Ready(None) => discard(&mut this.workspace),
            Poll::Ready(Some(Err(error))) => {
                warn!(error = %error, "archive stream failed");
                discard(&mut this.workspace);
            }
            _ => {}
        }
        polled
    }
}
