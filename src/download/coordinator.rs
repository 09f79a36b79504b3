//! Bounded fan-out of per-token resolve-then-download jobs.
//!
//! Each token expands into slug candidates, which are resolved one at a time
//! until a document URL turns up; the document is then streamed into the
//! workspace. A counting semaphore admits at most `concurrency` jobs at once,
//! and results are joined back in token order before anything is returned.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use super::HttpClient;
use super::filename::{display_name_for_slug, staged_file_name};
use super::outcome::{CoordinatorReport, DownloadOutcome, FailureCode, StagedDocument};
use crate::parser::{TokenBatch, slug_candidates};
use crate::resolver::{Resolver, resolve_first};

/// Minimum allowed concurrency value.
pub const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
pub const MAX_CONCURRENCY: usize = 32;

/// Default concurrency if not specified.
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Reason recorded when no candidate slug resolves.
pub const NO_LINK_REASON: &str = "no link found";

/// Error type for coordinator operations.
///
/// Per-token failures are never reported here; they are outcomes.
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },

    /// Semaphore was closed unexpectedly.
    #[error("semaphore closed unexpectedly")]
    SemaphoreClosed,

    /// A job task panicked or was cancelled.
    #[error("job for token {token} did not complete: {reason}")]
    JobAborted {
        /// Token whose job was lost.
        token: String,
        /// Join failure description.
        reason: String,
    },
}

/// Runs resolve-then-download jobs under a concurrency limit.
///
/// # Concurrency Model
///
/// - Each token's job runs in its own Tokio task
/// - A semaphore permit is acquired before a job is spawned
/// - Permits are released when the job finishes (RAII)
/// - Jobs live in a [`JoinSet`]; every one is joined before `run` returns
/// - Dropping the `run` future, or returning early on an error, aborts every
///   job still in flight, so none outlives the caller's workspace
///
/// The limit applies per `run` call; concurrent calls do not share permits.
pub struct DownloadCoordinator {
    concurrency: usize,
    resolver: Arc<dyn Resolver>,
    client: HttpClient,
}

impl DownloadCoordinator {
    /// Creates a coordinator.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::InvalidConcurrency`] if `concurrency` is
    /// outside 1-32.
    #[instrument(level = "debug", skip(resolver, client))]
    pub fn new(
        concurrency: usize,
        resolver: Arc<dyn Resolver>,
        client: HttpClient,
    ) -> Result<Self, CoordinatorError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(CoordinatorError::InvalidConcurrency { value: concurrency });
        }

        debug!(concurrency, resolver = resolver.name(), "creating download coordinator");

        Ok(Self {
            concurrency,
            resolver,
            client,
        })
    }

    /// Returns the configured concurrency limit.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Processes every token in `batch`, staging documents into `workspace_dir`.
    ///
    /// Returns one outcome per token in input order.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::SemaphoreClosed`] if the semaphore is closed
    /// and [`CoordinatorError::JobAborted`] if a job panics. Individual
    /// resolve or download failures do NOT cause this method to error.
    #[instrument(
        skip(self, batch),
        fields(tokens = batch.len(), total = batch.total, workspace = %workspace_dir.display())
    )]
    pub async fn run(
        &self,
        batch: &TokenBatch,
        workspace_dir: &Path,
    ) -> Result<CoordinatorReport, CoordinatorError> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut jobs = JoinSet::new();
        let mut tokens_by_task = HashMap::with_capacity(batch.len());

        info!(concurrency = self.concurrency, "starting token jobs");

        for (index, token) in batch.tokens.iter().enumerate() {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|_| CoordinatorError::SemaphoreClosed)?;

            let resolver = Arc::clone(&self.resolver);
            let client = self.client.clone();
            let workspace_dir = workspace_dir.to_path_buf();
            let job_token = token.clone();

            let handle = jobs.spawn(async move {
                let _permit = permit;
                let outcome =
                    run_job(index, &job_token, resolver.as_ref(), &client, &workspace_dir).await;
                (index, outcome)
            });
            tokens_by_task.insert(handle.id(), token.clone());
        }

        debug!(job_count = jobs.len(), "waiting for token jobs");

        let mut finished = Vec::with_capacity(jobs.len());
        while let Some(joined) = jobs.join_next().await {
            match joined {
                Ok(pair) => finished.push(pair),
                Err(e) => {
                    return Err(CoordinatorError::JobAborted {
                        token: tokens_by_task.remove(&e.id()).unwrap_or_default(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        finished.sort_unstable_by_key(|(index, _)| *index);
        let outcomes = finished.into_iter().map(|(_, outcome)| outcome).collect();

        let report = CoordinatorReport {
            outcomes,
            total_tokens: batch.total,
        };
        info!(
            processed = report.processed(),
            succeeded = report.success_count(),
            truncated = report.truncated(),
            "token jobs complete"
        );
        Ok(report)
    }
}

impl std::fmt::Debug for DownloadCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadCoordinator")
            .field("concurrency", &self.concurrency)
            .field("resolver", &self.resolver.name())
            .finish_non_exhaustive()
    }
}

/// One token's job: first resolving slug wins, then one download attempt.
async fn run_job(
    index: usize,
    token: &str,
    resolver: &dyn Resolver,
    client: &HttpClient,
    workspace_dir: &Path,
) -> DownloadOutcome {
    let candidates = slug_candidates(token);
    debug!(token, candidates = ?candidates, "resolving token");

    let Some(document) = resolve_first(resolver, &candidates).await else {
        warn!(token, tried = candidates.len(), "no candidate slug resolved");
        return DownloadOutcome::failure(token, FailureCode::ResolveFail, NO_LINK_REASON);
    };

    let display_name = display_name_for_slug(&document.slug);
    let path = workspace_dir.join(staged_file_name(index, &display_name));

    match client.download_to_path(&document.url, &path).await {
        Ok(bytes) => {
            info!(token, slug = %document.slug, bytes, "document downloaded");
            DownloadOutcome::success(
                token,
                StagedDocument {
                    path,
                    display_name,
                    slug: document.slug,
                    source_url: document.url,
                    bytes,
                },
            )
        }
        Err(error) => {
            warn!(token, url = %document.url, error = %error, "document download failed");
            DownloadOutcome::failure(token, FailureCode::DownloadFail, error.manifest_reason())
        }
    }
}
