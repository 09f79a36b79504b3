//! Per-token outcomes recorded by the coordinator.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// Reason code attached to a failed token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureCode {
    /// No candidate slug produced a document URL.
    #[serde(rename = "RESOLVE_FAIL")]
    ResolveFail,
    /// A document URL was found but fetching it failed.
    #[serde(rename = "DOWNLOAD_FAIL")]
    DownloadFail,
}

impl FailureCode {
    /// Wire form used in the manifest and error bodies.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ResolveFail => "RESOLVE_FAIL",
            Self::DownloadFail => "DOWNLOAD_FAIL",
        }
    }
}

impl fmt::Display for FailureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document written into the workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedDocument {
    /// Location of the staged file inside the workspace.
    pub path: PathBuf,
    /// Preferred archive entry name (`<sanitized-slug>.pdf`).
    pub display_name: String,
    /// Slug whose page produced the document link.
    pub slug: String,
    /// URL the document was fetched from.
    pub source_url: String,
    /// Bytes written.
    pub bytes: u64,
}

/// Success or failure of one token's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeStatus {
    /// The document was staged.
    Success(StagedDocument),
    /// The token produced no document.
    Failure {
        /// Failure category.
        code: FailureCode,
        /// Human-readable reason.
        reason: String,
    },
}

/// Outcome of one token's resolve-then-download job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    /// The input token.
    pub token: String,
    /// What happened to it.
    pub status: OutcomeStatus,
}

impl DownloadOutcome {
    /// Creates a success outcome.
    #[must_use]
    pub fn success(token: impl Into<String>, document: StagedDocument) -> Self {
        Self {
            token: token.into(),
            status: OutcomeStatus::Success(document),
        }
    }

    /// Creates a failure outcome.
    #[must_use]
    pub fn failure(token: impl Into<String>, code: FailureCode, reason: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            status: OutcomeStatus::Failure {
                code,
                reason: reason.into(),
            },
        }
    }

    /// Returns true if the document was staged.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.status, OutcomeStatus::Success(_))
    }

    /// Returns the staged document for a success.
    #[must_use]
    pub fn staged(&self) -> Option<&StagedDocument> {
        match &self.status {
            OutcomeStatus::Success(document) => Some(document),
            OutcomeStatus::Failure { .. } => None,
        }
    }

    /// Returns the serializable failure detail for a failure.
    #[must_use]
    pub fn failure_detail(&self) -> Option<FailureDetail> {
        match &self.status {
            OutcomeStatus::Success(_) => None,
            OutcomeStatus::Failure { code, reason } => Some(FailureDetail {
                token: self.token.clone(),
                code: *code,
                reason: reason.clone(),
            }),
        }
    }
}

/// Failure row reported to callers when no document could be bundled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureDetail {
    /// The input token.
    pub token: String,
    /// Failure category.
    pub code: FailureCode,
    /// Human-readable reason.
    pub reason: String,
}

/// Every token's outcome, in input order, plus truncation accounting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoordinatorReport {
    /// One outcome per processed token, in input order.
    pub outcomes: Vec<DownloadOutcome>,
    /// Tokens extracted before the cap was applied.
    pub total_tokens: usize,
}

impl CoordinatorReport {
    /// Number of tokens processed.
    #[must_use]
    pub fn processed(&self) -> usize {
        self.outcomes.len()
    }

    /// Returns true if the token list was capped upstream.
    #[must_use]
    pub fn truncated(&self) -> bool {
        self.total_tokens > self.outcomes.len()
    }

    /// Number of staged documents.
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    /// Failure details for every failed token, in input order.
    #[must_use]
    pub fn failure_details(&self) -> Vec<FailureDetail> {
        self.outcomes
            .iter()
            .filter_map(DownloadOutcome::failure_detail)
            .collect()
    }
}
