//! Concurrent document download into a request workspace.
//!
//! # Features
//!
//! - Streaming downloads (memory-efficient for large documents)
//! - Bounded fan-out of per-token jobs with ordered fan-in
//! - Partial files removed when a stream fails
//! - Failures captured as per-token outcomes, never raised
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use std::time::Duration;
//! use patent_bundler::download::{DownloadCoordinator, HttpClient};
//! use patent_bundler::parser::extract_token_batch;
//! use patent_bundler::resolver::{GooglePatentsResolver, RetryPolicy};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let timeout = Duration::from_secs(25);
//! let resolver = Arc::new(GooglePatentsResolver::new(timeout, RetryPolicy::default())?);
//! let coordinator = DownloadCoordinator::new(3, resolver, HttpClient::new(timeout)?)?;
//! let batch = extract_token_batch("US11162431B2", 50);
//! let report = coordinator.run(&batch, Path::new("/tmp/staging")).await?;
//! println!("{} of {} staged", report.success_count(), report.processed());
//! # Ok(())
//! # }
//! ```

mod client;
mod coordinator;
mod error;
pub mod filename;
mod outcome;

pub use client::HttpClient;
pub use coordinator::{
    CoordinatorError, DEFAULT_CONCURRENCY, DownloadCoordinator, MAX_CONCURRENCY, MIN_CONCURRENCY,
    NO_LINK_REASON,
};
pub use error::DownloadError;
pub use filename::sanitize_slug;
pub use outcome::{
    CoordinatorReport, DownloadOutcome, FailureCode, FailureDetail, OutcomeStatus, StagedDocument,
};
