//! Patent Bundler Library
//!
//! Turns free text containing patent identifiers into a zip of the matching
//! PDF documents plus a manifest describing what happened to each identifier.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`parser`] - Identifier extraction and candidate slug generation
//! - [`resolver`] - Slug to document URL resolution with retry/backoff
//! - [`download`] - Bounded concurrent download into a staging workspace
//! - [`archive`] - Zip assembly and manifest rendering
//! - [`workspace`] - Request-scoped temporary directories
//! - [`bundle`] - The end-to-end pipeline
//! - [`server`] - HTTP front door

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod archive;
pub mod bundle;
pub mod download;
pub mod parser;
pub mod resolver;
pub mod server;
pub mod user_agent;
pub mod workspace;

// Re-export commonly used types
pub use archive::{ArchiveAssembler, ArchiveError, ManifestEntry};
pub use bundle::{BundleConfig, BundleError, BundleService, PreparedBundle};
pub use download::{
    CoordinatorError, CoordinatorReport, DEFAULT_CONCURRENCY, DownloadCoordinator, DownloadError,
    DownloadOutcome, FailureCode, FailureDetail, HttpClient,
};
pub use parser::{DEFAULT_MAX_TOKENS, TokenBatch, extract_token_batch, extract_tokens, slug_candidates};
pub use resolver::{GooglePatentsResolver, Resolution, Resolver, RetryPolicy};
pub use server::{ServerConfig, ServerError};
pub use workspace::{Workspace, WorkspaceError};
