//! CLI argument definitions using clap derive macros.

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use patent_bundler::resolver::DEFAULT_LOOKUP_BASE_URL;
use patent_bundler::server::DEFAULT_FRONTEND_ORIGIN;
use patent_bundler::{BundleConfig, RetryPolicy, ServerConfig};

/// Resolve patent identifiers to PDFs and bundle them into one zip.
///
/// Identifiers may be written in any common form (`US 11,162,431 B2`,
/// `EP1234567`, `10859001`); each is looked up on the public patent site and
/// its document is downloaded. The zip includes a `manifest.csv` recording
/// what happened to every identifier.
#[derive(Parser, Debug)]
#[command(name = "patent-bundler")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(flatten)]
    pub pipeline: PipelineArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Tunables shared by both subcommands.
#[derive(clap::Args, Debug, Clone)]
pub struct PipelineArgs {
    /// Per-attempt network timeout in milliseconds (100-600000)
    #[arg(long, env = "FETCH_TIMEOUT_MS", default_value_t = 25_000, global = true, value_parser = clap::value_parser!(u64).range(100..=600_000))]
    pub timeout_ms: u64,

    /// Maximum identifiers processed at once (1-32)
    #[arg(short = 'c', long, env = "FETCH_CONCURRENCY", default_value_t = 3, global = true, value_parser = clap::value_parser!(u8).range(1..=32))]
    pub concurrency: u8,

    /// Maximum identifiers accepted per request (1-1000)
    #[arg(long, env = "MAX_TOKENS", default_value_t = 50, global = true, value_parser = clap::value_parser!(u32).range(1..=1000))]
    pub max_tokens: u32,

    /// Lookup attempts per slug on 429/5xx responses (1-10)
    #[arg(long, env = "RESOLVE_MAX_ATTEMPTS", default_value_t = 3, global = true, value_parser = clap::value_parser!(u32).range(1..=10))]
    pub max_attempts: u32,

    /// First lookup retry delay in milliseconds, doubled per attempt (0-60000)
    #[arg(long, env = "RESOLVE_BACKOFF_MS", default_value_t = 500, global = true, value_parser = clap::value_parser!(u64).range(0..=60_000))]
    pub backoff_ms: u64,

    /// Patent site root used for lookups
    #[arg(long, env = "LOOKUP_BASE_URL", default_value = DEFAULT_LOOKUP_BASE_URL, global = true)]
    pub lookup_base_url: String,
}

impl PipelineArgs {
    /// Converts flags into the library's pipeline configuration.
    #[must_use]
    pub fn to_bundle_config(&self) -> BundleConfig {
        BundleConfig {
            timeout: Duration::from_millis(self.timeout_ms),
            concurrency: usize::from(self.concurrency),
            max_tokens: self.max_tokens as usize,
            retry_policy: RetryPolicy::with_attempts_and_delay(
                self.max_attempts,
                Duration::from_millis(self.backoff_ms),
            ),
            lookup_base_url: self.lookup_base_url.clone(),
            workspace_root: None,
        }
    }
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build one bundle from arguments or stdin and write it to disk
    Bundle(BundleArgs),
    /// Run the HTTP API
    Serve(ServeArgs),
}

/// `bundle` arguments.
#[derive(clap::Args, Debug)]
pub struct BundleArgs {
    /// Text containing patent identifiers (reads stdin when omitted)
    pub text: Vec<String>,

    /// Output file (default: patent_bundle_<millis>.zip in the current directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// `serve` arguments.
#[derive(clap::Args, Debug)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Address to bind
    #[arg(long, env = "BIND_ADDR", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind: IpAddr,

    /// Only origin allowed by CORS
    #[arg(long, env = "FRONTEND_ORIGIN", default_value = DEFAULT_FRONTEND_ORIGIN)]
    pub frontend_origin: String,

    /// Bundle requests per client per window (0 to disable)
    #[arg(long, env = "RATE_LIMIT_MAX", default_value_t = 10)]
    pub rate_limit: u32,

    /// Rate limit window in seconds (1-86400)
    #[arg(long, env = "RATE_LIMIT_WINDOW_SECS", default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..=86_400))]
    pub rate_window_secs: u64,
}

impl ServeArgs {
    /// Converts flags into the library's server configuration.
    #[must_use]
    pub fn to_server_config(&self) -> ServerConfig {
        ServerConfig {
            bind: self.bind,
            port: self.port,
            frontend_origin: self.frontend_origin.clone(),
            rate_limit_max: self.rate_limit,
            rate_limit_window: Duration::from_secs(self.rate_window_secs),
        }
    }
}
