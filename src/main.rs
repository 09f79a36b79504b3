//! CLI entry point for the patent bundler.

use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use patent_bundler::download::OutcomeStatus;
use patent_bundler::user_agent::tool_identity;
use patent_bundler::{BundleError, BundleService, server};
use tokio::io::AsyncReadExt;
use tracing::{debug, error, info, warn};

mod cli;

use cli::{Args, BundleArgs, Command, ServeArgs};

/// Exit status when the input held no identifiers.
const EXIT_NO_TOKENS: u8 = 2;

/// Exit status when no identifier produced a document.
const EXIT_NO_PDFS: u8 = 3;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");
    info!(identity = %tool_identity(), "starting");

    let service = BundleService::new(&args.pipeline.to_bundle_config())?;

    match args.command {
        Command::Bundle(bundle_args) => run_bundle(&service, bundle_args).await,
        Command::Serve(serve_args) => run_serve(service, &serve_args).await,
    }
}

async fn run_bundle(service: &BundleService, args: BundleArgs) -> Result<ExitCode> {
    // Read input: from positional args or stdin
    let text = if !args.text.is_empty() {
        args.text.join("\n")
    } else if !io::stdin().is_terminal() {
        let mut buffer = String::new();
        tokio::io::stdin().read_to_string(&mut buffer).await?;
        buffer
    } else {
        info!("No input provided. Pass identifiers as arguments or pipe them via stdin.");
        info!("Example: echo 'US11162431B2, EP1234567B1' | patent-bundler bundle");
        String::new()
    };

    let prepared = match service.prepare(&text).await {
        Ok(prepared) => prepared,
        Err(BundleError::NoTokens) => {
            error!("No patent identifiers found.");
            return Ok(ExitCode::from(EXIT_NO_TOKENS));
        }
        Err(BundleError::NoPdfs { details }) => {
            for detail in &details {
                warn!(token = %detail.token, code = %detail.code, reason = %detail.reason, "failed");
            }
            error!("No PDFs could be resolved.");
            return Ok(ExitCode::from(EXIT_NO_PDFS));
        }
        Err(e) => return Err(e.into()),
    };

    for outcome in &prepared.report().outcomes {
        match &outcome.status {
            OutcomeStatus::Success(document) => {
                info!(token = %outcome.token, file = %document.display_name, "downloaded");
            }
            OutcomeStatus::Failure { code, reason } => {
                warn!(token = %outcome.token, code = %code, reason = %reason, "failed");
            }
        }
    }
    if prepared.truncated() {
        warn!(
            processed = prepared.report().processed(),
            total = prepared.report().total_tokens,
            "Input truncated; raise --max-tokens to process more identifiers"
        );
    }

    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(prepared.file_name()));
    let documents = prepared.summary().document_entries.len();
    let bytes = prepared.save_to(&output).await?;

    info!(
        path = %output.display(),
        documents,
        bytes,
        "Bundle written"
    );

    Ok(ExitCode::SUCCESS)
}

async fn run_serve(service: BundleService, args: &ServeArgs) -> Result<ExitCode> {
    let config = args.to_server_config();
    info!(
        bind = %config.bind,
        port = config.port,
        frontend_origin = %config.frontend_origin,
        rate_limit = config.rate_limit_max,
        "starting HTTP server"
    );

    server::serve(&config, Arc::new(service), shutdown_signal()).await?;
    Ok(ExitCode::SUCCESS)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C; running until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
