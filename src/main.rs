// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up diagnostic logging (tracing)
// 3. Crawl, writing upgrades to stdout and errors to stderr
// 4. Optionally post everything to a Slack webhook
// 5. Exit with proper code (0 = crawl finished, 1 = bad input or Slack failed)
//
// Note that broken links do NOT change the exit code. They are reported on
// stderr, but the crawl itself still succeeded.
// =============================================================================

// Module declarations - tells Rust about our other source files
mod cli;     // src/cli.rs - command-line parsing
mod crawl;   // src/crawl/ - the crawler
mod error;   // src/error.rs - error types
mod fetch;   // src/fetch/ - HTTP and HTML
mod notify;  // src/notify/ - Slack webhook

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use crawl::{Crawler, SharedBuffer, Tee};
use std::io;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let crawler = Crawler {
        sites: cli.urls.clone(),
        depth: cli.depth,
        parallel: Some(cli.parallel),
        delay: Duration::from_millis(cli.delay),
        verbose: cli.verbose,
        timeout: cli.timeout.map(Duration::from_secs),
        fetcher: None,
    };

    // Without Slack we write straight to the terminal.
    // With Slack we also keep a copy of everything for the message.
    let captured_out = SharedBuffer::default();
    let captured_errors = SharedBuffer::default();
    let summary = match &cli.slack {
        None => crawler.run(io::stdout(), io::stderr()).await,
        Some(_) => {
            crawler
                .run(
                    Tee::new(io::stdout(), captured_out.clone()),
                    Tee::new(io::stderr(), captured_errors.clone()),
                )
                .await
        }
    };

    let summary = match summary {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("failed to crawl: {}", e);
            return Ok(1);
        }
    };
    info!(
        pages = summary.dispatched,
        duplicates = summary.duplicates,
        skipped = summary.retired_unvisited,
        pending = summary.pending_at_close,
        upgrades = summary.results,
        errors = summary.errors,
        "crawl finished"
    );

    let Some(hook) = &cli.slack else {
        return Ok(0);
    };

    let text = notify::format_message(&captured_out.contents(), &captured_errors.contents());
    if text.is_empty() {
        info!("nothing to post to Slack");
        return Ok(0);
    }

    let payload = notify::Webhook {
        text,
        username: cli.slack_username.clone(),
        channel: cli.slack_channel.clone(),
        icon_emoji: cli.slack_icon_emoji.clone(),
    };
    if let Err(e) = notify::post(&reqwest::Client::new(), hook, &payload).await {
        eprintln!("failed posting to Slack: {}", e);
        return Ok(1);
    }

    Ok(0)
}

// Diagnostics go to stderr and can be tuned with RUST_LOG.
// --verbose turns on our own debug logs.
fn init_tracing(verbose: bool) -> Result<()> {
    let level = if verbose { "https_scout=debug" } else { "https_scout=warn" };
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    Ok(())
}
