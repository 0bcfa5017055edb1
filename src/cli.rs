// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// clap is a popular Rust library for parsing command-line arguments.
// We use the "derive" API which lets us define the CLI structure using
// Rust structs and attributes (the #[...] things).
// =============================================================================

use clap::Parser;

const ABOUT: &str = "Find links you can update to HTTPS";

const LONG_ABOUT: &str = "\
Find links you can update to HTTPS

Sites are crawled recursively. Each external http:// link is checked to see
if it can be replaced with https://. If a link can be replaced it is written
to stdout, prefixed with the page it was found on. For example:

    https-scout https://mysite.com

might output:

    https://mysite.com http://google.com
    https://mysite.com http://facebook.com
    https://mysite.com/contact http://facebook.com

Broken links and other errors are reported on stderr.

'https-scout --parallel 5 --delay 1000' means at most 5 requests per second.";

// All options of the https-scout binary
#[derive(Parser, Debug)]
#[command(name = "https-scout", version, about = ABOUT, long_about = LONG_ABOUT)]
pub struct Cli {
    /// One or more URLs to crawl. A missing scheme defaults to https://
    #[arg(value_name = "URL", required = true)]
    pub urls: Vec<String>,

    /// How many levels of pages to crawl. 1 = only the given URLs, 0 = no limit
    #[arg(long, default_value_t = 0)]
    pub depth: usize,

    /// How many pages are fetched in parallel. Must be at least 1
    #[arg(long, default_value_t = crate::crawl::DEFAULT_PARALLEL)]
    pub parallel: usize,

    /// Pause in milliseconds each worker takes after fetching a page
    #[arg(long, value_name = "MILLIS", default_value_t = 1000)]
    pub delay: u64,

    /// Stop crawling new pages after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Slack incoming webhook. If set, results are also posted to Slack
    #[arg(long, value_name = "WEBHOOK_URL")]
    pub slack: Option<String>,

    /// Overrides the webhook's default user name
    #[arg(long, requires = "slack")]
    pub slack_username: Option<String>,

    /// Overrides the webhook's default channel
    #[arg(long, requires = "slack")]
    pub slack_channel: Option<String>,

    /// Overrides the webhook's default icon, e.g. :lock:
    #[arg(long, requires = "slack")]
    pub slack_icon_emoji: Option<String>,

    /// Print every request before it is made, and debug logs
    #[arg(short, long)]
    pub verbose: bool,
}
