// src/error.rs
// =============================================================================
// Error types shared by the crawler.
//
// There are two very different kinds of errors here:
// - ConfigError: something is wrong before we even start. Returned from
//   Crawler::run() and makes the program exit with code 1.
// - CrawlError: one page could not be fetched. These are never returned,
//   they are written to the error sink and the crawl keeps going.
//
// Rust concepts:
// - thiserror: derive Display + std::error::Error from attributes
// - impl Display by hand when the message needs a bit of logic
// =============================================================================

use std::fmt;
use thiserror::Error;
use url::Url;

// Errors that stop a crawl before any page is fetched
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The site list was empty
    #[error("no sites given")]
    NoSites,

    /// At least one seed could not be parsed as a URL
    #[error(transparent)]
    InvalidSeeds(#[from] InvalidUrls),

    /// Every seed used a scheme we don't crawl (mailto:, ftp:, ...)
    #[error("no valid sites given, only http and https are supported")]
    NoValidSites,

    /// Parallelism was explicitly set to zero
    #[error("parallel must be at least 1")]
    ZeroParallel,

    /// The default HTTP client could not be built
    #[error("failed to create HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

// A list of strings that failed to parse, reported as one message
//
// Example:
//   invalid URLs: http://[::1 (invalid IPv6 address), :foo (relative URL without a base)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid URLs: {}", join_invalid(.0))]
pub struct InvalidUrls(pub Vec<(String, String)>);

fn join_invalid(invalids: &[(String, String)]) -> String {
    invalids
        .iter()
        .map(|(input, reason)| format!("{} ({})", input, reason))
        .collect::<Vec<_>>()
        .join(", ")
}

// Why fetching a page failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    /// Transport level problem: DNS, TLS, connection refused, timeout...
    Unreachable(String),
    /// The server answered with a status >= 400
    Status(u16),
}

// One page that could not be crawled
//
// Display output matches what users see on stderr:
//   404 http://site.test/missing on page http://site.test/
//   failed to get http://down.test/: connection refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlError {
    pub url: Url,
    pub parent: Option<Url>,
    pub failure: FetchFailure,
}

impl fmt::Display for CrawlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.failure {
            FetchFailure::Unreachable(reason) => write!(f, "failed to get {}: {}", self.url, reason)?,
            FetchFailure::Status(status) => write!(f, "{} {}", status, self.url)?,
        }
        if let Some(parent) = &self.parent {
            write!(f, " on page {}", parent)?;
        }
        Ok(())
    }
}

impl std::error::Error for CrawlError {}
