// src/crawl/mod.rs
// =============================================================================
// This module crawls websites looking for links that can move to HTTPS.
//
// How a run fits together:
//
//   seeds --normalize--> Frontier --accept--> Worker x N --step--> Outcome
//                            ^                    |
//                            +------settle--------+--> result writer (stdout)
//                                                 +--> error writer  (stderr)
//
// - normalize: strings -> http/https URLs
// - frontier:  dedup + counting of pending work, closes when it hits zero
// - step:      what happens to one page
// - worker:    the pool that drains the frontier
// - sink:      the single owners of the output and error writers
//
// Only configuration problems are returned as errors. Anything that goes
// wrong while crawling is written to the error writer and the run still
// succeeds.
// =============================================================================

mod frontier;
mod normalize;
mod sink;
mod step;
mod worker;

#[cfg(test)]
mod testing;

pub use sink::{SharedBuffer, Tee};

use frontier::{Frontier, FrontierStats};
use normalize::{parse_seed, to_urls};

use crate::error::ConfigError;
use crate::fetch::{Fetch, HttpFetcher};
use std::fmt;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};
use url::Url;
use worker::{run_pool, WorkerContext, WorkerStats};

// Used when `parallel` is not set
pub const DEFAULT_PARALLEL: usize = 10;

// How many more levels of links a task may follow
//
// `Unlimited` stays `Unlimited` forever, so it never reaches the last
// level no matter how deep the crawl goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    Unlimited,
    Remaining(usize),
}

impl Depth {
    // 0 means no limit, like the --depth flag
    pub fn limit(levels: usize) -> Self {
        if levels == 0 {
            Depth::Unlimited
        } else {
            Depth::Remaining(levels)
        }
    }

    // Depth for links found on a page at this depth
    pub fn child(self) -> Self {
        match self {
            Depth::Unlimited => Depth::Unlimited,
            Depth::Remaining(n) => Depth::Remaining(n.saturating_sub(1)),
        }
    }

    // True when links on this page must not be followed
    pub fn is_last(self) -> bool {
        matches!(self, Depth::Remaining(n) if n <= 1)
    }
}

// One page to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub url: Url,
    /// Page the link was found on. None for seeds.
    pub parent: Option<Url>,
    pub depth: Depth,
}

// An http:// link that also works over https://
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upgrade {
    /// Page the link was found on
    pub page: Url,
    /// The insecure link itself
    pub link: Url,
}

// Printed as one output line: `<page> <link>`
impl fmt::Display for Upgrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.page, self.link)
    }
}

// What a finished run reports back
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    /// Tasks handed to workers, one step each
    pub dispatched: usize,
    /// Links skipped because they were already crawled
    pub duplicates: usize,
    /// Links skipped because of a timeout
    pub retired_unvisited: usize,
    /// Pending counter when the frontier stopped, 0 unless something is badly wrong
    pub pending_at_close: usize,
    /// Upgrade lines written to the output
    pub results: usize,
    /// Pages that could not be fetched
    pub errors: usize,
}

// Crawl configuration
//
// Example:
//   let summary = Crawler {
//       sites: vec!["https://example.com".into()],
//       depth: 2,
//       ..Crawler::default()
//   }
//   .run(std::io::stdout(), std::io::stderr())
//   .await?;
#[derive(Clone)]
pub struct Crawler {
    /// At least one URL. A missing scheme defaults to https.
    pub sites: Vec<String>,
    /// How many levels of pages to crawl. 0 = unlimited.
    pub depth: usize,
    /// Number of workers. None = DEFAULT_PARALLEL, Some(0) is an error.
    pub parallel: Option<usize>,
    /// Pause of every worker after each page
    pub delay: Duration,
    /// Write `verbose: GET <url>` to the error writer before each page
    pub verbose: bool,
    /// Stop taking new pages after this long, finish the ones in flight
    pub timeout: Option<Duration>,
    /// HTTP implementation. None = HttpFetcher with default settings.
    pub fetcher: Option<Arc<dyn Fetch>>,
}

impl Default for Crawler {
    fn default() -> Self {
        Self {
            sites: Vec::new(),
            depth: 0,
            parallel: None,
            delay: Duration::ZERO,
            verbose: false,
            timeout: None,
            fetcher: None,
        }
    }
}

impl fmt::Debug for Crawler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Crawler")
            .field("sites", &self.sites)
            .field("depth", &self.depth)
            .field("parallel", &self.parallel)
            .field("delay", &self.delay)
            .field("verbose", &self.verbose)
            .field("timeout", &self.timeout)
            .field("fetcher", &self.fetcher.as_ref().map(|_| "custom"))
            .finish()
    }
}

impl Crawler {
    // Crawls all sites and reports every external http:// link that can
    // be changed to https://
    //
    // Parameters:
    //   out: receives one `<page> <link>` line per upgrade
    //   log: receives crawl errors, one per line
    //
    // Returns: a Summary once every worker has stopped, or a ConfigError
    // before anything was fetched
    pub async fn run<O, L>(self, out: O, log: L) -> Result<Summary, ConfigError>
    where
        O: Write + Send + 'static,
        L: Write + Send + 'static,
    {
        let parallel = self.parallel()?;
        let seeds = self.seeds()?;
        let fetcher: Arc<dyn Fetch> = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(HttpFetcher::new()?),
        };

        info!(seeds = seeds.len(), parallel, depth = self.depth, "starting crawl");

        let (error_tx, error_rx) = mpsc::unbounded_channel();
        let (result_tx, result_rx) = mpsc::unbounded_channel();
        let error_writer = sink::spawn_error_writer(log, error_rx);
        let result_writer = sink::spawn_result_writer(out, result_rx, error_tx.clone());

        let (frontier, frontier_join) = Frontier::spawn();
        let depth = Depth::limit(self.depth);
        frontier.submit(
            seeds
                .into_iter()
                .map(|url| Task {
                    url,
                    parent: None,
                    depth,
                })
                .collect(),
        );

        let timer = self.timeout.map(|timeout| {
            let frontier = frontier.clone();
            let errors = error_tx.clone();
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                warn!(?timeout, "crawl timed out");
                let _ = errors.send(format!(
                    "crawl timed out after {:?}; stopped accepting new pages",
                    timeout
                ));
                frontier.shutdown();
            })
        });

        let context = WorkerContext {
            fetcher,
            frontier: frontier.clone(),
            results: result_tx,
            errors: error_tx,
            delay: self.delay,
            verbose: self.verbose,
        };
        let workers = run_pool(parallel, context).await;

        // Workers are gone. Drop the remaining frontier handles so the actor
        // can stop, then let the writers drain their channels.
        if let Some(timer) = timer {
            timer.abort();
            let _ = timer.await;
        }
        drop(frontier);

        let stats = frontier_join.await.unwrap_or_else(|e| {
            warn!(error = %e, "frontier task failed");
            FrontierStats::default()
        });
        let results = result_writer.await.unwrap_or_else(|e| {
            warn!(error = %e, "result writer failed");
            0
        });
        if let Err(e) = error_writer.await {
            warn!(error = %e, "error writer failed");
        }

        let WorkerStats { errors, .. } = workers;
        Ok(Summary {
            dispatched: stats.dispatched,
            duplicates: stats.duplicates,
            retired_unvisited: stats.retired_unvisited,
            pending_at_close: stats.pending_at_close,
            results,
            errors,
        })
    }

    fn parallel(&self) -> Result<usize, ConfigError> {
        match self.parallel {
            None => Ok(DEFAULT_PARALLEL),
            Some(0) => Err(ConfigError::ZeroParallel),
            Some(n) => Ok(n),
        }
    }

    fn seeds(&self) -> Result<Vec<Url>, ConfigError> {
        if self.sites.is_empty() {
            return Err(ConfigError::NoSites);
        }
        let (urls, invalid) = to_urls(&self.sites, parse_seed);
        if let Some(invalid) = invalid {
            return Err(ConfigError::InvalidSeeds(invalid));
        }
        if urls.is_empty() {
            return Err(ConfigError::NoValidSites);
        }
        Ok(urls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::testing::FakeWeb;

    async fn crawl(web: &Arc<FakeWeb>, crawler: Crawler) -> (Summary, String, String) {
        let out = SharedBuffer::default();
        let log = SharedBuffer::default();
        let crawler = Crawler {
            fetcher: Some(web.clone() as Arc<dyn Fetch>),
            ..crawler
        };
        let summary = crawler.run(out.clone(), log.clone()).await.unwrap();
        (summary, out.contents(), log.contents())
    }

    fn sites(urls: &[&str]) -> Vec<String> {
        urls.iter().map(|s| s.to_string()).collect()
    }

    fn sorted_lines(text: &str) -> Vec<&str> {
        let mut lines: Vec<_> = text.lines().collect();
        lines.sort_unstable();
        lines
    }

    // A small site with every kind of link, modelled on a real crawl:
    // internal pages, a 404, an external redirect, secure and insecure
    // external links, and links we must ignore.
    fn small_site() -> FakeWeb {
        FakeWeb::new()
            .page(
                "http://site.test/base",
                r#"
                <a href="http://site.test/base">self</a>
                <a href="http://tls.test/page-a">upgradable</a>
                <a href="https://tls.test/page-b">already secure</a>
                <a href="http://plain.test/page-a">not upgradable</a>
                <a href="http://site.test/404">missing</a>
                <a href="/empty-sub">empty</a>
                <a href="/redirect">leaves the site</a>
                <a href="http://site.test/sub">sub</a>
                <a href="mailto:hi@site.test">mail</a>
                <a href="javascript:alert('hi')">js</a>
                "#,
            )
            .page(
                "http://site.test/sub",
                r#"
                <a href="sub/sub">deeper</a>
                <a href="http://tls.test/page-c">upgradable</a>
                <a href="http://plain.test/page-b">not upgradable</a>
                <a href="http://plain.test/404">missing external</a>
                <a href="https://tls.test/404">missing secure</a>
                "#,
            )
            .page("http://site.test/empty-sub", "")
            .page("http://site.test/sub/sub", "")
            .status("http://site.test/404", 404)
            .redirect("http://site.test/redirect", "http://plain.test/redirect-target")
            .page("http://plain.test/redirect-target", r#"<a href="/no-follow">x</a>"#)
            .page("http://plain.test/page-a", "")
            .page("http://plain.test/page-b", "")
            .status("http://plain.test/404", 404)
            .page("https://tls.test/page-a", "")
            .page("https://tls.test/page-b", "")
            .page("https://tls.test/page-c", "")
            .status("https://tls.test/404", 404)
    }

    #[tokio::test]
    async fn test_full_crawl_reports_upgrades_and_errors() {
        let web = Arc::new(small_site().latency(Duration::from_millis(2)));

        let (summary, out, log) = crawl(
            &web,
            Crawler {
                sites: sites(&["http://site.test/base"]),
                ..Crawler::default()
            },
        )
        .await;

        assert_eq!(
            sorted_lines(&out),
            vec![
                "http://site.test/base http://tls.test/page-a",
                "http://site.test/sub http://tls.test/page-c",
            ]
        );
        assert_eq!(
            sorted_lines(&log),
            vec![
                "404 http://plain.test/404 on page http://site.test/sub",
                "404 http://site.test/404 on page http://site.test/base",
                "404 https://tls.test/404 on page http://site.test/sub",
            ]
        );

        // Every page exactly once, insecure upgradable pages never
        for (url, hits) in web.all_hits() {
            assert_eq!(hits, 1, "{} fetched {} times", url, hits);
        }
        assert_eq!(web.hits("http://tls.test/page-a"), 0);
        assert_eq!(web.hits("http://tls.test/page-c"), 0);
        assert_eq!(web.hits("http://plain.test/no-follow"), 0);

        assert_eq!(summary.results, 2);
        assert_eq!(summary.errors, 3);
        assert_eq!(summary.duplicates, 1);
        assert_eq!(summary.pending_at_close, 0);
    }

    #[tokio::test]
    async fn test_depth_one_fetches_only_the_seeds() {
        let web = Arc::new(small_site());

        let (summary, out, log) = crawl(
            &web,
            Crawler {
                sites: sites(&["http://site.test/base"]),
                depth: 1,
                ..Crawler::default()
            },
        )
        .await;

        assert!(out.is_empty());
        assert!(log.is_empty());
        assert_eq!(summary.dispatched, 1);
        assert_eq!(web.all_hits().len(), 1);
    }

    #[tokio::test]
    async fn test_depth_two_stops_after_the_first_hop() {
        let web = Arc::new(small_site());

        let (summary, out, _log) = crawl(
            &web,
            Crawler {
                sites: sites(&["http://site.test/base"]),
                depth: 2,
                parallel: Some(1),
                ..Crawler::default()
            },
        )
        .await;

        assert_eq!(out, "http://site.test/base http://tls.test/page-a\n");
        // Linked from base, so fetched, but its own links are not followed
        assert_eq!(web.hits("http://site.test/sub"), 1);
        assert_eq!(web.hits("http://site.test/sub/sub"), 0);
        assert_eq!(web.hits("https://tls.test/page-c"), 0);
        assert_eq!(summary.pending_at_close, 0);
    }

    #[tokio::test]
    async fn test_verbose_logs_every_fetch_in_order_with_one_worker() {
        let web = Arc::new(
            FakeWeb::new()
                .page("https://site.test/", r#"<a href="/a">a</a><a href="/b">b</a>"#)
                .page("https://site.test/a", "")
                .status("https://site.test/b", 500),
        );

        let (_summary, _out, log) = crawl(
            &web,
            Crawler {
                sites: sites(&["site.test"]),
                parallel: Some(1),
                verbose: true,
                ..Crawler::default()
            },
        )
        .await;

        assert_eq!(
            log,
            "verbose: GET https://site.test/\n\
             verbose: GET https://site.test/a\n\
             verbose: GET https://site.test/b\n\
             500 https://site.test/b on page https://site.test/\n"
        );
    }

    #[tokio::test]
    async fn test_page_linking_to_itself_is_fetched_once() {
        let web = Arc::new(FakeWeb::new().page(
            "https://site.test/page",
            r#"<a href="/page">again</a><a href="https://site.test/page#top">and again</a>"#,
        ));

        let (summary, _out, _log) = crawl(
            &web,
            Crawler {
                sites: sites(&["https://site.test/page", "https://site.test/page"]),
                ..Crawler::default()
            },
        )
        .await;

        assert_eq!(web.hits("https://site.test/page"), 1);
        assert_eq!(summary.dispatched, 1);
        assert_eq!(summary.duplicates, 3);
        assert_eq!(summary.pending_at_close, 0);
    }

    #[tokio::test]
    async fn test_cyclic_site_terminates_with_many_workers() {
        // Every page links to every other page
        let pages: Vec<String> = (0..20).map(|i| format!("https://ring.test/{}", i)).collect();
        let body: String = pages.iter().map(|p| format!(r#"<a href="{}">x</a>"#, p)).collect();
        let web = pages
            .iter()
            .fold(FakeWeb::new(), |web, page| web.page(page, &body))
            .latency(Duration::from_millis(1));
        let web = Arc::new(web);

        let (summary, _out, log) = crawl(
            &web,
            Crawler {
                sites: sites(&["https://ring.test/0"]),
                parallel: Some(8),
                ..Crawler::default()
            },
        )
        .await;

        assert!(log.is_empty());
        assert_eq!(summary.dispatched, 20);
        assert_eq!(summary.duplicates, 20 * 20 - 19);
        assert_eq!(summary.pending_at_close, 0);
        for page in &pages {
            assert_eq!(web.hits(page), 1);
        }
    }

    #[tokio::test]
    async fn test_unsupported_links_are_never_fetched_or_logged() {
        let web = Arc::new(FakeWeb::new().page(
            "https://site.test/",
            r#"<a href="mailto:me@site.test">m</a><a href="javascript:void(0)">j</a><a href="tel:1">t</a>"#,
        ));

        let (summary, out, log) = crawl(
            &web,
            Crawler {
                sites: sites(&["https://site.test/"]),
                ..Crawler::default()
            },
        )
        .await;

        assert!(out.is_empty());
        assert!(log.is_empty());
        assert_eq!(summary.dispatched, 1);
    }

    #[tokio::test]
    async fn test_invalid_links_on_a_page_are_summarized() {
        let web = Arc::new(FakeWeb::new().page("https://site.test/", r#"<a href="http://[::1">bad</a>"#));

        let (_summary, _out, log) = crawl(
            &web,
            Crawler {
                sites: sites(&["https://site.test/"]),
                ..Crawler::default()
            },
        )
        .await;

        assert!(log.starts_with("page https://site.test/: invalid URLs: http://[::1 ("));
    }

    #[tokio::test]
    async fn test_timeout_stops_a_slow_crawl() {
        let pages: Vec<String> = (0..50).map(|i| format!("https://slow.test/{}", i)).collect();
        let body: String = pages.iter().map(|p| format!(r#"<a href="{}">x</a>"#, p)).collect();
        let web = pages
            .iter()
            .fold(FakeWeb::new(), |web, page| web.page(page, &body))
            .latency(Duration::from_millis(20));
        let web = Arc::new(web);

        let (summary, _out, log) = crawl(
            &web,
            Crawler {
                sites: sites(&["https://slow.test/0"]),
                parallel: Some(1),
                timeout: Some(Duration::from_millis(100)),
                ..Crawler::default()
            },
        )
        .await;

        assert!(log.starts_with("crawl timed out after"));
        assert!(summary.dispatched < 50);
        assert!(summary.retired_unvisited > 0);
        assert_eq!(summary.pending_at_close, 0);
    }

    #[tokio::test]
    async fn test_configuration_errors() {
        let run = |crawler: Crawler| async move {
            crawler
                .run(SharedBuffer::default(), SharedBuffer::default())
                .await
                .unwrap_err()
        };

        assert!(matches!(run(Crawler::default()).await, ConfigError::NoSites));

        let err = run(Crawler {
            sites: sites(&["https://ok.test", "http://[::1"]),
            ..Crawler::default()
        })
        .await;
        assert!(err.to_string().starts_with("invalid URLs: http://[::1 ("));

        let err = run(Crawler {
            sites: sites(&["mailto:me@site.test"]),
            ..Crawler::default()
        })
        .await;
        assert!(matches!(err, ConfigError::NoValidSites));

        let err = run(Crawler {
            sites: sites(&["https://ok.test"]),
            parallel: Some(0),
            ..Crawler::default()
        })
        .await;
        assert!(matches!(err, ConfigError::ZeroParallel));
    }

    #[test]
    fn test_unlimited_depth_never_becomes_last() {
        let mut depth = Depth::limit(0);
        for _ in 0..1000 {
            assert!(!depth.is_last());
            depth = depth.child();
        }
    }

    #[test]
    fn test_limited_depth_counts_down() {
        let depth = Depth::limit(3);
        assert!(!depth.is_last());
        assert!(!depth.child().is_last());
        assert!(depth.child().child().is_last());
    }
}
