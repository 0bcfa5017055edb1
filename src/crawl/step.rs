// src/crawl/step.rs
// =============================================================================
// What happens to one task. This is the heart of the crawler.
//
// For a task (url, parent, depth):
// 1. The link is external when its host differs from the parent page's host
// 2. External http:// link? Try the https:// version first.
//    - Works (status < 400): report it as an upgrade and stop right here.
//      The insecure page is never fetched.
//    - Fails: carry on with the original http:// URL
// 3. Fetch the URL. Network failure or status >= 400 is a CrawlError.
// 4. A redirect to another host makes the page external too
// 5. External pages and pages at the last depth level are not explored
// 6. Otherwise every http/https link on the page becomes a child task
//
// Nothing in here touches shared state. The worker decides what to do
// with the Outcome.
// =============================================================================

use super::normalize::{same_host, to_urls};
use super::{Task, Upgrade};
use crate::error::{CrawlError, FetchFailure, InvalidUrls};
use crate::fetch::{extract_hrefs, Fetch};
use tracing::debug;

// Everything a single step produced
#[derive(Debug, Default)]
pub struct Outcome {
    /// Set when an external http:// link also works over https://
    pub upgrade: Option<Upgrade>,
    /// Links to crawl next
    pub children: Vec<Task>,
    /// Set when the page could not be fetched
    pub error: Option<CrawlError>,
    /// Links on the page that were not valid URLs
    pub invalid_links: Option<InvalidUrls>,
}

pub async fn step(fetcher: &dyn Fetch, task: &Task) -> Outcome {
    let mut is_external = match &task.parent {
        Some(parent) => !same_host(&task.url, parent),
        None => false,
    };

    if is_external && task.url.scheme() == "http" {
        if let Some(upgrade) = probe_https(fetcher, task).await {
            return Outcome {
                upgrade: Some(upgrade),
                ..Outcome::default()
            };
        }
    }

    let page = match fetcher.get(&task.url).await {
        Ok(page) => page,
        Err(e) => return failed(task, FetchFailure::Unreachable(format!("{:#}", e))),
    };

    if page.status >= 400 {
        return failed(task, FetchFailure::Status(page.status));
    }

    // Stop when a redirect took us to a different site
    if !same_host(&page.final_url, &task.url) {
        debug!(url = %task.url, final_url = %page.final_url, "redirected to another host");
        is_external = true;
    }

    if is_external || task.depth.is_last() {
        return Outcome::default();
    }

    // Relative links are resolved against where the page actually lives
    let base = page.final_url;
    let hrefs = extract_hrefs(&page.body);
    let (urls, invalid_links) = to_urls(&hrefs, |href| base.join(href));

    let depth = task.depth.child();
    let children = urls
        .into_iter()
        .map(|url| Task {
            url,
            parent: Some(task.url.clone()),
            depth,
        })
        .collect();

    Outcome {
        children,
        invalid_links,
        ..Outcome::default()
    }
}

// Tries the https:// variant of an external http:// link
//
// Returns the upgrade on success. Any failure is only logged, the caller
// falls back to fetching the insecure URL.
async fn probe_https(fetcher: &dyn Fetch, task: &Task) -> Option<Upgrade> {
    let parent = task.parent.clone()?;

    let mut secure = task.url.clone();
    // http -> https is always allowed by the url crate, both are special schemes
    secure.set_scheme("https").ok()?;

    match fetcher.status(&secure).await {
        Ok(status) if status < 400 => Some(Upgrade {
            page: parent,
            link: task.url.clone(),
        }),
        Ok(status) => {
            debug!(url = %secure, status, "https probe rejected");
            None
        }
        Err(e) => {
            debug!(url = %secure, error = %e, "https probe failed");
            None
        }
    }
}

fn failed(task: &Task, failure: FetchFailure) -> Outcome {
    Outcome {
        error: Some(CrawlError {
            url: task.url.clone(),
            parent: task.parent.clone(),
            failure,
        }),
        ..Outcome::default()
    }
}
