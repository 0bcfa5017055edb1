// src/crawl/normalize.rs
// =============================================================================
// Turns raw strings (seed arguments, href values) into crawlable URLs.
//
// Rules:
// - Only http:// and https:// survive. mailto:, javascript:, tel:, ftp:...
//   are dropped quietly, they are not errors.
// - Strings that don't parse at all are collected and reported together
//   in one InvalidUrls error.
// - Fragments are removed. `page#intro` and `page` are the same page, and
//   the fragment is never sent to the server anyway.
// - Seeds without a scheme default to https.
// =============================================================================

use crate::error::InvalidUrls;
use url::{ParseError, Url};

// Parses every link with `parse` and keeps the http/https ones
//
// Parameters:
//   links: the raw strings
//   parse: how to turn one string into a Url. Seeds use parse_seed,
//          links found on a page use `|s| page.join(s)` so relative
//          links are resolved against that page.
//
// Returns: (valid URLs in input order, every string that failed to parse)
pub fn to_urls<I, S, F>(links: I, parse: F) -> (Vec<Url>, Option<InvalidUrls>)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
    F: Fn(&str) -> Result<Url, ParseError>,
{
    let mut urls = Vec::new();
    let mut invalids = Vec::new();

    for link in links {
        let link = link.as_ref();
        match parse(link) {
            Ok(mut url) => {
                if is_crawlable(&url) {
                    url.set_fragment(None);
                    urls.push(url);
                }
            }
            Err(e) => invalids.push((link.to_string(), e.to_string())),
        }
    }

    let invalids = if invalids.is_empty() {
        None
    } else {
        Some(InvalidUrls(invalids))
    };
    (urls, invalids)
}

// Parses a seed given on the command line
//
// "example.com/docs" has no scheme, so the url crate rejects it as a
// relative URL. We retry it as "https://example.com/docs".
pub fn parse_seed(seed: &str) -> Result<Url, ParseError> {
    match Url::parse(seed) {
        Err(ParseError::RelativeUrlWithoutBase) => Url::parse(&format!("https://{}", seed)),
        other => other,
    }
}

fn is_crawlable(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

// True when both URLs point at the same host and port
pub fn same_host(a: &Url, b: &Url) -> bool {
    a.host_str() == b.host_str() && a.port() == b.port()
}
