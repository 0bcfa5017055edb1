// src/fetch/mod.rs
// =============================================================================
// This module is everything the crawler needs from the outside web.
//
// Submodules:
// - http: The real network implementation, built on reqwest
// - html: Pulls href values out of an HTML page with scraper
//
// The crawler never talks to reqwest directly. It only sees the `Fetch`
// trait below, so tests can hand it a fake web that lives in memory.
//
// Rust concepts:
// - Traits: A shared interface different types can implement
// - async-trait: Lets a trait have async methods and still be used as
//   `dyn Fetch` behind an Arc
// =============================================================================

mod html;
mod http;

pub use html::extract_hrefs;
pub use http::HttpFetcher;

use async_trait::async_trait;
use url::Url;

// What a GET request gives back after all redirects were followed
#[derive(Debug, Clone)]
pub struct Page {
    /// HTTP status code of the last response
    pub status: u16,
    /// Where we ended up after redirects
    pub final_url: Url,
    /// Response body as text
    pub body: String,
}

// The HTTP fetch capability.
//
// `get` performs a GET, follows redirects and reports the final URL.
// `Err` means the request never produced a response at all (DNS, TLS,
// refused connection, timeout). A 404 is still `Ok` with status 404.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn get(&self, url: &Url) -> anyhow::Result<Page>;

    // Only the status code is needed for HTTPS probes.
    // Implementations can override this to skip downloading the body.
    async fn status(&self, url: &Url) -> anyhow::Result<u16> {
        Ok(self.get(url).await?.status)
    }
}
