// src/fetch/http.rs
// =============================================================================
// The real HTTP fetcher, built on reqwest.
//
// Key functionality:
// - GET requests that follow redirects (up to 10)
// - Reports the final URL so the crawler can notice redirects to other sites
// - HTTPS probes only look at the status code and never download the body
//
// Rust concepts:
// - async/await: For network I/O
// - Trait implementations: HttpFetcher implements our Fetch trait
// - Client cloning: reqwest::Client is an Arc inside, cheap to clone
// =============================================================================

use super::{Fetch, Page};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

// How long one request may take before we give up on it
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// How many redirects we follow before reqwest reports an error
const MAX_REDIRECTS: usize = 10;

// Fetches pages over the real network
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    // Builds a fetcher with our default client settings
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn get(&self, url: &Url) -> anyhow::Result<Page> {
        let response = self.client.get(url.clone()).send().await?;

        // Grab these before text() consumes the response
        let status = response.status().as_u16();
        let final_url = response.url().clone();

        let body = response.text().await?;

        Ok(Page {
            status,
            final_url,
            body,
        })
    }

    async fn status(&self, url: &Url) -> anyhow::Result<u16> {
        // Dropping the response without reading it closes the connection,
        // so the body is never downloaded
        let response = self.client.get(url.clone()).send().await?;
        Ok(response.status().as_u16())
    }
}
