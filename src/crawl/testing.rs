// src/crawl/testing.rs
// An in-memory web for crawler tests. Counts how often each URL was requested.

use crate::fetch::{Fetch, Page};
use anyhow::anyhow;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
enum Route {
    Page { status: u16, body: String },
    Redirect(String),
}

#[derive(Debug, Default)]
pub struct FakeWeb {
    routes: HashMap<String, Route>,
    hits: Mutex<HashMap<String, usize>>,
    latency: Duration,
}

fn key(url: &str) -> String {
    Url::parse(url).unwrap().to_string()
}

impl FakeWeb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, body: &str) -> Self {
        let route = Route::Page {
            status: 200,
            body: body.to_string(),
        };
        self.routes.insert(key(url), route);
        self
    }

    pub fn status(mut self, url: &str, status: u16) -> Self {
        let route = Route::Page {
            status,
            body: String::new(),
        };
        self.routes.insert(key(url), route);
        self
    }

    pub fn redirect(mut self, from: &str, to: &str) -> Self {
        self.routes.insert(key(from), Route::Redirect(key(to)));
        self
    }

    // Every request sleeps this long, so workers really overlap
    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn hits(&self, url: &str) -> usize {
        self.hits.lock().unwrap().get(&key(url)).copied().unwrap_or(0)
    }

    pub fn all_hits(&self) -> HashMap<String, usize> {
        self.hits.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetch for FakeWeb {
    async fn get(&self, url: &Url) -> anyhow::Result<Page> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let mut current = url.to_string();
        for _ in 0..10 {
            *self.hits.lock().unwrap().entry(current.clone()).or_default() += 1;

            match self.routes.get(&current) {
                Some(Route::Page { status, body }) => {
                    return Ok(Page {
                        status: *status,
                        final_url: Url::parse(&current)?,
                        body: body.clone(),
                    })
                }
                Some(Route::Redirect(to)) => current = to.clone(),
                None => return Err(anyhow!("connection refused")),
            }
        }
        Err(anyhow!("too many redirects"))
    }
}
