// src/crawl/worker.rs
// =============================================================================
// The worker pool.
//
// Every worker runs the same loop:
// 1. accept() the next task from the frontier (None = crawl finished)
// 2. run the step for it
// 3. send the upgrade (if any) to the result writer
// 4. send errors to the error writer, tagged with the page they were on
// 5. settle() the task with its children
// 6. sleep for the configured delay
//
// Workers never share anything but channel senders.
// =============================================================================

use super::frontier::FrontierHandle;
use super::step::step;
use super::Upgrade;
use crate::fetch::Fetch;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn, Instrument};

// What every worker needs, cloned once per worker
#[derive(Clone)]
pub struct WorkerContext {
    pub fetcher: Arc<dyn Fetch>,
    pub frontier: FrontierHandle,
    pub results: mpsc::UnboundedSender<Upgrade>,
    pub errors: mpsc::UnboundedSender<String>,
    pub delay: Duration,
    pub verbose: bool,
}

// Counters one worker reports back when it exits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub pages: usize,
    pub errors: usize,
}

impl std::ops::Add for WorkerStats {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            pages: self.pages + other.pages,
            errors: self.errors + other.errors,
        }
    }
}

// Runs `count` workers until the frontier closes, then adds up their stats
pub async fn run_pool(count: usize, context: WorkerContext) -> WorkerStats {
    let handles: Vec<_> = (0..count)
        .map(|id| {
            let context = context.clone();
            tokio::spawn(work(context).instrument(tracing::debug_span!("worker", id)))
        })
        .collect();

    // The pool's own copy must not keep any channel alive
    drop(context);

    join_all(handles)
        .await
        .into_iter()
        .fold(WorkerStats::default(), |total, joined| match joined {
            Ok(stats) => total + stats,
            Err(e) => {
                warn!(error = %e, "worker task failed");
                total
            }
        })
}

async fn work(context: WorkerContext) -> WorkerStats {
    let mut stats = WorkerStats::default();

    while let Some(task) = context.frontier.accept().await {
        if context.verbose {
            report(&context.errors, format!("verbose: GET {}", task.url));
        }
        debug!(url = %task.url, depth = ?task.depth, "crawling");

        let outcome = step(context.fetcher.as_ref(), &task).await;
        stats.pages += 1;

        if let Some(upgrade) = outcome.upgrade {
            if context.results.send(upgrade).is_err() {
                warn!("result writer stopped, upgrade dropped");
            }
        }

        if let Some(error) = outcome.error {
            stats.errors += 1;
            report(&context.errors, error.to_string());
        }

        if let Some(invalid) = outcome.invalid_links {
            report(&context.errors, format!("page {}: {}", task.url, invalid));
        }

        context.frontier.settle(outcome.children);

        if !context.delay.is_zero() {
            tokio::time::sleep(context.delay).await;
        }
    }

    debug!(pages = stats.pages, "worker finished");
    stats
}

fn report(errors: &mpsc::UnboundedSender<String>, line: String) {
    if errors.send(line).is_err() {
        warn!("error writer stopped, line dropped");
    }
}
