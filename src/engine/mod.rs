//! Crawl engine: worker pool, dispatch, and error disposition
//!
//! The engine owns nothing clever itself. It seeds the frontier, spawns the
//! worker threads, and runs each dispatched URL through the pipeline,
//! translating pipeline errors into dispositions: record and continue for
//! expected failures, drain the whole crawl for unexpected ones.

mod pipeline;
mod scheduler;

pub use scheduler::Scheduler;

use crate::dedup::DuplicateDetector;
use crate::fetch::Fetcher;
use crate::frontier::Frontier;
use crate::parse::Parser;
use crate::policy::FollowPolicy;
use crate::politeness::{Robots, Throttle};
use crate::sink::{ErrorSink, ResultSink};
use crate::url::NormalizedUrl;
use crate::{ErrorKind, Result};
use std::sync::Arc;
use std::thread;

/// Everything a worker needs, threaded explicitly rather than reached for
/// globally. Every component is shared and internally synchronized.
pub struct CrawlContext {
    pub frontier: Arc<dyn Frontier>,
    pub robots: Arc<dyn Robots>,
    pub throttle: Arc<dyn Throttle>,
    pub detector: Arc<dyn DuplicateDetector>,
    pub policy: Arc<dyn FollowPolicy>,
    pub parsers: Vec<Arc<dyn Parser>>,
    pub sink: Arc<dyn ResultSink>,
    pub errors: Arc<dyn ErrorSink>,
    pub fetcher: Arc<Fetcher>,
}

pub struct Engine {
    ctx: CrawlContext,
    scheduler: Arc<Scheduler>,
    workers: usize,
}

impl Engine {
    pub fn new(ctx: CrawlContext, workers: usize) -> Self {
        Self {
            ctx,
            scheduler: Arc::new(Scheduler::new(workers)),
            workers,
        }
    }

    /// Requests a graceful drain: in-flight URLs finish, then the pool exits.
    pub fn stop(&self) {
        self.scheduler.stop();
    }

    /// Cloneable handle for requesting the drain from another thread
    /// (signal handlers and the like).
    pub fn stop_handle(&self) -> Arc<Scheduler> {
        Arc::clone(&self.scheduler)
    }

    /// Seeds the frontier and runs the crawl to completion on a fixed pool
    /// of OS threads. Returns once every worker has exited.
    pub fn run(&self, seeds: &[NormalizedUrl]) -> Result<()> {
        for seed in seeds {
            self.ctx.frontier.add(seed)?;
        }
        tracing::info!(seeds = seeds.len(), workers = self.workers, "crawl started");

        thread::scope(|scope| -> std::io::Result<()> {
            for id in 0..self.workers {
                thread::Builder::new()
                    .name(format!("crawl-{id}"))
                    .spawn_scoped(scope, move || self.worker(id))?;
            }
            Ok(())
        })?;

        tracing::info!("crawl finished");
        Ok(())
    }

    fn worker(&self, id: usize) {
        loop {
            let url = match self.scheduler.acquire_next(self.ctx.frontier.as_ref()) {
                Ok(Some(url)) => url,
                Ok(None) => break,
                Err(err) => {
                    tracing::error!(worker = id, %err, "frontier failure, draining");
                    self.scheduler.stop();
                    break;
                }
            };
            tracing::debug!(worker = id, url = %url, "dispatched");
            let outcome = pipeline::crawl_one(&self.ctx, &url);
            self.scheduler.release(&url);

            if let Err(err) = outcome {
                let kind = err.kind();
                match kind {
                    // Not failures: the URL was judged out of scope or
                    // already covered.
                    ErrorKind::Policy | ErrorKind::Frontier => {
                        tracing::debug!(url = %url, %err, "skipped");
                    }
                    ErrorKind::Politeness | ErrorKind::Content | ErrorKind::Transport => {
                        self.ctx.errors.record(&url, kind, &err.to_string());
                    }
                    ErrorKind::Fatal => {
                        tracing::error!(url = %url, %err, "unexpected failure, draining");
                        self.ctx.errors.record(&url, kind, &err.to_string());
                        self.scheduler.stop();
                    }
                }
            }
        }
        tracing::debug!(worker = id, "worker exiting");
    }
}
