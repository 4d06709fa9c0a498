//! Crawl frontier: discovered-but-not-yet-fetched URLs plus the seen registry
//!
//! The frontier is a pluggable component. [`MemoryFrontier`] is the default
//! in-process implementation; `storage::SqliteStore` is a database-backed
//! alternative.

mod memory;

pub use memory::MemoryFrontier;

use crate::url::NormalizedUrl;
use crate::Result;

/// Monotonic bookkeeping counters maintained by a frontier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrontierCounters {
    /// Link edges registered via `add_link`
    pub links: u64,
    /// Redirect edges registered via `add_redirect`
    pub redirects: u64,
    /// Duplicate URLs reported by `check`
    pub repeats: u64,
}

/// Store of URLs to crawl and URLs already seen.
///
/// A URL enters the seen registry at most once; the membership test and the
/// insertion are a single atomic operation. `next` never blocks: emptiness is
/// reported to the caller, which decides whether to wait.
pub trait Frontier: Send + Sync {
    /// Inserts the URL if it has not been seen, and auto-schedules the
    /// domain's robots.txt URL the first time the domain appears. Already-seen
    /// URLs are ignored.
    fn add(&self, url: &NormalizedUrl) -> Result<()>;

    /// Registers a link edge from `source` to `target`. `source` must already
    /// be seen, or be the recorded redirect target of a seen URL.
    fn add_link(&self, source: &NormalizedUrl, target: &NormalizedUrl) -> Result<()>;

    /// Registers a redirect edge from `source` to `target`. `source` must
    /// already be seen.
    fn add_redirect(&self, source: &NormalizedUrl, target: &NormalizedUrl) -> Result<()>;

    /// Fails with `DuplicateUrl` if the URL has been seen; otherwise a no-op.
    /// Never inserts.
    fn check(&self, url: &NormalizedUrl) -> Result<()>;

    /// Returns a URL to fetch, or `None` if nothing is pending. Queued
    /// robots.txt URLs are returned ahead of any content URL; among content
    /// URLs the selection order is unspecified (uniqueness is the only
    /// guarantee).
    fn next(&self) -> Result<Option<NormalizedUrl>>;

    /// Snapshot of the bookkeeping counters.
    fn counters(&self) -> FrontierCounters;
}
