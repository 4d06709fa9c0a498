use crate::frontier::{Frontier, FrontierCounters};
use crate::url::NormalizedUrl;
use crate::{CrawlError, Result};
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

/// In-memory frontier, the default URL store for a crawl run.
///
/// One mutex guards the whole state so that the seen-set check and insertion
/// are atomic.
#[derive(Default)]
pub struct MemoryFrontier {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    /// Content URLs waiting to be handed out
    pending: Vec<NormalizedUrl>,
    /// robots.txt URLs, always served before content
    robots: VecDeque<NormalizedUrl>,
    /// Every URL ever admitted, content and robots alike
    seen: HashSet<NormalizedUrl>,
    /// Redirect targets; valid link sources even though never admitted
    redirected: HashSet<NormalizedUrl>,
    /// Rotates the pick point so content selection is not simple LIFO
    cursor: usize,
    counters: FrontierCounters,
}

impl MemoryFrontier {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Frontier for MemoryFrontier {
    fn add(&self, url: &NormalizedUrl) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.seen.insert(url.clone()) {
            inner.pending.push(url.clone());
        }
        let robots = url.robots_url();
        if inner.seen.insert(robots.clone()) {
            inner.robots.push_back(robots);
        }
        Ok(())
    }

    fn add_link(&self, source: &NormalizedUrl, _target: &NormalizedUrl) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        debug_assert!(
            inner.seen.contains(source) || inner.redirected.contains(source),
            "link source never handed out"
        );
        inner.counters.links += 1;
        Ok(())
    }

    fn add_redirect(&self, source: &NormalizedUrl, target: &NormalizedUrl) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        debug_assert!(
            inner.seen.contains(source),
            "redirect source never handed out"
        );
        inner.redirected.insert(target.clone());
        inner.counters.redirects += 1;
        Ok(())
    }

    fn check(&self, url: &NormalizedUrl) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.seen.contains(url) {
            inner.counters.repeats += 1;
            return Err(CrawlError::DuplicateUrl {
                url: url.to_string(),
            });
        }
        Ok(())
    }

    fn next(&self) -> Result<Option<NormalizedUrl>> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(url) = inner.robots.pop_front() {
            return Ok(Some(url));
        }
        if inner.pending.is_empty() {
            return Ok(None);
        }
        let i = inner.cursor % inner.pending.len();
        inner.cursor = inner.cursor.wrapping_add(1);
        Ok(Some(inner.pending.swap_remove(i)))
    }

    fn counters(&self) -> FrontierCounters {
        self.inner.lock().unwrap().counters
    }
}
