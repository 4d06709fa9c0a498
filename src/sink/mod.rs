//! Result and error sinks
//!
//! Completed resources and recorded failures leave the crawler through these
//! traits; the engine itself keeps no crawl output. The in-memory
//! implementations here count and summarize; the storage module persists.

use crate::fetch::Resource;
use crate::url::NormalizedUrl;
use crate::{ErrorKind, Result};
use std::collections::HashMap;
use std::sync::Mutex;

/// Receives every successfully crawled resource that is not marked noindex.
pub trait ResultSink: Send + Sync {
    fn dump(&self, resource: &Resource) -> Result<()>;
}

/// Receives failures the engine decides are worth recording.
pub trait ErrorSink: Send + Sync {
    fn record(&self, url: &NormalizedUrl, kind: ErrorKind, message: &str);
}

/// Counting sink: tallies pages and bytes, keeps nothing else.
#[derive(Default)]
pub struct CountingSink {
    inner: Mutex<Counts>,
}

#[derive(Default, Clone, Copy)]
struct Counts {
    pages: u64,
    bytes: u64,
}

impl CountingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pages(&self) -> u64 {
        self.inner.lock().unwrap().pages
    }

    pub fn bytes(&self) -> u64 {
        self.inner.lock().unwrap().bytes
    }
}

impl ResultSink for CountingSink {
    fn dump(&self, resource: &Resource) -> Result<()> {
        let mut counts = self.inner.lock().unwrap();
        counts.pages += 1;
        counts.bytes += resource.content_len();
        tracing::info!(url = %resource.url, bytes = resource.content_len(), "crawled");
        Ok(())
    }
}

/// Error sink that groups failed URLs by error class for the end-of-run
/// summary.
#[derive(Default)]
pub struct RecordingErrorSink {
    inner: Mutex<HashMap<ErrorKind, Vec<String>>>,
}

impl RecordingErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, kind: ErrorKind) -> usize {
        self.inner
            .lock()
            .unwrap()
            .get(&kind)
            .map(Vec::len)
            .unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.inner.lock().unwrap().values().map(Vec::len).sum()
    }

    /// Snapshot of recorded URLs, grouped by class.
    pub fn by_kind(&self) -> HashMap<ErrorKind, Vec<String>> {
        self.inner.lock().unwrap().clone()
    }
}

impl ErrorSink for RecordingErrorSink {
    fn record(&self, url: &NormalizedUrl, kind: ErrorKind, message: &str) {
        tracing::warn!(url = %url, ?kind, "{message}");
        self.inner
            .lock()
            .unwrap()
            .entry(kind)
            .or_default()
            .push(url.to_string());
    }
}
