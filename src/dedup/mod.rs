//! Duplicate resource detection
//!
//! Catches the same document reachable through different URLs. Two checks
//! per resource: a cheap one on the ETag header after the HEAD request, and
//! a definitive one on a content hash after the GET.

use crate::fetch::Resource;
use crate::{CrawlError, Result};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::Mutex;

/// Resource-level duplicate detector.
///
/// `check` is called twice per crawled resource, once per fetch stage. A
/// fingerprint is recorded on first sight; seeing it again fails with
/// `DuplicateResource`, which skips the rest of the pipeline for that URL.
pub trait DuplicateDetector: Send + Sync {
    fn check(&self, resource: &Resource) -> Result<()>;
}

/// Default detector: ETags before the body is available, SHA-256 of the body
/// after.
///
/// The two fingerprint spaces are kept separate so an ETag value can never
/// collide with a content hash.
#[derive(Default)]
pub struct HashDetector {
    etags: Mutex<HashSet<String>>,
    hashes: Mutex<HashSet<String>>,
}

impl HashDetector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DuplicateDetector for HashDetector {
    fn check(&self, resource: &Resource) -> Result<()> {
        if let Some(content) = &resource.content {
            let digest = hex::encode(Sha256::digest(content));
            if !self.hashes.lock().unwrap().insert(digest) {
                return Err(CrawlError::DuplicateResource {
                    url: resource.url.to_string(),
                });
            }
        } else if let Some(etag) = resource.etag() {
            if !self.etags.lock().unwrap().insert(etag) {
                return Err(CrawlError::DuplicateResource {
                    url: resource.url.to_string(),
                });
            }
        }
        // No body and no ETag: nothing to fingerprint at this stage.
        Ok(())
    }
}
