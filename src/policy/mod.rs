//! Follow policy: which resources get parsed and which discovered URLs get
//! crawled
//!
//! The policy is consulted at three points: after the HEAD (headers only),
//! after the GET (full resource), and once per discovered link. Denials are
//! expected outcomes of a healthy crawl, so verdicts are plain values rather
//! than errors; the pipeline converts a denial into `NotFollowed` where it
//! needs one.

use crate::fetch::Resource;
use crate::url::NormalizedUrl;

/// Policy decision. A denial carries a short static reason for logging and
/// error records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Deny(&'static str),
}

impl Verdict {
    pub fn is_allow(&self) -> bool {
        matches!(self, Verdict::Allow)
    }
}

/// Decides which resources and discovered URLs stay inside the crawl.
pub trait FollowPolicy: Send + Sync {
    /// Judges a fetched resource by its headers (and body once present).
    /// Called after HEAD and again after GET, since redirects and the
    /// response itself can change the picture between the two.
    fn follow_resource(&self, resource: &Resource) -> Verdict;

    /// Judges a URL discovered inside `resource`.
    fn follow_url(&self, resource: &Resource, url: &NormalizedUrl) -> Verdict;
}

/// Default policy: accept a fixed set of content types, optionally confine
/// the crawl to the domains of the resources that discover the links.
pub struct ContentTypePolicy {
    content_types: Vec<String>,
    same_domain: bool,
}

impl ContentTypePolicy {
    pub fn new(content_types: Vec<String>, same_domain: bool) -> Self {
        Self {
            content_types: content_types.into_iter().map(|t| t.to_lowercase()).collect(),
            same_domain,
        }
    }
}

impl FollowPolicy for ContentTypePolicy {
    fn follow_resource(&self, resource: &Resource) -> Verdict {
        // The content-type gate only applies while the resource is headers
        // only. Once the body has been fetched the resource is kept, even if
        // the GET response advertised a different type than the HEAD did.
        if resource.content.is_some() {
            return Verdict::Allow;
        }
        match resource.content_type() {
            Some(ct) if self.content_types.iter().any(|t| *t == ct) => Verdict::Allow,
            Some(_) => Verdict::Deny("content type not followed"),
            None => Verdict::Deny("no content type"),
        }
    }

    fn follow_url(&self, resource: &Resource, url: &NormalizedUrl) -> Verdict {
        if self.same_domain && url.authority() != resource.url.authority() {
            return Verdict::Deny("outside crawl domain");
        }
        Verdict::Allow
    }
}

/// Policy for single-page runs: fetch the seeds, follow nothing.
#[derive(Default)]
pub struct SingleUrlPolicy;

impl SingleUrlPolicy {
    pub fn new() -> Self {
        Self
    }
}

impl FollowPolicy for SingleUrlPolicy {
    fn follow_resource(&self, _resource: &Resource) -> Verdict {
        Verdict::Allow
    }

    fn follow_url(&self, _resource: &Resource, _url: &NormalizedUrl) -> Verdict {
        Verdict::Deny("single-url run")
    }
}
