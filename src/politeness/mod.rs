//! Politeness: robots.txt compliance and per-domain request spacing
//!
//! Two independent components, each behind its own lock: the robots cache,
//! mapping a domain to its parsed rule set, and the throttle, mapping a
//! domain to the time of its most recent request.

mod robots;
mod throttle;

pub use robots::{RobotRules, RobotsCache};
pub use throttle::MemoryThrottle;

use crate::url::NormalizedUrl;
use crate::Result;
use std::time::{Duration, Instant};

/// robots.txt rule store.
///
/// A domain with no record is *undetermined*, never "allow": `check` fails
/// with `NoRobots` until `parse` has run for the domain. The engine
/// guarantees a domain's robots.txt is fetched before any content URL for it
/// is granted.
pub trait Robots: Send + Sync {
    /// Stores the rule set for a domain. A `None` body (robots.txt missing,
    /// HTTP 404) means the domain is unrestricted.
    fn parse(&self, domain: &str, body: Option<&str>);

    /// Fails with `NoRobots` if the domain is undetermined, `NotAllowed` if
    /// the URL is disallowed; otherwise returns the delay to honor between
    /// requests to the domain (the robots.txt Crawl-delay, or the default).
    fn check(&self, url: &NormalizedUrl) -> Result<Duration>;
}

/// Per-domain request timestamp store.
pub trait Throttle: Send + Sync {
    /// Atomically returns the previous request time for the domain (`None`
    /// if this is the first ever) and records that a request starts now.
    fn last_time(&self, domain: &str) -> Option<Instant>;
}
