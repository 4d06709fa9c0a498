use crate::politeness::Throttle;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

/// In-memory throttle, the default [`Throttle`] implementation.
///
/// Keeps one timestamp per domain; the read-previous-and-stamp-now exchange
/// happens under a single lock acquisition.
#[derive(Default)]
pub struct MemoryThrottle {
    hosts: Mutex<HashMap<String, Instant>>,
}

impl MemoryThrottle {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Throttle for MemoryThrottle {
    fn last_time(&self, domain: &str) -> Option<Instant> {
        self.hosts
            .lock()
            .unwrap()
            .insert(domain.to_string(), Instant::now())
    }
}
