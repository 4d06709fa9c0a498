//! Domain-exclusive URL dispatch
//!
//! The scheduler sits between the worker pool and the frontier. It enforces
//! two rules: at most one URL per domain is in flight at any time, and a
//! worker that finds the frontier empty blocks until another worker adds
//! URLs or the crawl is over. The crawl is over when every worker is blocked
//! on an empty frontier at once, or after [`stop`](Scheduler::stop) drains
//! the in-flight work.

use crate::frontier::Frontier;
use crate::url::NormalizedUrl;
use crate::Result;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Condvar, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Active,
    /// `stop` was called: finish claimed URLs, hand out nothing new.
    Draining,
    Terminated,
}

/// Private gate a worker parks on while its URL's domain is claimed by
/// another worker. Granting the gate transfers the domain claim to the
/// parked worker, preserving arrival order.
struct DomainGate {
    granted: Mutex<bool>,
    cv: Condvar,
}

impl DomainGate {
    fn new() -> Self {
        Self {
            granted: Mutex::new(false),
            cv: Condvar::new(),
        }
    }

    fn grant(&self) {
        *self.granted.lock().unwrap() = true;
        self.cv.notify_one();
    }

    fn wait(&self) {
        let mut granted = self.granted.lock().unwrap();
        while !*granted {
            granted = self.cv.wait(granted).unwrap();
        }
    }
}

/// Workers queued behind the current owner of a domain, oldest first.
/// An entry with no waiters means the owner is alone; absence of an entry
/// means the domain is unclaimed.
#[derive(Default)]
struct DomainClaim {
    waiters: VecDeque<Arc<DomainGate>>,
}

struct SchedInner {
    domains: HashMap<String, DomainClaim>,
    /// Workers currently blocked waiting for the frontier to refill
    waiting_for_url: usize,
    /// Bumped on every event that could make a retry worthwhile
    epoch: u64,
    phase: Phase,
}

pub struct Scheduler {
    inner: Mutex<SchedInner>,
    url_gate: Condvar,
    workers: usize,
}

impl Scheduler {
    pub fn new(workers: usize) -> Self {
        Self {
            inner: Mutex::new(SchedInner {
                domains: HashMap::new(),
                waiting_for_url: 0,
                epoch: 0,
                phase: Phase::Active,
            }),
            url_gate: Condvar::new(),
            workers,
        }
    }

    /// Pulls the next URL and claims its domain, blocking as needed.
    ///
    /// Returns `None` when the crawl is finished: either every worker is
    /// simultaneously waiting on an empty frontier, or a drain was requested.
    /// The caller owns the returned URL's domain and must call
    /// [`release`](Self::release) when done with it.
    pub fn acquire_next(&self, frontier: &dyn Frontier) -> Result<Option<NormalizedUrl>> {
        loop {
            let epoch = {
                let inner = self.inner.lock().unwrap();
                if inner.phase != Phase::Active {
                    return Ok(None);
                }
                inner.epoch
            };

            // The frontier is queried outside the scheduler lock; the epoch
            // detects refills that happen in the meantime.
            match frontier.next()? {
                Some(url) => {
                    let domain = url.authority();
                    let gate = {
                        let mut inner = self.inner.lock().unwrap();
                        // The frontier just produced an item, so it may hold
                        // more; give one blocked worker a chance to retry.
                        if inner.waiting_for_url > 0 {
                            inner.epoch += 1;
                            self.url_gate.notify_one();
                        }
                        match inner.domains.entry(domain) {
                            Entry::Vacant(entry) => {
                                entry.insert(DomainClaim::default());
                                None
                            }
                            Entry::Occupied(mut entry) => {
                                let gate = Arc::new(DomainGate::new());
                                entry.get_mut().waiters.push_back(Arc::clone(&gate));
                                Some(gate)
                            }
                        }
                    };
                    if let Some(gate) = gate {
                        gate.wait();
                    }
                    // The domain is ours. During a drain, pass the claim on
                    // and report completion instead of crawling.
                    if self.inner.lock().unwrap().phase != Phase::Active {
                        self.release(&url);
                        return Ok(None);
                    }
                    return Ok(Some(url));
                }
                None => {
                    let mut inner = self.inner.lock().unwrap();
                    if inner.epoch != epoch {
                        continue;
                    }
                    if inner.phase != Phase::Active {
                        return Ok(None);
                    }
                    inner.waiting_for_url += 1;
                    if inner.waiting_for_url == self.workers {
                        // Everyone is idle and the frontier is empty: done.
                        inner.phase = Phase::Terminated;
                        self.url_gate.notify_all();
                        return Ok(None);
                    }
                    while inner.epoch == epoch && inner.phase == Phase::Active {
                        inner = self.url_gate.wait(inner).unwrap();
                    }
                    inner.waiting_for_url -= 1;
                    if inner.phase != Phase::Active {
                        return Ok(None);
                    }
                }
            }
        }
    }

    /// Releases the domain claim for a finished URL, handing the domain to
    /// the oldest queued waiter if there is one, and wakes workers blocked
    /// on the empty frontier (the finished URL may have added links).
    pub fn release(&self, url: &NormalizedUrl) {
        let domain = url.authority();
        let mut inner = self.inner.lock().unwrap();
        let next_owner = inner
            .domains
            .get_mut(&domain)
            .and_then(|claim| claim.waiters.pop_front());
        match next_owner {
            Some(gate) => gate.grant(),
            None => {
                inner.domains.remove(&domain);
            }
        }
        inner.epoch += 1;
        self.url_gate.notify_all();
    }

    /// Requests a graceful drain: in-flight URLs finish, nothing new is
    /// handed out, blocked workers wake up and exit.
    pub fn stop(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.phase == Phase::Active {
            inner.phase = Phase::Draining;
            tracing::info!("drain requested, no new URLs will be dispatched");
        }
        inner.epoch += 1;
        self.url_gate.notify_all();
    }
}
