//! The per-URL crawl pipeline
//!
//! One call per dispatched URL. Robots URLs refresh the politeness cache;
//! content URLs run the full check / fetch / parse / dump sequence. Any error
//! abandons the URL at that point; the worker loop decides what the error
//! means for the rest of the crawl.

use crate::engine::CrawlContext;
use crate::parse::Parsed;
use crate::policy::Verdict;
use crate::url::NormalizedUrl;
use crate::{CrawlError, Result};
use std::thread;
use std::time::Duration;

pub fn crawl_one(ctx: &CrawlContext, url: &NormalizedUrl) -> Result<()> {
    if url.is_robots() {
        crawl_robots(ctx, url)
    } else {
        crawl_content(ctx, url)
    }
}

fn crawl_robots(ctx: &CrawlContext, url: &NormalizedUrl) -> Result<()> {
    let domain = url.authority();
    // Stamp the domain so the first content request measures its delay from
    // the robots fetch, not from the epoch.
    ctx.throttle.last_time(&domain);
    let body = ctx.fetcher.fetch_robots(url)?;
    tracing::debug!(domain = %domain, present = body.is_some(), "robots.txt fetched");
    ctx.robots.parse(&domain, body.as_deref());
    Ok(())
}

fn crawl_content(ctx: &CrawlContext, url: &NormalizedUrl) -> Result<()> {
    let delay = ctx.robots.check(url)?;
    honor_delay(ctx, &url.authority(), delay);

    let mut resource = ctx.fetcher.head(url)?;
    if resource.url != *url {
        ctx.frontier.add_redirect(url, &resource.url)?;
        ctx.frontier.check(&resource.url)?;
    }
    ctx.detector.check(&resource)?;
    verdict_to_result(ctx.policy.follow_resource(&resource), &resource.url)?;

    ctx.fetcher.get(&mut resource)?;
    ctx.detector.check(&resource)?;
    verdict_to_result(ctx.policy.follow_resource(&resource), &resource.url)?;

    let links = parse_resource(ctx, &mut resource);
    for raw in links {
        follow_link(ctx, &resource, &raw)?;
    }

    if resource.noindex {
        tracing::debug!(url = %resource.url, "noindex, not dumped");
    } else {
        ctx.sink.dump(&resource)?;
    }
    Ok(())
}

/// Sleeps out whatever remains of the domain's politeness delay, then stamps
/// the domain with the actual request time.
fn honor_delay(ctx: &CrawlContext, domain: &str, delay: Duration) {
    if let Some(previous) = ctx.throttle.last_time(domain) {
        let elapsed = previous.elapsed();
        if elapsed < delay {
            let remaining = delay - elapsed;
            tracing::debug!(domain = %domain, ?remaining, "throttling");
            thread::sleep(remaining);
            ctx.throttle.last_time(domain);
        }
    }
}

/// First parser to claim the resource wins. A resource no parser handles is
/// still dumped downstream; it just yields no links.
fn parse_resource(ctx: &CrawlContext, resource: &mut crate::fetch::Resource) -> Vec<String> {
    for parser in &ctx.parsers {
        if let Parsed::Handled(links) = parser.parse(resource) {
            return links;
        }
    }
    tracing::debug!(url = %resource.url, "no parser for content type, no links extracted");
    Vec::new()
}

/// Runs one discovered link through resolution, the link graph, the seen
/// set, and the follow policy. Rejections at any step drop the link without
/// failing the resource; only frontier trouble propagates.
fn follow_link(ctx: &CrawlContext, resource: &crate::fetch::Resource, raw: &str) -> Result<()> {
    let target = match NormalizedUrl::resolve(raw, &resource.url) {
        Ok(target) => target,
        Err(err) => {
            tracing::trace!(link = raw, %err, "link skipped");
            return Ok(());
        }
    };
    if target.scheme() != resource.origin.scheme() {
        tracing::trace!(link = %target, "scheme change, link skipped");
        return Ok(());
    }
    ctx.frontier.add_link(&resource.url, &target)?;
    match ctx.frontier.check(&target) {
        // Already seen; the frontier counted the repeat.
        Err(CrawlError::DuplicateUrl { .. }) => return Ok(()),
        Err(err) => return Err(err),
        Ok(()) => {}
    }
    if let Verdict::Deny(reason) = ctx.policy.follow_url(resource, &target) {
        tracing::trace!(link = %target, reason, "link not followed");
        return Ok(());
    }
    if !resource.nofollow {
        ctx.frontier.add(&target)?;
    }
    Ok(())
}

fn verdict_to_result(verdict: Verdict, url: &NormalizedUrl) -> Result<()> {
    match verdict {
        Verdict::Allow => Ok(()),
        Verdict::Deny(reason) => Err(CrawlError::NotFollowed {
            url: url.to_string(),
            reason: reason.to_string(),
        }),
    }
}
