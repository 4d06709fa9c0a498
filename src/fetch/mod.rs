//! HTTP fetching and the per-attempt Resource record
//!
//! The fetcher issues blocking HEAD/GET requests and follows redirects
//! itself (client policy, limit 10); the final URL is read back from the
//! response so the engine can register redirect edges.
//!
//! No request timeout is configured: a stalled connection stalls the one
//! worker holding it. This is a documented limitation, not an oversight.

use crate::config::UserAgentConfig;
use crate::url::NormalizedUrl;
use crate::{CrawlError, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, CONTENT_TYPE, ETAG};
use reqwest::StatusCode;
use std::borrow::Cow;

/// Mutable record of one fetch attempt.
///
/// Created after the HEAD request with `content` unset, filled in by the GET,
/// and discarded after dispatch to the result or error sink.
#[derive(Debug, Clone)]
pub struct Resource {
    /// The URL as handed out by the scheduler
    pub origin: NormalizedUrl,
    /// Current URL, updated after redirects
    pub url: NormalizedUrl,
    /// Most recent HTTP status code
    pub status: u16,
    /// Most recent response headers
    pub headers: HeaderMap,
    /// Raw body bytes, `None` until the GET stage. Kept undecoded so
    /// fingerprinting sees exactly what the server sent; [`text`](Self::text)
    /// gives the decoded view for parsing.
    pub content: Option<Vec<u8>>,
    /// Set by a parser from a robots meta tag; suppresses the sink dump
    pub noindex: bool,
    /// Set by a parser from a robots meta tag; suppresses link enqueueing
    pub nofollow: bool,
}

impl Resource {
    /// Primary content type from the Content-Type header, lowercased and
    /// stripped of parameters (`text/html; charset=utf-8` -> `text/html`).
    pub fn content_type(&self) -> Option<String> {
        let value = self.headers.get(CONTENT_TYPE)?.to_str().ok()?;
        Some(
            value
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_lowercase(),
        )
    }

    /// The ETag header, if present.
    pub fn etag(&self) -> Option<String> {
        self.headers
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    }

    /// Body length in bytes (0 before the GET stage).
    pub fn content_len(&self) -> u64 {
        self.content.as_ref().map(|c| c.len() as u64).unwrap_or(0)
    }

    /// Body as text, lossily decoded as UTF-8.
    pub fn text(&self) -> Option<Cow<'_, str>> {
        self.content.as_deref().map(String::from_utf8_lossy)
    }
}

/// Blocking HTTP fetcher shared by all workers.
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    /// Builds the fetcher with the crawler's identifying user agent, in the
    /// form `name/version (+contact-url; contact-email)`.
    pub fn new(config: &UserAgentConfig) -> Result<Self> {
        let user_agent = format!(
            "{}/{} (+{}; {})",
            config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
        );
        let client = Client::builder()
            .user_agent(user_agent)
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| CrawlError::Http {
                url: String::new(),
                source: e,
            })?;
        Ok(Self { client })
    }

    /// HEAD request; returns a partial Resource with no content.
    pub fn head(&self, url: &NormalizedUrl) -> Result<Resource> {
        tracing::debug!("HTTP HEAD {}", url);
        let response = self
            .client
            .head(url.as_str())
            .send()
            .map_err(|e| http_error(url, e))?;
        let status = response.status();
        let final_url = NormalizedUrl::parse(response.url().as_str())?;
        if !status.is_success() {
            return Err(CrawlError::Status {
                url: final_url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(Resource {
            origin: url.clone(),
            url: final_url,
            status: status.as_u16(),
            headers: response.headers().clone(),
            content: None,
            noindex: false,
            nofollow: false,
        })
    }

    /// GET request for a resource created by [`head`](Self::head); refreshes
    /// the URL and headers and fills in the content.
    pub fn get(&self, resource: &mut Resource) -> Result<()> {
        tracing::debug!("HTTP GET {}", resource.origin);
        let response = self
            .client
            .get(resource.origin.as_str())
            .send()
            .map_err(|e| http_error(&resource.origin, e))?;
        let status = response.status();
        let final_url = NormalizedUrl::parse(response.url().as_str())?;
        if !status.is_success() {
            return Err(CrawlError::Status {
                url: final_url.to_string(),
                status: status.as_u16(),
            });
        }
        resource.url = final_url;
        resource.status = status.as_u16();
        resource.headers = response.headers().clone();
        let body = response
            .bytes()
            .map_err(|e| http_error(&resource.origin, e))?;
        resource.content = Some(body.to_vec());
        Ok(())
    }

    /// GET for a domain's robots.txt. A 404 means the file is absent and the
    /// domain is unrestricted (`Ok(None)`); any other non-2xx status is a
    /// transport error.
    pub fn fetch_robots(&self, url: &NormalizedUrl) -> Result<Option<String>> {
        tracing::debug!("HTTP GET {}", url);
        let response = self
            .client
            .get(url.as_str())
            .send()
            .map_err(|e| http_error(url, e))?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(CrawlError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.text().map_err(|e| http_error(url, e))?;
        Ok(Some(body))
    }
}

fn http_error(url: &NormalizedUrl, source: reqwest::Error) -> CrawlError {
    CrawlError::Http {
        url: url.to_string(),
        source,
    }
}
