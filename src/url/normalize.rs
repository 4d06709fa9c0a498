use crate::{UrlError, UrlResult};
use std::fmt;
use std::hash::{Hash, Hasher};
use url::Url;

/// Canonical, hashable representation of a URL.
///
/// A `NormalizedUrl` always has an http or https scheme, a host, and no
/// fragment; an empty path is rendered as `/`. Equality and hashing cover
/// (scheme, host:port, selector) only, so two URLs that differ solely in
/// their fragment compare equal:
///
/// ```
/// use spiderling::NormalizedUrl;
///
/// let a = NormalizedUrl::parse("http://example.com/a#top").unwrap();
/// let b = NormalizedUrl::parse("http://example.com/a").unwrap();
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone)]
pub struct NormalizedUrl {
    inner: Url,
}

impl NormalizedUrl {
    /// Parses an absolute URL string. Pure function, no I/O.
    pub fn parse(raw: &str) -> UrlResult<Self> {
        let url = Url::parse(raw.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
        Self::from_url(url)
    }

    /// Resolves a possibly-relative URL string against a base, RFC-3986 style.
    pub fn resolve(raw: &str, base: &NormalizedUrl) -> UrlResult<Self> {
        let url = base
            .inner
            .join(raw.trim())
            .map_err(|e| UrlError::Parse(e.to_string()))?;
        Self::from_url(url)
    }

    fn from_url(mut url: Url) -> UrlResult<Self> {
        match url.scheme() {
            "http" | "https" => {}
            other => return Err(UrlError::UnsupportedScheme(other.to_string())),
        }
        if url.host_str().is_none() {
            return Err(UrlError::MissingHost);
        }
        // Fragments never participate in URL identity.
        url.set_fragment(None);
        Ok(Self { inner: url })
    }

    pub fn scheme(&self) -> &str {
        self.inner.scheme()
    }

    /// Host, lowercased by the parser.
    pub fn host(&self) -> &str {
        self.inner.host_str().unwrap_or_default()
    }

    /// Explicit port, if it is not the scheme default.
    pub fn port(&self) -> Option<u16> {
        self.inner.port()
    }

    /// `host[:port]`, the domain key used for politeness and scheduling.
    pub fn authority(&self) -> String {
        match self.inner.port() {
            Some(port) => format!("{}:{}", self.host(), port),
            None => self.host().to_string(),
        }
    }

    pub fn path(&self) -> &str {
        self.inner.path()
    }

    pub fn query(&self) -> Option<&str> {
        self.inner.query()
    }

    /// Path plus query string, e.g. `/search?q=ink`.
    pub fn selector(&self) -> String {
        match self.inner.query() {
            Some(query) => format!("{}?{}", self.inner.path(), query),
            None => self.inner.path().to_string(),
        }
    }

    /// Whether this URL addresses the domain's robots.txt.
    pub fn is_robots(&self) -> bool {
        self.inner.path() == "/robots.txt" && self.inner.query().is_none()
    }

    /// The robots.txt URL for this URL's domain.
    pub fn robots_url(&self) -> NormalizedUrl {
        let raw = format!("{}://{}/robots.txt", self.scheme(), self.authority());
        // The components come from an already-validated URL.
        NormalizedUrl::parse(&raw).expect("robots URL derived from a valid URL")
    }

    pub fn as_str(&self) -> &str {
        self.inner.as_str()
    }
}

// Identity is (scheme, host:port, selector); since the fragment is stripped
// at construction, comparing the serialized form is equivalent.
impl PartialEq for NormalizedUrl {
    fn eq(&self, other: &Self) -> bool {
        self.inner.as_str() == other.inner.as_str()
    }
}

impl Eq for NormalizedUrl {}

impl Hash for NormalizedUrl {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.as_str().hash(state);
    }
}

impl fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.inner.as_str())
    }
}
