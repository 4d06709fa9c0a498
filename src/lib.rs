//! Spiderling: a polite, concurrent web crawler
//!
//! This crate fetches pages starting from a set of seed URLs, respecting each
//! site's robots.txt and a per-domain request delay, suppressing duplicate
//! URLs and duplicate content, and handing completed pages to a pluggable
//! sink. Crawling runs on a fixed pool of OS threads; at most one fetch is in
//! flight per domain at any time.

pub mod config;
pub mod dedup;
pub mod engine;
pub mod fetch;
pub mod frontier;
pub mod parse;
pub mod policy;
pub mod politeness;
pub mod sink;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for crawl operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("robots.txt not yet fetched for domain: {domain}")]
    NoRobots { domain: String },

    #[error("URL disallowed by robots.txt: {url}")]
    NotAllowed { url: String },

    #[error("URL not followed ({reason}): {url}")]
    NotFollowed { url: String, reason: String },

    #[error("duplicate URL: {url}")]
    DuplicateUrl { url: String },

    #[error("duplicate resource: {url}")]
    DuplicateResource { url: String },

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of a `CrawlError`, driving the worker's disposition
/// for a failed URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// NoRobots / NotAllowed: abandon this URL only
    Politeness,
    /// Follow policy denied the URL; not counted as a failure
    Policy,
    /// Duplicate URL; silently skipped and counted
    Frontier,
    /// Duplicate resource detected after HEAD or GET
    Content,
    /// Connection failure, truncated body, non-2xx status
    Transport,
    /// Anything else; triggers a graceful drain
    Fatal,
}

impl CrawlError {
    /// Maps the error onto its disposition class.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CrawlError::NoRobots { .. } | CrawlError::NotAllowed { .. } => ErrorKind::Politeness,
            CrawlError::NotFollowed { .. } => ErrorKind::Policy,
            CrawlError::DuplicateUrl { .. } => ErrorKind::Frontier,
            CrawlError::DuplicateResource { .. } => ErrorKind::Content,
            CrawlError::Http { .. } | CrawlError::Status { .. } => ErrorKind::Transport,
            _ => ErrorKind::Fatal,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("failed to parse URL: {0}")]
    Parse(String),

    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("missing host in URL")]
    MissingHost,
}

/// Result type alias for crawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use engine::{CrawlContext, Engine};
pub use fetch::Resource;
pub use url::NormalizedUrl;
