use serde::Deserialize;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default, rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub follow: FollowConfig,
    #[serde(default)]
    pub storage: Option<StorageConfig>,
}

/// Worker pool and politeness settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CrawlerConfig {
    /// Number of crawl threads
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Delay between requests to one domain when robots.txt sets none
    #[serde(default = "default_delay_ms", rename = "default-delay-ms")]
    pub default_delay_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            default_delay_ms: default_delay_ms(),
        }
    }
}

impl CrawlerConfig {
    pub fn default_delay(&self) -> Duration {
        Duration::from_millis(self.default_delay_ms)
    }
}

/// How the crawler introduces itself to servers.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserAgentConfig {
    #[serde(default = "default_crawler_name", rename = "crawler-name")]
    pub crawler_name: String,
    #[serde(default = "default_crawler_version", rename = "crawler-version")]
    pub crawler_version: String,
    #[serde(default = "default_contact_url", rename = "contact-url")]
    pub contact_url: String,
    #[serde(default = "default_contact_email", rename = "contact-email")]
    pub contact_email: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: default_crawler_name(),
            crawler_version: default_crawler_version(),
            contact_url: default_contact_url(),
            contact_email: default_contact_email(),
        }
    }
}

/// What the crawler follows.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FollowConfig {
    /// Content types worth fetching and parsing
    #[serde(default = "default_content_types", rename = "content-types")]
    pub content_types: Vec<String>,
    /// Confine discovered links to the domain that discovered them
    #[serde(default = "default_same_domain", rename = "same-domain")]
    pub same_domain: bool,
}

impl Default for FollowConfig {
    fn default() -> Self {
        Self {
            content_types: default_content_types(),
            same_domain: default_same_domain(),
        }
    }
}

/// Optional SQLite persistence.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    #[serde(rename = "database-path")]
    pub database_path: String,
}

fn default_workers() -> usize {
    10
}

fn default_delay_ms() -> u64 {
    4000
}

fn default_crawler_name() -> String {
    "Spiderling".to_string()
}

fn default_crawler_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_contact_url() -> String {
    "https://example.com/crawler".to_string()
}

fn default_contact_email() -> String {
    "crawler@example.com".to_string()
}

fn default_content_types() -> Vec<String> {
    vec!["text/html".to_string(), "application/xhtml+xml".to_string()]
}

fn default_same_domain() -> bool {
    true
}
