//! Crawler configuration, loaded from a TOML file with CLI overrides
//! applied on top.

mod parser;
mod types;

pub use parser::load_config;
pub use types::{Config, CrawlerConfig, FollowConfig, StorageConfig, UserAgentConfig};
