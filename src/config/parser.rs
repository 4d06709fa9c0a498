use crate::config::Config;
use crate::ConfigError;
use std::fs;
use std::path::Path;

/// Loads and validates configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Checks constraints the type system can't express.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.crawler.workers == 0 {
        return Err(ConfigError::Validation(
            "crawler.workers must be at least 1".to_string(),
        ));
    }
    if config.follow.content_types.is_empty() {
        return Err(ConfigError::Validation(
            "follow.content-types must not be empty".to_string(),
        ));
    }
    if config.user_agent.crawler_name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent.crawler-name must not be empty".to_string(),
        ));
    }
    if let Some(storage) = &config.storage {
        if storage.database_path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "storage.database-path must not be empty".to_string(),
            ));
        }
    }
    Ok(())
}
