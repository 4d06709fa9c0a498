use crate::politeness::Robots;
use crate::url::NormalizedUrl;
use crate::{CrawlError, Result};
use robotstxt::DefaultMatcher;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Parsed robots.txt rule set for one domain.
///
/// Matching is delegated to the robotstxt crate on demand; Crawl-delay is
/// extracted by hand since the matcher does not expose it.
#[derive(Debug, Clone)]
pub struct RobotRules {
    /// Raw robots.txt content; `None` means the file was absent and
    /// everything is allowed.
    content: Option<String>,
}

impl RobotRules {
    pub fn from_content(content: &str) -> Self {
        Self {
            content: Some(content.to_string()),
        }
    }

    /// Rule set that allows everything (missing robots.txt).
    pub fn allow_all() -> Self {
        Self { content: None }
    }

    /// Checks whether the URL is allowed for the given user agent.
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        match &self.content {
            None => true,
            Some(content) if content.is_empty() => true,
            Some(content) => {
                let mut matcher = DefaultMatcher::default();
                matcher.one_agent_allowed_by_robots(content, user_agent, url)
            }
        }
    }

    /// Extracts the Crawl-delay directive for a user agent, in seconds.
    ///
    /// A Crawl-delay applies to the most recent User-agent group; a delay for
    /// a specifically named agent wins over the wildcard group.
    pub fn crawl_delay(&self, user_agent: &str) -> Option<f64> {
        let content = self.content.as_deref()?;

        let mut current_agents: Vec<String> = Vec::new();
        let mut wildcard_delay: Option<f64> = None;
        let mut agent_delay: Option<f64> = None;
        let normalized_agent = user_agent.to_lowercase();

        for line in content.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = trimmed.split_once(':') {
                let key = key.trim().to_lowercase();
                let value = value.trim();
                match key.as_str() {
                    "user-agent" => {
                        current_agents.push(value.to_lowercase());
                    }
                    "crawl-delay" => {
                        if let Ok(delay) = value.parse::<f64>() {
                            if current_agents
                                .iter()
                                .any(|ua| ua == "*" || normalized_agent.contains(ua))
                            {
                                if current_agents.iter().any(|ua| ua == "*") {
                                    wildcard_delay = Some(delay);
                                } else {
                                    agent_delay = Some(delay);
                                }
                            }
                        }
                        // The next User-agent directive starts a new group.
                        current_agents.clear();
                    }
                    _ => {}
                }
            }
        }

        agent_delay.or(wildcard_delay)
    }
}

/// In-memory robots.txt cache, the default [`Robots`] implementation.
pub struct RobotsCache {
    rules: Mutex<HashMap<String, RobotRules>>,
    user_agent: String,
    default_delay: Duration,
}

impl RobotsCache {
    pub fn new(user_agent: impl Into<String>, default_delay: Duration) -> Self {
        Self {
            rules: Mutex::new(HashMap::new()),
            user_agent: user_agent.into(),
            default_delay,
        }
    }
}

impl Robots for RobotsCache {
    fn parse(&self, domain: &str, body: Option<&str>) {
        let rules = match body {
            Some(content) => RobotRules::from_content(content),
            None => RobotRules::allow_all(),
        };
        self.rules.lock().unwrap().insert(domain.to_string(), rules);
    }

    fn check(&self, url: &NormalizedUrl) -> Result<Duration> {
        let rules = self.rules.lock().unwrap();
        let record = rules
            .get(&url.authority())
            .ok_or_else(|| CrawlError::NoRobots {
                domain: url.authority(),
            })?;
        if !record.is_allowed(url.as_str(), &self.user_agent) {
            return Err(CrawlError::NotAllowed {
                url: url.to_string(),
            });
        }
        Ok(record
            .crawl_delay(&self.user_agent)
            .map(Duration::from_secs_f64)
            .unwrap_or(self.default_delay))
    }
}
