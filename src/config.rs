//! Application configuration loaded from a YAML file.
//!
//! The config file carries the bot credentials, optional outbound proxy,
//! the optional AI-helper section, and the list of feeds to poll. Feeds are
//! static for a run: one scraper id, one listing URL, one destination
//! channel per entry.
//!
//! ```yaml
//! bot:
//!   token: "123456:ABC-DEF"
//!   proxy_url: null
//! openrouter:
//!   api_key: "sk-or-..."
//! start_date_time: null
//! feeds:
//!   - scraper_id: TechCrunch
//!     feed_url: "https://techcrunch.com/latest/"
//!     channel_id: "@technews"
//! ```

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;

use crate::error::{PosterError, Result};

/// Top-level configuration file contents.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub bot: BotConfig,
    /// Optional AI text helper. The client is only constructed when present.
    #[serde(default)]
    pub openrouter: Option<OpenRouterConfig>,
    /// Run-start cutoff carried from config. Currently not applied as a
    /// publish-date filter.
    #[serde(default)]
    pub start_date_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub feeds: Vec<FeedConfig>,
}

/// Messaging credentials and transport settings.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    pub token: String,
    /// Outbound proxy for scraping and API traffic, e.g. `http://host:3128`.
    #[serde(default)]
    pub proxy_url: Option<String>,
}

/// One polled feed: which scraper, which listing page, which channel.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    pub scraper_id: String,
    pub feed_url: String,
    pub channel_id: String,
}

/// Settings for the optional prompt-to-text helper.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenRouterConfig {
    pub api_key: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_requests_limit")]
    pub requests_limit_per_day: u32,
    #[serde(default)]
    pub proxy_url: Option<String>,
}

fn default_api_url() -> String {
    "https://openrouter.ai/api/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "google/gemma-3n-e4b-it:free".to_string()
}

fn default_requests_limit() -> u32 {
    10
}

/// Load and deserialize the config file.
pub fn load_config(path: &str) -> Result<AppConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| PosterError::Config(format!("failed to read {path}: {e}")))?;
    let config: AppConfig = serde_yaml::from_str(&raw)
        .map_err(|e| PosterError::Config(format!("failed to parse {path}: {e}")))?;
    info!(path, feeds = config.feeds.len(), "Loaded configuration");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let yaml = r#"
bot:
  token: "123456:ABC"
feeds:
  - scraper_id: AlienWire
    feed_url: "https://example.com/news"
    channel_id: "@channel"
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.bot.token, "123456:ABC");
        assert!(config.bot.proxy_url.is_none());
        assert!(config.openrouter.is_none());
        assert!(config.start_date_time.is_none());
        assert_eq!(config.feeds.len(), 1);
        assert_eq!(config.feeds[0].scraper_id, "AlienWire");
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
bot:
  token: "123456:ABC"
  proxy_url: "http://proxy.local:3128"
openrouter:
  api_key: "sk-or-xyz"
start_date_time: "2025-05-01T00:00:00Z"
feeds:
  - scraper_id: TechCrunch
    feed_url: "https://techcrunch.com/latest/"
    channel_id: "@technews"
  - scraper_id: BmwNews
    feed_url: "https://example.com/bmw"
    channel_id: "-1001234567890"
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.bot.proxy_url.as_deref(), Some("http://proxy.local:3128"));
        let ai = config.openrouter.unwrap();
        assert_eq!(ai.api_key, "sk-or-xyz");
        assert_eq!(ai.requests_limit_per_day, 10);
        assert!(ai.api_url.contains("openrouter.ai"));
        assert!(config.start_date_time.is_some());
        assert_eq!(config.feeds.len(), 2);
    }
}
