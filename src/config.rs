use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{AppError, Result};
use crate::models::Source;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_db_path")]
    pub db_path: String,

    pub claude_api_key: Option<String>,

    #[serde(default = "default_positivity_threshold")]
    pub positivity_threshold: f64,

    #[serde(default = "default_fetch_interval")]
    pub fetch_interval_minutes: u32,

    #[serde(default = "default_sources")]
    pub sources: Vec<Source>,
}

fn default_port() -> u16 {
    3000
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("brightside");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("news.db").to_string_lossy().to_string()
}

fn default_positivity_threshold() -> f64 {
    0.7
}

fn default_fetch_interval() -> u32 {
    60
}

fn default_sources() -> Vec<Source> {
    vec![
        Source::feed("Optimist Daily", "https://www.optimistdaily.com/feed/"),
        Source::feed("Good News Network", "https://www.goodnewsnetwork.org/feed/"),
        Source::feed("Positive News", "https://www.positive.news/feed/"),
        Source::feed("Sunny Skyz", "https://feeds.feedburner.com/SunnySkyz"),
        Source::feed("Upworthy", "https://www.upworthy.com/feeds/feed.rss"),
        Source::feed("Reasons to be Cheerful", "https://reasonstobecheerful.world/feed/"),
        Source::feed("Good News EU", "https://goodnews.eu/feed/"),
        Source::feed("The Better India", "https://www.thebetterindia.com/feed/"),
        Source::feed("Good Good Good", "https://www.goodgoodgood.co/articles/rss.xml"),
        Source::feed("Quanta Magazine", "https://www.quantamagazine.org/feed/"),
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            db_path: default_db_path(),
            claude_api_key: None,
            positivity_threshold: default_positivity_threshold(),
            fetch_interval_minutes: default_fetch_interval(),
            sources: default_sources(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str::<Config>(&content)?
        } else {
            let config = Config::default();
            config.save()?;
            config
        };

        // Environment overrides the config file for the API key
        if let Ok(key) =
            std::env::var("CLAUDE_API_KEY").or_else(|_| std::env::var("ANTHROPIC_API_KEY"))
        {
            if !key.is_empty() {
                config.claude_api_key = Some(key);
            }
        }

        if config.claude_api_key.is_none() {
            tracing::warn!("No Claude API key configured; sentiment scoring will fail");
        }

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("brightside")
            .join("config.toml")
    }
}
