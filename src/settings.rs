use std::path::PathBuf;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Sqlite,
    Json,
}

/// Runtime settings: defaults, then `recalls.toml`, then `RECALLS_*` env vars.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub store_backend: StoreBackend,
    pub store_path: PathBuf,
    pub user_agent: String,
    pub feed_timeout_secs: u64,
    pub index_timeout_secs: u64,
    pub detail_timeout_secs: u64,
    pub index_settle_ms: u64,
    pub detail_settle_ms: u64,
    pub max_candidates: usize,
    pub listen: String,
    pub denylist_extra: Vec<String>,
    pub spider_api_key: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            store_backend: StoreBackend::Sqlite,
            store_path: PathBuf::from("data/recalls.sqlite"),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            feed_timeout_secs: 20,
            index_timeout_secs: 30,
            detail_timeout_secs: 15,
            index_settle_ms: 3000,
            detail_settle_ms: 2000,
            max_candidates: 3,
            listen: "127.0.0.1:3000".to_string(),
            denylist_extra: Vec::new(),
            spider_api_key: None,
        }
    }
}

/// `RECALLS_*` variables; `RECALLS_DENYLIST_EXTRA` is a comma-separated list.
fn environment() -> Environment {
    Environment::with_prefix("RECALLS")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("denylist_extra")
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings: Settings = Config::builder()
            .add_source(File::with_name("recalls").required(false))
            .add_source(environment())
            .build()?
            .try_deserialize()?;

        if settings.spider_api_key.is_none() {
            settings.spider_api_key = std::env::var("SPIDER_API_KEY").ok().filter(|k| !k.is_empty());
        }
        Ok(settings)
    }

    pub fn feed_timeout(&self) -> Duration {
        Duration::from_secs(self.feed_timeout_secs)
    }

    pub fn scrape_timing(&self) -> crate::scraper::Timing {
        crate::scraper::Timing {
            index_timeout: Duration::from_secs(self.index_timeout_secs),
            detail_timeout: Duration::from_secs(self.detail_timeout_secs),
            index_settle: Duration::from_millis(self.index_settle_ms),
            detail_settle: Duration::from_millis(self.detail_settle_ms),
            max_candidates: self.max_candidates,
        }
    }
}
