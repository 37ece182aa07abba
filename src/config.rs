use crate::error::{DiaryError, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://api.jsonbin.io/v3/b";
pub const DEFAULT_LOCATION_BASE: &str = "https://jsonbin.io";
pub const DEFAULT_INDEX_PATH: &str = "diary_metadata.json";
pub const DEFAULT_LOG_DIR: &str = "logs";
pub const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Process-wide settings handed to the remote store client and the index.
#[derive(Clone)]
pub struct Config {
    pub api_base: String,
    pub location_base: String,
    pub api_key: String,
    pub index_path: PathBuf,
    pub request_timeout: Duration,
    pub log_dir: PathBuf,
    pub log_level: String,
}

impl Config {
    pub fn new(api_key: impl Into<String>) -> Self {
        Config {
            api_base: DEFAULT_API_BASE.to_string(),
            location_base: DEFAULT_LOCATION_BASE.to_string(),
            api_key: api_key.into(),
            index_path: PathBuf::from(DEFAULT_INDEX_PATH),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }

    /// Reads settings from the environment, after loading `.env` if one exists.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup("DIARY_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| DiaryError::Config("DIARY_API_KEY is not set".to_string()))?;

        let mut config = Config::new(api_key);
        if let Some(base) = lookup("DIARY_API_BASE") {
            config.api_base = base.trim_end_matches('/').to_string();
        }
        if let Some(base) = lookup("DIARY_LOCATION_BASE") {
            config.location_base = base.trim_end_matches('/').to_string();
        }
        if let Some(path) = lookup("DIARY_INDEX_PATH") {
            config.index_path = PathBuf::from(path);
        }
        if let Some(secs) = lookup("DIARY_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                DiaryError::Config(format!("DIARY_TIMEOUT_SECS must be a number, got `{secs}`"))
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(dir) = lookup("DIARY_LOG_DIR") {
            config.log_dir = PathBuf::from(dir);
        }
        if let Some(level) = lookup("DIARY_LOG_LEVEL") {
            config.log_level = level;
        }
        Ok(config)
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_base", &self.api_base)
            .field("location_base", &self.location_base)
            .field("api_key", &"<redacted>")
            .field("index_path", &self.index_path)
            .field("request_timeout", &self.request_timeout)
            .field("log_dir", &self.log_dir)
            .field("log_level", &self.log_level)
            .finish()
    }
}
