use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::article::DEFAULT_PLACEHOLDER;
use crate::error::ConfigError;

const APP_DIR: &str = "newsreader";
const CONFIG_FILE: &str = "config.json";
pub const API_KEY_ENV: &str = "NEWS_API_KEY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsConfig {
    pub api: ApiConfig,
    pub storage: StorageConfig,
    /// Sentinel the feed puts in place of withheld text.
    pub placeholder: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: String,
    pub query: String,
    pub sort_by: String,
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the favorites file; the config directory when unset.
    pub data_dir: Option<PathBuf>,
    pub favorites_file: String,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            storage: StorageConfig::default(),
            placeholder: DEFAULT_PLACEHOLDER.to_owned(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://newsapi.org/v2/".to_owned(),
            api_key: String::new(),
            query: "Apple".to_owned(),
            sort_by: "popularity".to_owned(),
            request_timeout_seconds: 10,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            favorites_file: "favorites.json".to_owned(),
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl NewsConfig {
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        let dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(dir.join(APP_DIR))
    }

    pub fn config_file_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join(CONFIG_FILE))
    }

    /// Loads the user config, falling back to defaults when it is missing or broken.
    /// `NEWS_API_KEY` overrides the stored key.
    pub fn load() -> Self {
        let mut config = match Self::config_file_path().and_then(|path| Self::load_from(&path)) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "could not load configuration, using defaults");
                Self::default()
            }
        };
        config.apply_env();
        config
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.is_empty() {
                self.api.api_key = key;
            }
        }
    }

    pub fn favorites_path(&self) -> Result<PathBuf, ConfigError> {
        let dir = match &self.storage.data_dir {
            Some(dir) => dir.clone(),
            None => Self::config_dir()?,
        };
        Ok(dir.join(&self.storage.favorites_file))
    }
}
