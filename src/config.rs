//! Configuration loader and validator for the inventory client.
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "inventory.yaml";
pub const API_URL_ENV: &str = "INVENTORY_API_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Config {
    #[serde(default)]
    pub api: Api,
    #[serde(default)]
    pub ui: Ui,
}

/// Backend REST settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Api {
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for Api {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".into(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_user_agent() -> String {
    "inventory-client/0.1".into()
}

/// Presentation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ui {
    pub notice_ttl_ms: u64,
}

impl Default for Ui {
    fn default() -> Self {
        Self { notice_ttl_ms: 5000 }
    }
}

impl Config {
    pub fn notice_ttl(&self) -> Duration {
        Duration::from_millis(self.ui.notice_ttl_ms)
    }

    /// Parsed backend base URL. Only valid after `validate` passed.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.api.base_url).map_err(|_| ConfigError::Invalid("api.base_url must be a valid URL"))
    }

    /// Apply `INVENTORY_API_URL` if it is set and non-empty.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api.base_url = url.trim().to_string();
            }
        }
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `inventory.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
    let content = fs::read_to_string(path)?;
    let mut cfg: Config = serde_yaml::from_str(&content)?;
    cfg.apply_env();
    validate(&cfg)?;
    Ok(cfg)
}

/// Like `load`, but a missing file yields the built-in defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
    if path.exists() {
        return load(Some(path));
    }
    let mut cfg = Config::default();
    cfg.apply_env();
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.api.base_url.trim().is_empty() {
        return Err(ConfigError::Invalid("api.base_url must be non-empty"));
    }
    let url = cfg.base_url()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Invalid("api.base_url must use http or https"));
    }
    if cfg.api.user_agent.trim().is_empty() {
        return Err(ConfigError::Invalid("api.user_agent must be non-empty"));
    }
    if cfg.ui.notice_ttl_ms == 0 {
        return Err(ConfigError::Invalid("ui.notice_ttl_ms must be > 0"));
    }
    Ok(())
}

/// Example YAML with every supported key.
pub fn example() -> &'static str {
    r#"api:
  # Backend serving /products
  base_url: "http://localhost:8000"
  user_agent: "inventory-client/0.1"

ui:
  # How long success/error notices stay visible
  notice_ttl_ms: 5000
"#
}
