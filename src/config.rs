//! Configuration management
//!
//! Settings come from an optional `estate-scout.yml` file, then `ESTATE_*`
//! environment variables override whatever the file set. Missing values
//! fall back to defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub cdn: CdnConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            session: SessionConfig::default(),
            cdn: CdnConfig::default(),
        }
    }
}

/// Remote API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:5000/api".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Where the signed-in user and token are kept between runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_session_path")]
    pub path: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            path: default_session_path(),
        }
    }
}

fn default_session_path() -> PathBuf {
    PathBuf::from(".estate-scout/session.json")
}

/// Media CDN upload settings. Uploads are skipped when `upload_url` is unset.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CdnConfig {
    #[serde(default)]
    pub upload_url: Option<String>,
    #[serde(default)]
    pub upload_preset: Option<String>,
}

impl Config {
    /// Load from a YAML file. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;

        Ok(config)
    }

    /// Load from file, then apply environment overrides
    pub fn load_with_env(path: &Path) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("ESTATE_API_BASE_URL") {
            self.api.base_url = url;
        }
        if let Ok(timeout) = std::env::var("ESTATE_HTTP_TIMEOUT_SECS") {
            match timeout.parse() {
                Ok(t) => self.api.timeout_secs = t,
                Err(e) => warn!("Invalid ESTATE_HTTP_TIMEOUT_SECS value: {e}"),
            }
        }
        if let Ok(path) = std::env::var("ESTATE_SESSION_PATH") {
            self.session.path = PathBuf::from(path);
        }
        if let Ok(url) = std::env::var("ESTATE_CDN_UPLOAD_URL") {
            self.cdn.upload_url = Some(url);
        }
        if let Ok(preset) = std::env::var("ESTATE_CDN_UPLOAD_PRESET") {
            self.cdn.upload_preset = Some(preset);
        }
    }
}
