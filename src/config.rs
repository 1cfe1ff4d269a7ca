//! Configuration - YAML file in the config directory plus env overrides

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{
    CONFIG_FILE_NAME, DEFAULT_API_BASE_URL, DEFAULT_TIMEOUT_SECS, TOKEN_FILE_NAME,
};
use crate::session::InvalidationPolicy;
use crate::storage::default_config_dir;

pub const ENV_API_URL: &str = "PORTAL_AUTH_API_URL";
pub const ENV_CONFIG_DIR: &str = "PORTAL_AUTH_CONFIG_DIR";
pub const ENV_TIMEOUT_SECS: &str = "PORTAL_AUTH_TIMEOUT_SECS";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub config_dir: PathBuf,
    pub request_timeout_secs: u64,
    pub invalidation: InvalidationPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            config_dir: default_config_dir(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            invalidation: InvalidationPolicy::default(),
        }
    }
}

impl Config {
    /// Load `<config_dir>/config.yaml` if present, then apply env overrides
    pub fn load() -> Result<Self> {
        let dir = std::env::var(ENV_CONFIG_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_config_dir());

        let mut config = Self::load_from_dir(&dir)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Read the config file from a directory; defaults when it is missing
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE_NAME);
        let mut config = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            Self::from_yaml_str(&content)
                .with_context(|| format!("parsing {}", path.display()))?
        } else {
            Config::default()
        };
        config.config_dir = dir.to_path_buf();
        Ok(config)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Config::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Apply overrides from a key lookup (the process environment in `load`)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL) {
            self.api_base_url = url;
        }
        if let Some(dir) = lookup(ENV_CONFIG_DIR) {
            self.config_dir = PathBuf::from(dir);
        }
        if let Some(secs) = lookup(ENV_TIMEOUT_SECS) {
            self.request_timeout_secs = secs
                .trim()
                .parse()
                .with_context(|| format!("{} must be a number of seconds", ENV_TIMEOUT_SECS))?;
        }
        Ok(())
    }

    pub fn token_path(&self) -> PathBuf {
        self.config_dir.join(TOKEN_FILE_NAME)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
