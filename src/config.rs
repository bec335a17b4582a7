// src/config.rs

//! Runtime configuration
//!
//! Configuration is read from a TOML file (`--config`, or
//! `<config dir>/rombuilder/config.toml` when present). Every key is optional:
//!
//! ```toml
//! snapshot_path = "/home/me/.local/share/rombuilder/definitions.toml"
//! api_host = "https://api.github.com"
//! namespace = "MiSTer-devel"
//! repo_prefix = "Arcade-"
//! per_page = 100
//! http_timeout_secs = 30
//! ```

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Application directory name under the platform data/config dirs
const APP_DIR: &str = "rombuilder";

/// Snapshot file name
const SNAPSHOT_FILE: &str = "definitions.toml";

/// Config file name
const CONFIG_FILE: &str = "config.toml";

/// Largest page the listing endpoint serves; bigger requests are truncated
const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Where the definition snapshot is cached
    pub snapshot_path: PathBuf,
    /// Registry API host
    pub api_host: String,
    /// Account namespace whose repositories publish recipes
    pub namespace: String,
    /// Name prefix of recipe-publishing repositories
    pub repo_prefix: String,
    /// Page size requested from the listing endpoint
    pub per_page: u32,
    /// Timeout applied to every HTTP request
    pub http_timeout_secs: u64,
    /// User agent sent with every HTTP request
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
            api_host: "https://api.github.com".to_string(),
            namespace: "MiSTer-devel".to_string(),
            repo_prefix: "Arcade-".to_string(),
            per_page: 100,
            http_timeout_secs: 30,
            user_agent: format!("rombuilder/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Config {
    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::ConfigError(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from an explicit file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Load from the explicit path if given, else the default location if it
    /// exists, else built-in defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        match default_config_path() {
            Some(path) if path.is_file() => {
                debug!("Loading config from {}", path.display());
                Self::from_file(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// URL of one page of the source listing
    pub fn listing_url(&self, page: u32) -> String {
        format!(
            "{}/users/{}/repos?per_page={}&page={}",
            self.api_host.trim_end_matches('/'),
            self.namespace,
            self.per_page,
            page
        )
    }

    fn validate(&self) -> Result<()> {
        if self.per_page == 0 || self.per_page > MAX_PER_PAGE {
            return Err(Error::ConfigError(format!(
                "per_page must be between 1 and {}, got {}",
                MAX_PER_PAGE, self.per_page
            )));
        }
        if self.api_host.is_empty() || self.namespace.is_empty() {
            return Err(Error::ConfigError(
                "api_host and namespace must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_snapshot_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR).join(SNAPSHOT_FILE))
        .unwrap_or_else(|| PathBuf::from(SNAPSHOT_FILE))
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}
