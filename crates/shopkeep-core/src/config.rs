//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! the backend URL, which credential storage backend to use, the last email
//! used to sign in and the session check period.
//!
//! Configuration is stored at `~/.config/shopkeep/config.json`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::auth::SESSION_CHECK_INTERVAL;
use crate::storage::{FileStore, KeyValueStore, KeyringStore};

/// Application name used for config/data/cache directory paths
const APP_NAME: &str = "shopkeep";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const DEFAULT_API_URL: &str = "http://localhost:3000";

/// Environment variable that overrides `api_base_url`
pub const API_URL_ENV: &str = "SHOPKEEP_API_URL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Keyring,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub storage: StorageBackend,
    pub last_email: Option<String>,
    pub session_check_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            storage: StorageBackend::default(),
            last_email: None,
            session_check_secs: SESSION_CHECK_INTERVAL.as_secs(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            Ok(serde_json::from_str(&contents).context("Failed to parse config file")?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Where the file credential store lives
    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    /// Where log files go
    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Backend URL, with `SHOPKEEP_API_URL` taking precedence over the file.
    pub fn effective_api_url(&self) -> String {
        std::env::var(API_URL_ENV)
            .ok()
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| self.api_base_url.clone())
    }

    pub fn session_check_interval(&self) -> Duration {
        Duration::from_secs(self.session_check_secs.max(1))
    }

    /// Open the configured credential storage backend.
    pub fn open_store(&self) -> Result<Arc<dyn KeyValueStore>> {
        Ok(match self.storage {
            StorageBackend::File => Arc::new(FileStore::in_dir(&self.data_dir()?)),
            StorageBackend::Keyring => Arc::new(KeyringStore::new()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config.api_base_url, DEFAULT_API_URL);
        assert_eq!(config.storage, StorageBackend::File);
        assert_eq!(config.session_check_interval(), Duration::from_secs(30));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            api_base_url: "https://admin.example.com/api".to_string(),
            storage: StorageBackend::Keyring,
            last_email: Some("admin@x.com".to_string()),
            session_check_secs: 10,
        };
        config.save_to(&path).unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.api_base_url, config.api_base_url);
        assert_eq!(reloaded.storage, StorageBackend::Keyring);
        assert_eq!(reloaded.last_email.as_deref(), Some("admin@x.com"));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"storage": "keyring"}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.storage, StorageBackend::Keyring);
        assert_eq!(config.api_base_url, DEFAULT_API_URL);
        assert_eq!(config.session_check_secs, 30);
    }
}
