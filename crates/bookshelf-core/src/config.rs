//! Client configuration management.
//!
//! This module handles loading and saving the client configuration, which
//! holds the backend base URL and the last used username.
//!
//! Configuration is stored at `~/.config/bookshelf-cli/config.json`; the
//! `BOOKSHELF_API_URL` environment variable overrides the stored base URL.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "bookshelf-cli";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding the backend base URL
pub const API_URL_ENV: &str = "BOOKSHELF_API_URL";

/// Local development default, used when nothing is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub base_url: Option<String>,
    pub last_username: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
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

    /// Directory holding the credential file
    pub fn credentials_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Effective backend base URL: the environment variable, then the
    /// stored value, then the local development default.
    pub fn api_base_url(&self) -> String {
        std::env::var(API_URL_ENV)
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| self.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    /// Whether the backend is a local development server. Credential
    /// entries drop the secure attribute in that case, like the web
    /// client's cookies.
    pub fn is_local_dev(&self) -> bool {
        let url = self.api_base_url();
        url.starts_with("http://localhost") || url.starts_with("http://127.0.0.1")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_base_url_is_local_dev() {
        let config = Config::default();
        assert_eq!(config.api_base_url(), DEFAULT_BASE_URL);
        assert!(config.is_local_dev());
    }

    #[test]
    fn test_stored_base_url_wins_over_default() {
        let config = Config {
            base_url: Some("https://books.example.com".to_string()),
            last_username: None,
        };
        assert_eq!(config.api_base_url(), "https://books.example.com");
        assert!(!config.is_local_dev());
    }
}
