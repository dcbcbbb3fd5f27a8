//! Configuration management for the application.
//!
//! This module handles loading, validating, and saving application configuration
//! in TOML format with platform-specific directory resolution. Environment
//! variables override file values once, at load time; nothing is re-read
//! while the server runs.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{DEFAULT_LOOKUP_TIMEOUT_SECS, NSW_PARCEL_URL, QLD_PARCEL_URL};

/// Environment variable naming the only origin allowed by CORS.
pub const ENV_FRONTEND_ORIGIN: &str = "PARCELVIEW_FRONTEND";
/// Environment variable overriding the API base URL handed to clients.
pub const ENV_API_BASE_URL: &str = "PARCELVIEW_API_BASE_URL";
/// Environment variable holding the map widget access token.
pub const ENV_MAP_TOKEN: &str = "PARCELVIEW_MAP_TOKEN";
/// Environment variable overriding the QLD query endpoint.
pub const ENV_QLD_URL: &str = "PARCELVIEW_QLD_URL";
/// Environment variable overriding the NSW query endpoint.
pub const ENV_NSW_URL: &str = "PARCELVIEW_NSW_URL";

/// HTTP listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Origin allowed by CORS; any origin when unset
    pub frontend_origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            frontend_origin: None,
        }
    }
}

/// Upstream cadastre service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// QLD ArcGIS query endpoint
    pub qld_url: String,
    /// NSW ArcGIS query endpoint
    pub nsw_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            qld_url: QLD_PARCEL_URL.to_string(),
            nsw_url: NSW_PARCEL_URL.to_string(),
            timeout_secs: DEFAULT_LOOKUP_TIMEOUT_SECS,
        }
    }
}

/// Settings handed to the frontend and the headless client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the API; empty means same origin as the page
    pub api_base_url: String,
    /// Access token for the map widget
    pub map_token: Option<String>,
}

/// Application configuration.
///
/// # File Location
///
/// - Linux: `~/.config/ParcelView/config.toml`
/// - macOS: `~/Library/Application Support/ParcelView/config.toml`
/// - Windows: `%APPDATA%\ParcelView\config.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP listener
    pub server: ServerConfig,
    /// Upstream lookup services
    pub services: ServiceConfig,
    /// Frontend / client settings
    pub client: ClientConfig,
}

impl Config {
    /// Creates a new Config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the platform-specific config directory path.
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to determine config directory")?
            .join("ParcelView");

        Ok(config_dir)
    }

    /// Gets the full path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Loads configuration from the default config file, then applies
    /// environment overrides.
    ///
    /// If the file doesn't exist, defaults are used.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_file_path()?;
        Self::load_from(&config_path)
    }

    /// Loads configuration from `path`, then applies environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = fs::read_to_string(path)
                .context(format!("Failed to read config file: {}", path.display()))?;
            toml::from_str(&content)
                .context(format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::new()
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Applies overrides from an environment lookup function.
    ///
    /// Blank values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(origin) = get(ENV_FRONTEND_ORIGIN) {
            self.server.frontend_origin = Some(origin);
        }
        if let Some(url) = get(ENV_API_BASE_URL) {
            self.client.api_base_url = url;
        }
        if let Some(token) = get(ENV_MAP_TOKEN) {
            self.client.map_token = Some(token);
        }
        if let Some(url) = get(ENV_QLD_URL) {
            self.services.qld_url = url;
        }
        if let Some(url) = get(ENV_NSW_URL) {
            self.services.nsw_url = url;
        }
    }

    /// Saves configuration to `path` using atomic write.
    ///
    /// Uses temp file + rename pattern for atomic writes.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .context(format!("Failed to create config directory: {}", dir.display()))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;
        let temp_path = path.with_extension("toml.tmp");

        fs::write(&temp_path, content).context(format!(
            "Failed to write temp config file: {}",
            temp_path.display()
        ))?;

        fs::rename(&temp_path, path).context(format!(
            "Failed to rename temp config file to: {}",
            path.display()
        ))?;

        Ok(())
    }

    /// Validates configuration values.
    ///
    /// Checks:
    /// - service URLs are http(s)
    /// - timeout is non-zero
    /// - `api_base_url` is empty or http(s)
    pub fn validate(&self) -> Result<()> {
        for (name, url) in [("qld_url", &self.services.qld_url), ("nsw_url", &self.services.nsw_url)] {
            if !is_http_url(url) {
                anyhow::bail!("services.{name} must be an http(s) URL, got '{url}'");
            }
        }

        if self.services.timeout_secs == 0 {
            anyhow::bail!("services.timeout_secs must be greater than zero");
        }

        if !self.client.api_base_url.is_empty() && !is_http_url(&self.client.api_base_url) {
            anyhow::bail!(
                "client.api_base_url must be empty or an http(s) URL, got '{}'",
                self.client.api_base_url
            );
        }

        Ok(())
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_config_new() {
        let config = Config::new();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.services.qld_url, QLD_PARCEL_URL);
        assert_eq!(config.services.timeout_secs, 10);
        assert!(config.client.api_base_url.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::new();
        config.server.port = 9123;
        config.client.map_token = Some("pk.test".to_string());
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.server.port, 9123);
        assert_eq!(loaded.client.map_token.as_deref(), Some("pk.test"));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load_from(&temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.server, ServerConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[server]\nport = 3001\n").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.services.nsw_url, NSW_PARCEL_URL);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_FRONTEND_ORIGIN, "https://parcels.example"),
            (ENV_MAP_TOKEN, "tok"),
            (ENV_API_BASE_URL, "  "),
        ]
        .into_iter()
        .collect();

        let mut config = Config::new();
        config.apply_env(|key| env.get(key).map(ToString::to_string));

        assert_eq!(config.server.frontend_origin.as_deref(), Some("https://parcels.example"));
        assert_eq!(config.client.map_token.as_deref(), Some("tok"));
        // blank values are ignored
        assert!(config.client.api_base_url.is_empty());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::new();
        config.services.qld_url = "ftp://example".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::new();
        config.services.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::new();
        config.client.api_base_url = "localhost:8000".to_string();
        assert!(config.validate().is_err());
    }
}
