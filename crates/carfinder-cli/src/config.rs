//! Configuration file support

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use carfinder_api::DEFAULT_BASE_URL;

/// Configuration for carfinder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the Car Finder server
    pub server_url: String,
    /// Seconds between alert feed polls
    pub alerts_poll_secs: u64,
    /// Retries for a chat request that fails before any data arrives
    pub max_retries: u32,
    /// User whose alerts are shown
    pub user_id: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_BASE_URL.to_string(),
            alerts_poll_secs: 30,
            max_retries: 0,
            user_id: None,
        }
    }
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("carfinder")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("CARFINDER_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from file, then apply environment overrides
    pub fn load() -> Self {
        let mut config = Self::load_file();
        if let Ok(url) = std::env::var("CARFINDER_SERVER_URL") {
            if !url.trim().is_empty() {
                config.server_url = url;
            }
        }
        config
    }

    fn load_file() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content).unwrap_or_else(|e| {
                eprintln!("Warning: Failed to parse config file: {}", e);
                Self::default()
            }),
            Err(e) => {
                eprintln!("Warning: Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    /// Parse config from TOML text
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Save config to file
    pub fn save(&self) -> std::io::Result<()> {
        let path = Self::config_path();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    /// Create a default config file if it doesn't exist
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }

        Config::default().save()?;
        Ok(path)
    }

    /// Poll interval, never shorter than one second
    pub fn alerts_interval(&self) -> Duration {
        Duration::from_secs(self.alerts_poll_secs.max(1))
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# carfinder configuration file
# Place at ~/.config/carfinder/config.toml (Linux/Mac) or %APPDATA%\carfinder\config.toml (Windows)

# Car Finder server (CARFINDER_SERVER_URL overrides this)
server_url = "http://localhost:8000"

# Seconds between alert feed polls with --watch-alerts
alerts_poll_secs = 30

# Retries for chat requests that fail before the reply starts (0 disables)
max_retries = 0

# User whose alerts are listed (optional)
# user_id = "demo-user"
"#
}
