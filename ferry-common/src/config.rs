//! Configuration management for the Ferry bot.
//!
//! Configuration lives in a single JSON file at `~/.ferry/config.json`.
//!
//! # Configuration Priority
//!
//! 1. Environment variables
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `TELEGRAM_BOT_TOKEN` → bot.token
//! - `FERRY_API_BASE` → bot.api_base
//! - `FERRY_ALLOWED_USERS` → bot.allowed_users (comma separated)
//! - `FERRY_LOG_LEVEL` → observability.log_level
//! - `FERRY_LOG_FORMAT` → observability.log_format

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".ferry"),
        |dirs| dirs.home_dir().join(".ferry"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Top-level Ferry configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Bot credentials and access control
    #[serde(default)]
    pub bot: BotConfig,

    /// Logging configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Bot credentials and operator access control.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Telegram Bot API token
    #[serde(default)]
    pub token: String,

    /// Base URL of the Bot API. Only overridden in tests or when
    /// running against a local Bot API server.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Usernames or numeric user ids allowed to operate the bot.
    /// `*` allows everyone.
    #[serde(default = "default_allowed_users")]
    pub allowed_users: Vec<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_base: default_api_base(),
            allowed_users: default_allowed_users(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.telegram.org".into()
}

fn default_allowed_users() -> Vec<String> {
    vec!["*".into()]
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Base log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Output format: "json" or "pretty"
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

impl Config {
    /// Load configuration from the default path, applying environment
    /// variable overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path())
    }

    /// Load configuration from an explicit path. A missing file is not
    /// an error; defaults are used.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("parsing config file {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var("TELEGRAM_BOT_TOKEN") {
            if !token.is_empty() {
                self.bot.token = token;
            }
        }
        if let Ok(base) = std::env::var("FERRY_API_BASE") {
            if !base.is_empty() {
                self.bot.api_base = base;
            }
        }
        if let Ok(users) = std::env::var("FERRY_ALLOWED_USERS") {
            if !users.is_empty() {
                self.bot.allowed_users = users
                    .split(',')
                    .map(|u| u.trim().to_string())
                    .filter(|u| !u.is_empty())
                    .collect();
            }
        }
        if let Ok(level) = std::env::var("FERRY_LOG_LEVEL") {
            if !level.is_empty() {
                self.observability.log_level = level;
            }
        }
        if let Ok(format) = std::env::var("FERRY_LOG_FORMAT") {
            if !format.is_empty() {
                self.observability.log_format = format;
            }
        }
    }

    /// Check that the configuration is complete enough to start the bot.
    pub fn validate(&self) -> Result<()> {
        if self.bot.token.is_empty() {
            bail!("bot token is not set (config file or TELEGRAM_BOT_TOKEN)");
        }
        if self.bot.allowed_users.is_empty() {
            bail!("allowed_users is empty; use \"*\" to allow everyone");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable() {
        let config = Config::default();
        assert_eq!(config.bot.api_base, "https://api.telegram.org");
        assert_eq!(config.bot.allowed_users, vec!["*".to_string()]);
        assert_eq!(config.observability.log_level, "info");
        assert_eq!(config.observability.log_format, "pretty");
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.json");
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn file_values_are_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{
                "bot": { "token": "123:ABC", "allowed_users": ["alice"] },
                "observability": { "log_level": "debug" }
            }"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.bot.allowed_users, vec!["alice".to_string()]);
        assert_eq!(config.observability.log_level, "debug");
        // Unspecified field keeps its default
        assert_eq!(config.observability.log_format, "pretty");
    }

    #[test]
    fn partial_file_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{}").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.bot.api_base, "https://api.telegram.org");
    }

    #[test]
    fn invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();

        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn validate_rejects_empty_token() {
        let config = Config::default();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.bot.token = "123:ABC".into();
        assert!(config.validate().is_ok());
    }
}
