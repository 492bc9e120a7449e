//! Configuration loading
//!
//! Settings come from an optional TOML file. Every field has a default, so
//! an empty file (or no file at all) yields a working local server.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::types::HISTORY_LIMIT;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Server configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listen: ListenConfig,
    pub database: DatabaseConfig,
    pub chat: ChatConfig,
}

/// Network listener configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ListenConfig {
    /// Address to bind to (e.g., "0.0.0.0:8080")
    pub address: String,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the SQLite file, or ":memory:"
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "roomchat.db".to_string(),
        }
    }
}

/// Chat behaviour tuning
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Messages replayed on join
    pub history_limit: usize,
    /// Per-connection outbound queue capacity
    pub client_buffer: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_limit: HISTORY_LIMIT,
            client_buffer: 128,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.chat.client_buffer == 0 {
            return Err(ConfigError::Invalid(
                "chat.client_buffer must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();

        assert_eq!(config.listen.address, "127.0.0.1:8080");
        assert_eq!(config.database.path, "roomchat.db");
        assert_eq!(config.chat.history_limit, 50);
        assert_eq!(config.chat.client_buffer, 128);
    }

    #[test]
    fn test_partial_config_overrides() {
        let config = Config::parse(
            r#"
            [listen]
            address = "0.0.0.0:9000"

            [chat]
            history_limit = 20
            "#,
        )
        .unwrap();

        assert_eq!(config.listen.address, "0.0.0.0:9000");
        assert_eq!(config.database.path, "roomchat.db");
        assert_eq!(config.chat.history_limit, 20);
        assert_eq!(config.chat.client_buffer, 128);
    }

    #[test]
    fn test_invalid_toml_is_rejected() {
        let err = Config::parse("[listen\naddress = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_zero_client_buffer_is_rejected() {
        let err = Config::parse("[chat]\nclient_buffer = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let config = Config::parse("[chat]\nclient_buffer = 1").unwrap();
        assert_eq!(config.chat.client_buffer, 1);
    }
}
