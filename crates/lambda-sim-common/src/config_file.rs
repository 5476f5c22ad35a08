//! Configuration file structures for the simulator gateway.
//!
//! This module defines structures for TOML configuration files:
//! - [`ConfigFile`]: Top-level configuration file structure
//! - [`ServerConfigFile`]: HTTP gateway settings

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::SimulatorConfig;

/// Top-level configuration file structure.
///
/// # Example
///
/// ```toml
/// [simulator]
/// max_concurrency = 10
/// max_instance_lifetime_ms = 750
/// cold_start_delay_ms = 300
/// execution_duration_ms = 9
///
/// [server]
/// bind_addr = "0.0.0.0:8080"
/// request_timeout_secs = 30
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConfigFile {
    /// Simulated platform settings.
    #[serde(default)]
    pub simulator: SimulatorConfig,

    /// HTTP gateway configuration.
    #[serde(default)]
    pub server: ServerConfigFile,
}

impl ConfigFile {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigFileError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigFileError::Io {
            path: path.as_ref().display().to_string(),
            source: e,
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string cannot be parsed as TOML.
    pub fn from_toml(content: &str) -> Result<Self, ConfigFileError> {
        toml::from_str(content).map_err(|e| ConfigFileError::Parse {
            message: e.to_string(),
        })
    }
}

/// HTTP gateway configuration from config file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfigFile {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "defaults::bind_addr")]
    pub bind_addr: String,

    /// Request timeout in seconds.
    #[serde(default = "defaults::request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Enable graceful shutdown.
    #[serde(default = "defaults::graceful_shutdown")]
    pub graceful_shutdown: bool,
}

impl Default for ServerConfigFile {
    fn default() -> Self {
        Self {
            bind_addr: defaults::bind_addr(),
            request_timeout_secs: defaults::request_timeout_secs(),
            graceful_shutdown: defaults::graceful_shutdown(),
        }
    }
}

/// Configuration file errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration file.
    #[error("Failed to parse config file: {message}")]
    Parse { message: String },
}

mod defaults {
    pub fn bind_addr() -> String {
        "0.0.0.0:8080".to_string()
    }

    pub const fn request_timeout_secs() -> u64 {
        30
    }

    pub const fn graceful_shutdown() -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_file() {
        let config = ConfigFile::default();

        assert_eq!(config.server.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.server.request_timeout_secs, 30);
        assert!(config.server.graceful_shutdown);
        assert_eq!(config.simulator.max_concurrency, 10);
    }

    #[test]
    fn test_parse_minimal_config() {
        let toml = r#"
            [simulator]
            max_concurrency = 4
        "#;

        let config = ConfigFile::from_toml(toml).unwrap();

        assert_eq!(config.simulator.max_concurrency, 4);
        // Defaults applied
        assert_eq!(config.simulator.cold_start_delay_ms, 300);
        assert_eq!(config.server.bind_addr, "0.0.0.0:8080");
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [simulator]
            max_concurrency = 25
            max_instance_lifetime_ms = 60_000
            cold_start_delay_ms = 4_000
            execution_duration_ms = 120

            [server]
            bind_addr = "127.0.0.1:9000"
            request_timeout_secs = 60
            graceful_shutdown = false
        "#;

        let config = ConfigFile::from_toml(toml).unwrap();

        assert_eq!(config.simulator.max_concurrency, 25);
        assert_eq!(config.simulator.max_instance_lifetime_ms, 60_000);
        assert_eq!(config.simulator.cold_start_delay_ms, 4_000);
        assert_eq!(config.simulator.execution_duration_ms, 120);
        assert_eq!(config.server.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.server.request_timeout_secs, 60);
        assert!(!config.server.graceful_shutdown);
    }

    #[test]
    fn test_parse_invalid_toml() {
        let invalid = "this is not valid toml [";
        let result = ConfigFile::from_toml(invalid);
        assert!(matches!(result, Err(ConfigFileError::Parse { .. })));
    }

    #[test]
    fn test_missing_file() {
        let result = ConfigFile::from_file("/definitely/not/here.toml");
        assert!(matches!(result, Err(ConfigFileError::Io { .. })));
    }
}
