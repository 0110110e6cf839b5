//! FILENAME: core/drilldown-http/src/config.rs
//! Server and client settings, read from JSON files.
//!
//! Every field has a default, so a config file only needs the fields it
//! changes: `{"data_file": "data.txt", "headers": ["Name", "Date"]}`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use drilldown_engine::logging::LogLevel;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ============================================================================
// SERVER
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub bind: String,

    /// Comma-separated data file, one record per line.
    pub data_file: PathBuf,

    /// Column names. Required unless the file starts with a header row.
    pub headers: Vec<String>,

    pub has_header_row: bool,

    pub log_file: Option<PathBuf>,

    /// "debug", "info", "warn" or "error".
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: "127.0.0.1:8080".to_string(),
            data_file: PathBuf::from("data.txt"),
            headers: Vec::new(),
            has_header_row: false,
            log_file: None,
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let config: ServerConfig = serde_json::from_str(&text)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.has_header_row && self.headers.is_empty() {
            return Err(ConfigError::Invalid(
                "headers must be listed when the data file has no header row".to_string(),
            ));
        }
        self.level()?;
        Ok(())
    }

    pub fn level(&self) -> Result<LogLevel, ConfigError> {
        LogLevel::parse(&self.log_level)
            .ok_or_else(|| ConfigError::Invalid(format!("unknown log level '{}'", self.log_level)))
    }
}

// ============================================================================
// CLIENT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: "http://localhost:8080/".to_string(),
            timeout_ms: 10_000,
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        ClientConfig {
            base_url: base_url.into(),
            ..ClientConfig::default()
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
