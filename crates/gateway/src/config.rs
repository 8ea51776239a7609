//! Configuration management for the HDFS gateway.
//!
//! This module provides TOML-based configuration file loading and saving.
//! The default configuration path is `~/.config/hdfs-gateway/config.toml`.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default listen address, matching the port the service has always used.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";

/// Default bound on a single external command (10 minutes).
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 600;

/// Upper bound on `command_timeout_secs` (one day).
pub const MAX_COMMAND_TIMEOUT_SECS: u64 = 86_400;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("bind_addr must be a socket address like 0.0.0.0:5000, got {0}")]
    InvalidBindAddr(String),

    #[error("log_level must be one of: trace, debug, info, warn, error; got {0}")]
    InvalidLogLevel(String),

    #[error("command_timeout_secs must be between 1 and 86400, got {0}")]
    InvalidCommandTimeout(u64),

    #[error("max_size must be greater than 0, got {0}")]
    InvalidMaxSize(u64),

    #[error("hdfs_bin not found: {0}")]
    InvalidHdfsBin(String),
}

/// Valid log level values for tracing configuration.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Main configuration structure for the gateway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration.
    pub server: ServerConfig,

    /// Remote filesystem client configuration.
    pub hdfs: HdfsConfig,

    /// Upload and temporary file configuration.
    pub upload: UploadConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    pub bind_addr: String,

    /// Logging level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Directory for daily-rolling log files. Logs go to stderr only when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

/// Remote filesystem client configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HdfsConfig {
    /// Remote directory all request paths are relative to.
    pub base_dir: String,

    /// The `hdfs` executable, by name or absolute path.
    pub hdfs_bin: String,

    /// Bound on a single external command, in seconds.
    pub command_timeout_secs: u64,
}

/// Upload and temporary file configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UploadConfig {
    /// Local directory for temporary upload and download files.
    pub temp_dir: PathBuf,

    /// Maximum request body size in bytes (default: 1GB).
    pub max_size: u64,

    /// The `unzip` executable used for folder uploads.
    pub unzip_bin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

impl Default for HdfsConfig {
    fn default() -> Self {
        Self {
            base_dir: String::new(),
            hdfs_bin: "hdfs".to_string(),
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            temp_dir: std::env::temp_dir().join("hdfs-gateway"),
            max_size: 1024 * 1024 * 1024, // 1GB
            unzip_bin: "unzip".to_string(),
        }
    }
}

impl HdfsConfig {
    /// The command timeout as a [`Duration`].
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

/// Returns the default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hdfs-gateway")
        .join("config.toml")
}

impl Config {
    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables take precedence over config file values.
    /// Supported variables:
    /// - HDFS_GATEWAY_BIND_ADDR: Override listen address
    /// - HDFS_GATEWAY_BASE_DIR: Override remote base directory
    /// - HDFS_GATEWAY_LOG_LEVEL: Override log level (trace, debug, info, warn, error)
    /// - HDFS_GATEWAY_HDFS_BIN: Override the hdfs executable
    pub fn apply_env_overrides(&mut self) {
        if let Some(addr) = non_empty_env("HDFS_GATEWAY_BIND_ADDR") {
            tracing::info!("Overriding bind_addr from environment: {}", addr);
            self.server.bind_addr = addr;
        }

        if let Some(base) = non_empty_env("HDFS_GATEWAY_BASE_DIR") {
            tracing::info!("Overriding base_dir from environment: {}", base);
            self.hdfs.base_dir = base;
        }

        if let Some(level) = non_empty_env("HDFS_GATEWAY_LOG_LEVEL") {
            tracing::info!("Overriding log_level from environment: {}", level);
            self.server.log_level = level;
        }

        if let Some(bin) = non_empty_env("HDFS_GATEWAY_HDFS_BIN") {
            tracing::info!("Overriding hdfs_bin from environment: {}", bin);
            self.hdfs.hdfs_bin = bin;
        }
    }

    /// Validate the configuration values.
    ///
    /// Returns an error if any configuration value is outside the valid range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.bind_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::InvalidBindAddr(self.server.bind_addr.clone()));
        }

        let level = self.server.log_level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.server.log_level.clone()));
        }

        let timeout = self.hdfs.command_timeout_secs;
        if !(1..=MAX_COMMAND_TIMEOUT_SECS).contains(&timeout) {
            return Err(ConfigError::InvalidCommandTimeout(timeout));
        }

        if self.upload.max_size == 0 {
            return Err(ConfigError::InvalidMaxSize(self.upload.max_size));
        }

        let hdfs_bin = Path::new(&self.hdfs.hdfs_bin);
        let found = if hdfs_bin.is_absolute() {
            hdfs_bin.exists()
        } else {
            which::which(&self.hdfs.hdfs_bin).is_ok()
        };
        if !found {
            return Err(ConfigError::InvalidHdfsBin(self.hdfs.hdfs_bin.clone()));
        }

        Ok(())
    }

    /// Load configuration from a file.
    ///
    /// If the file does not exist, returns the default configuration.
    /// If the file exists but is invalid TOML, returns an error with
    /// a helpful message.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self> {
        Self::load(default_config_path())
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| anyhow::anyhow!("Invalid TOML configuration: {}", format_toml_error(&e)))
    }

    /// Save configuration to a file.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = self.to_toml()?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::debug!("Configuration saved to {:?}", path);
        Ok(())
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Format a TOML deserialization error for user-friendly display.
fn format_toml_error(error: &toml::de::Error) -> String {
    let mut msg = error.message().to_string();

    if let Some(span) = error.span() {
        msg.push_str(&format!(" (at position {}..{})", span.start, span.end));
    }

    msg
}
