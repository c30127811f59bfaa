//! Configuration Module
//!
//! This module defines all configuration structures for the notary node.
//! Configuration is loaded from TOML files and parsed using serde.

use serde::Deserialize;
use std::fs;

/// Main configuration structure
///
/// Contains all configuration sections for the node.
/// Loaded from a TOML file (e.g., config/default.toml).
///
/// # Example TOML
/// ```toml
/// [api]
/// host = "127.0.0.1"
/// port = 8000
///
/// [database]
/// url = "sqlite://chaindata.db"
/// max_connections = 4
///
/// [validation]
/// window_seconds = 300
/// protocol_tag = "starRegistry"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
}

/// API server configuration
///
/// # Fields
/// - `host`: IP address to bind to (e.g., "127.0.0.1" or "0.0.0.0")
/// - `port`: TCP port to listen on (e.g., 8000)
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

/// Block store configuration
///
/// # Fields
/// - `url`: SQLite connection URL (e.g., "sqlite://chaindata.db"), or `memory`
///   for a non-persistent in-memory store
/// - `max_connections`: Connection pool size
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn is_memory(&self) -> bool {
        self.url == "memory"
    }
}

/// Validation pool configuration
///
/// # Fields
/// - `window_seconds`: How long a validation request stays open
/// - `protocol_tag`: Last component of every challenge message
/// - `sweep_interval_ms`: How often expired requests are evicted in the background
/// - `max_story_len`: Longest star story accepted for registration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub window_seconds: u64,
    pub protocol_tag: String,
    pub sweep_interval_ms: u64,
    pub max_story_len: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            window_seconds: 300,
            protocol_tag: "starRegistry".to_string(),
            sweep_interval_ms: 1000,
            max_story_len: 250,
        }
    }
}

fn default_max_connections() -> u32 {
    4
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the TOML configuration file
    ///
    /// # Returns
    /// * `Ok(Config)` if the file was successfully loaded and parsed
    /// * `Err` if the file couldn't be read or the TOML is invalid
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}
