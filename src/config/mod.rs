//! Configuration management for the freshet refresh engine
//!
//! This module handles loading and validating configuration from environment variables
//! and TOML files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Error;
use crate::reconcile::PublishedScope;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Worker pool configuration
    pub worker: WorkerConfig,

    /// Per-feed refresh configuration
    pub refresh: RefreshConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Worker pool configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Number of concurrent refresh workers
    pub pool_size: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { pool_size: 16 }
    }
}

/// Per-feed refresh configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Entries older than this many days are dropped before filtering (0 disables)
    pub max_entry_age_days: u32,

    /// Which stored entries are consulted when reconciling
    pub published_scope: PublishedScope,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            max_entry_age_days: 0,
            published_scope: PublishedScope::User,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Unset variables fall back to defaults. A variable that is set but
    /// cannot be parsed is an error.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key lookup, e.g. a map in tests
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let pool_size = match lookup("FRESHET_WORKER_POOL_SIZE") {
            Some(v) => v
                .trim()
                .parse::<usize>()
                .with_context(|| format!("Invalid FRESHET_WORKER_POOL_SIZE: {v}"))?,
            None => defaults.worker.pool_size,
        };

        let max_entry_age_days = match lookup("FRESHET_FILTER_ENTRY_MAX_AGE_DAYS") {
            Some(v) => v
                .trim()
                .parse::<u32>()
                .with_context(|| format!("Invalid FRESHET_FILTER_ENTRY_MAX_AGE_DAYS: {v}"))?,
            None => defaults.refresh.max_entry_age_days,
        };

        let published_scope = match lookup("FRESHET_PUBLISHED_SCOPE") {
            Some(v) => v.parse::<PublishedScope>().map_err(anyhow::Error::msg)?,
            None => defaults.refresh.published_scope,
        };

        let level = lookup("FRESHET_LOG_LEVEL").unwrap_or(defaults.logging.level);
        let format = lookup("FRESHET_LOG_FORMAT").unwrap_or(defaults.logging.format);

        Ok(Self {
            worker: WorkerConfig { pool_size },
            refresh: RefreshConfig {
                max_entry_age_days,
                published_scope,
            },
            logging: LoggingConfig { level, format },
        })
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.worker.pool_size == 0 {
            return Err(Error::config("pool_size must be greater than 0"));
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            return Err(Error::config(format!(
                "log format must be 'text' or 'json', got '{}'",
                self.logging.format
            )));
        }

        Ok(())
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}
