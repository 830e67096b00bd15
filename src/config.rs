//! Configuration management for the stats engine
//!
//! Configuration is read from TOML, optionally overridden by environment
//! variables, and falls back to defaults for every missing field.
//!
//! ```toml
//! [stats]
//! num_workers = 8
//! shard_size = 64
//! parallel_threshold = 128
//!
//! [scratch]
//! max_buffers = 256
//! max_retained_capacity = 4096
//!
//! [logging]
//! log_level = "info"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Sharded execution settings
    #[serde(default)]
    pub stats: StatsConfig,

    /// Scratch buffer pool settings
    #[serde(default)]
    pub scratch: ScratchConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Sharded execution configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StatsConfig {
    /// Number of worker threads
    #[serde(default = "default_workers")]
    pub num_workers: usize,

    /// Blocks folded by one processor before merging
    #[serde(default = "default_shard_size")]
    pub shard_size: usize,

    /// Minimum number of blocks before work is spread across workers
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: usize,
}

/// Scratch buffer pool configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScratchConfig {
    /// Idle buffers kept for reuse
    #[serde(default = "default_max_buffers")]
    pub max_buffers: usize,

    /// Buffers grown past this many bytes are released to the allocator
    #[serde(default = "default_max_retained_capacity")]
    pub max_retained_capacity: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit JSON log lines instead of human readable ones
    #[serde(default)]
    pub json: bool,
}

// Default value functions
fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
fn default_shard_size() -> usize { 64 }
fn default_parallel_threshold() -> usize { 128 }
fn default_max_buffers() -> usize { 256 }
fn default_max_retained_capacity() -> usize { 4096 }
fn default_log_level() -> String { "info".to_string() }

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            num_workers: default_workers(),
            shard_size: default_shard_size(),
            parallel_threshold: default_parallel_threshold(),
        }
    }
}

impl Default for ScratchConfig {
    fn default() -> Self {
        Self {
            max_buffers: default_max_buffers(),
            max_retained_capacity: default_max_retained_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json: false,
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        toml::from_str(&contents).map_err(|e| {
            Error::Configuration(format!("Failed to parse config file {}: {}", path.display(), e))
        })
    }

    /// Load configuration with environment variable overrides
    pub fn from_file_with_env(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from environment variables only
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Apply environment variable overrides
    ///
    /// Unparseable values are ignored and the current setting is kept.
    pub fn apply_env_overrides(&mut self) {
        if let Some(workers) = env_parse("LOGSTATS_WORKERS") {
            self.stats.num_workers = workers;
        }
        if let Some(shard_size) = env_parse("LOGSTATS_SHARD_SIZE") {
            self.stats.shard_size = shard_size;
        }
        if let Some(threshold) = env_parse("LOGSTATS_PARALLEL_THRESHOLD") {
            self.stats.parallel_threshold = threshold;
        }
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            self.logging.log_level = log_level;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.stats.num_workers == 0 {
            return Err(Error::Configuration("Worker count must be > 0".to_string()));
        }
        if self.stats.shard_size == 0 {
            return Err(Error::Configuration("Shard size must be > 0".to_string()));
        }
        if self.scratch.max_retained_capacity == 0 {
            return Err(Error::Configuration(
                "Scratch buffer retained capacity must be > 0".to_string(),
            ));
        }
        if self.logging.log_level.trim().is_empty() {
            return Err(Error::Configuration("Log level cannot be empty".to_string()));
        }
        Ok(())
    }

    /// Save configuration to TOML file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Serialization(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(&path, contents).map_err(|e| {
            Error::Configuration(format!("Failed to write config file {}: {}", path.display(), e))
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.stats.num_workers > 0);
        assert_eq!(config.stats.shard_size, 64);
        assert_eq!(config.scratch.max_buffers, 256);
        assert_eq!(config.logging.log_level, "info");
    }

    #[test]
    fn test_config_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_shard_size() {
        let mut config = Config::default();
        config.stats.shard_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str("[stats]\nshard_size = 8\n").unwrap();
        assert_eq!(config.stats.shard_size, 8);
        assert_eq!(config.stats.parallel_threshold, 128);
        assert_eq!(config.scratch.max_retained_capacity, 4096);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logstats.toml");

        let mut config = Config::default();
        config.stats.num_workers = 3;
        config.logging.log_level = "debug".to_string();
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.stats.num_workers, 3);
        assert_eq!(loaded.logging.log_level, "debug");
    }

    #[test]
    fn test_missing_file() {
        let err = Config::from_file("/nonexistent/logstats.toml").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_env_override() {
        std::env::set_var("LOGSTATS_SHARD_SIZE", "17");
        let config = Config::from_env();
        assert_eq!(config.stats.shard_size, 17);
        std::env::remove_var("LOGSTATS_SHARD_SIZE");
    }
}
