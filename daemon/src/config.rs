//! Daemon configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use awards_types::VotingParams;
use awards_utils::LogFormat;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Configuration for the awards daemon.
///
/// Can be loaded from a TOML file via [`DaemonConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Directory holding the LMDB environment.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// LMDB map size in megabytes.
    #[serde(default = "default_map_size_mb")]
    pub map_size_mb: usize,

    #[serde(default = "default_max_dbs")]
    pub max_dbs: u32,

    /// Free votes granted to each new user.
    #[serde(default = "default_free_votes")]
    pub default_free_votes: u32,

    /// Attempts at crediting back a vote unit before it is reported lost.
    #[serde(default = "default_credit_retry_attempts")]
    pub credit_retry_attempts: u32,

    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./awards_data")
}

fn default_map_size_mb() -> usize {
    1024
}

fn default_max_dbs() -> u32 {
    16
}

fn default_free_votes() -> u32 {
    VotingParams::default().default_free_votes
}

fn default_credit_retry_attempts() -> u32 {
    VotingParams::default().credit_retry_attempts
}

fn default_log_format() -> LogFormat {
    LogFormat::Human
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl DaemonConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("DaemonConfig is always serializable to TOML")
    }

    pub fn voting_params(&self) -> VotingParams {
        VotingParams {
            default_free_votes: self.default_free_votes,
            credit_retry_attempts: self.credit_retry_attempts,
        }
    }

    pub fn map_size_bytes(&self) -> usize {
        self.map_size_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            map_size_mb: default_map_size_mb(),
            max_dbs: default_max_dbs(),
            default_free_votes: default_free_votes(),
            credit_retry_attempts: default_credit_retry_attempts(),
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}
