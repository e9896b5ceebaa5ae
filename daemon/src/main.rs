//! Awards daemon: administers and votes against an LMDB-backed store.

mod commands;
mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use awards_store_lmdb::{check_data_dir, LmdbEnvironment};
use awards_utils::{init_logging, LogFormat};
use awards_voting::VotingCoordinator;
use clap::Parser;

use crate::commands::Command;
use crate::config::DaemonConfig;

#[derive(Parser)]
#[command(name = "awards-daemon", about = "Awards vote allocation daemon")]
struct Cli {
    /// Data directory for the LMDB store.
    #[arg(long, env = "AWARDS_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// LMDB map size in megabytes.
    #[arg(long, env = "AWARDS_MAP_SIZE_MB")]
    map_size_mb: Option<usize>,

    /// Free votes granted to each newly registered user.
    #[arg(long, env = "AWARDS_DEFAULT_FREE_VOTES")]
    default_free_votes: Option<u32>,

    /// Attempts at crediting back a vote unit before it is reported lost.
    #[arg(long, env = "AWARDS_CREDIT_RETRY_ATTEMPTS")]
    credit_retry_attempts: Option<u32>,

    /// Log format: "human" or "json".
    #[arg(long, env = "AWARDS_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "AWARDS_LOG_LEVEL")]
    log_level: Option<String>,

    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "AWARDS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn resolve_config(&self) -> anyhow::Result<DaemonConfig> {
        let mut config = match &self.config {
            Some(path) => DaemonConfig::from_toml_file(path)?,
            None => DaemonConfig::default(),
        };
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(mb) = self.map_size_mb {
            config.map_size_mb = mb;
        }
        if let Some(n) = self.default_free_votes {
            config.default_free_votes = n;
        }
        if let Some(n) = self.credit_retry_attempts {
            config.credit_retry_attempts = n;
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve_config()?;
    init_logging(config.log_format, &config.log_level);
    if let Some(path) = &cli.config {
        tracing::info!("loaded config from {}", path.display());
    }
    tracing::debug!(config = %config.to_toml_string(), "effective configuration");

    check_data_dir(&config.data_dir).map_err(anyhow::Error::msg)?;
    let env = LmdbEnvironment::open(&config.data_dir, config.max_dbs, config.map_size_bytes())
        .with_context(|| format!("opening store at {}", config.data_dir.display()))?;
    let env = Arc::new(env);
    let coordinator = VotingCoordinator::new(Arc::clone(&env), config.voting_params());

    let output = commands::run(cli.command, &env, &coordinator)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
