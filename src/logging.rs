// src/logging.rs

//! `tracing` subscriber setup.
//!
//! The filter comes from `--log-level` when given. Otherwise `BACKSTAGE_LOG`
//! is read as an `EnvFilter` directive string (`debug`,
//! `backstage::analysis=trace,info`, ...). Without either, `info`.
//!
//! Output goes to stderr; stdout carries the import log and status tables.

use anyhow::{Context, Result};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::cli::LogLevel;

pub const LOG_ENV_VAR: &str = "BACKSTAGE_LOG";

/// Install the global subscriber. Call once, before any command runs.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = match cli_level {
        Some(level) => EnvFilter::default().add_directive(LevelFilter::from(level).into()),
        None => env_filter()?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
        .context("installing tracing subscriber")
}

fn env_filter() -> Result<EnvFilter> {
    match std::env::var(LOG_ENV_VAR) {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(directives.trim())
            .with_context(|| format!("invalid {LOG_ENV_VAR} value {directives:?}")),
        _ => Ok(EnvFilter::new("info")),
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}
