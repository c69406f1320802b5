//! Tracing subscriber setup.
//!
//! Scan results and reports go to stdout. Diagnostics go to stderr through
//! `tracing`, so piping `--format json` output stays clean.

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable output
    Pretty,
    /// One JSON object per line
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

#[derive(Error, Debug)]
pub enum LogInitError {
    #[error("Invalid log filter: {0}")]
    Filter(String),

    #[error("Failed to install global subscriber: {0}")]
    SetGlobal(String),
}

/// Installs the global subscriber, writing to stderr.
///
/// `RUST_LOG`, when set, replaces `level` entirely.
pub fn init(level: Level, format: LogFormat) -> Result<(), LogInitError> {
    let filter = build_filter(level, std::env::var("RUST_LOG").ok())?;

    let result = match format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .try_init(),
    };

    result.map_err(|e| LogInitError::SetGlobal(e.to_string()))
}

fn build_filter(level: Level, rust_log: Option<String>) -> Result<EnvFilter, LogInitError> {
    let directives = rust_log
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| level.to_string());
    EnvFilter::try_new(&directives).map_err(|e| LogInitError::Filter(e.to_string()))
}
