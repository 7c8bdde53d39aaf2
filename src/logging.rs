//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! The filter comes from, in order:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `REGOLITH_LOG`, parsed as an `EnvFilter` directive list
//!    (e.g. "debug" or "warn,regolith_filters=debug")
//! 3. `info`
//!
//! Logs go to STDERR, filter output included.

use anyhow::{Result, anyhow};
use clap::ValueEnum;
use tracing_subscriber::{EnvFilter, fmt};

pub const LOG_ENV: &str = "REGOLITH_LOG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Initialise the global logging subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV).ok();
    fmt()
        .with_env_filter(filter_for(cli_level, env.as_deref()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!("failed to initialise logging: {err}"))
}

/// Pick the filter; a blank or unparsable env value falls back to `info`.
fn filter_for(cli_level: Option<LogLevel>, env: Option<&str>) -> EnvFilter {
    if let Some(level) = cli_level {
        return EnvFilter::new(level.directive());
    }
    env.map(str::trim)
        .filter(|directives| !directives.is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}
