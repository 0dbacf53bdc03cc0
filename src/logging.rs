// src/logging.rs

//! Logging setup for `bootleg-config` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `BOOTLEG_CONFIG_LOG` environment variable, as `EnvFilter` directives
//!    (e.g. "debug", "bootleg_config::config=trace")
//! 3. default to `info`
//!
//! Logs are sent to STDERR so that `--print` output on stdout stays valid
//! JSON.

use anyhow::Result;
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogLevel;

pub const LOG_ENV_VAR: &str = "BOOTLEG_CONFIG_LOG";

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    fmt()
        .with_env_filter(log_filter(cli_level))
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise logging: {e}"))?;

    Ok(())
}

/// Build the filter: the CLI level wins, then `BOOTLEG_CONFIG_LOG` (any
/// `EnvFilter` directive, e.g. `bootleg_config=debug`), then `info`.
pub fn log_filter(cli_level: Option<LogLevel>) -> EnvFilter {
    match cli_level {
        Some(lvl) => EnvFilter::new(directive(lvl)),
        None => EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("info")),
    }
}

fn directive(lvl: LogLevel) -> &'static str {
    match lvl {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

/// Also used to check `run_config.log_level`.
pub(crate) fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}
