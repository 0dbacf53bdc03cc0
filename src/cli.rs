// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `bootleg-config`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "bootleg-config",
    version,
    about = "Validate, merge and print Bootleg training configs.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the base config file (JSON, or TOML by extension).
    ///
    /// Default: `$BOOTLEG_CONFIG`, else `config.json` in the current working
    /// directory.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Partial config documents layered over the base, in order.
    #[arg(long = "merge", value_name = "PATH")]
    pub merge: Vec<PathBuf>,

    /// Dotted overrides applied last, e.g. `--set train_config.lr=0.01`.
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// Print the effective document as JSON instead of a summary.
    #[arg(long)]
    pub print: bool,

    /// Write the effective document to this path.
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `BOOTLEG_CONFIG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
