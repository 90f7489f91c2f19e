// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `snapcheck`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "snapcheck",
    version,
    about = "Decide which tasks are up to date, can run incrementally, or must be rebuilt.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Snapcheck.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Snapcheck.toml", global = true)]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SNAPCHECK_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Evaluate every task once and print its verdict.
    Check {
        /// Record every task that is not up to date as successfully
        /// executed, accepting the current state of its files.
        #[arg(long)]
        record: bool,
    },

    /// Check, then keep re-evaluating tasks whose files change until Ctrl-C.
    Watch {
        /// Record re-evaluated tasks as executed.
        #[arg(long)]
        record: bool,
    },

    /// Parse and validate the config, print the tasks, evaluate nothing.
    DryRun,
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
