//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Default configuration file, used only when it exists in the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "conveyor.toml";

/// Conveyor -- stream remote log streams as a continuous byte stream.
///
/// Use `conveyor <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "conveyor", version, about, long_about = None)]
pub struct Cli {
    /// Path to the conveyor.toml configuration file.
    ///
    /// When omitted, ./conveyor.toml is used if present, otherwise defaults.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format for reports (log bytes are always written raw).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Stream one remote log stream to stdout until interrupted.
    Tail(TailArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- tail ----

/// Stream a log stream to stdout.
#[derive(Args, Debug)]
pub struct TailArgs {
    /// Log group name.
    #[arg(short, long)]
    pub group: String,

    /// Log stream name.
    #[arg(short, long)]
    pub stream: String,

    /// Start from the oldest event instead of the newest.
    #[arg(long)]
    pub start_from_head: bool,

    /// AWS region (overrides config and environment).
    #[arg(long)]
    pub region: Option<String>,

    /// Poll interval in milliseconds (overrides config).
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    /// Print a summary report to stderr when the stream ends.
    #[arg(long)]
    pub summary: bool,
}

// ---- config ----

/// Manage conveyor configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, log_stream).
        #[arg(long)]
        section: Option<String>,
    },
}
