//! Command-line interface (CLI) argument parsing module.
//!
//! This module provides CLI argument parsing using `clap`.
//! It supports multiple commands: interactive mode, latency run,
//! listing providers, and exporting the provider catalog.

use crate::dns::types::{AddressFamily, RunConfig, Transport};
use crate::error::Result;
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// CLI argument parser using clap derive macro.
///
/// # Example
///
/// ```ignore
/// let cli = Cli::parse();
/// match cli.command {
///     Some(Commands::Run(args)) => { /* ... */ }
///     Some(Commands::List { .. }) => { /* ... */ }
///     None => { /* interactive mode */ }
/// }
/// ```
#[derive(Parser, Debug)]
#[command(
    name = "dnslat",
    version,
    about = "DNS resolver latency benchmark",
    long_about = "Measures DNS resolution latency across public resolvers and ranks them, \
                  from the command line or an interactive terminal UI",
    infer_subcommands = true
)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode (only errors)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "table")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format (default, human-readable)
    #[default]
    Table,
    /// JSON format
    Json,
    /// CSV format
    Csv,
    /// TSV format (tab-separated)
    Tsv,
}

impl OutputFormat {
    /// Get all available output format names.
    #[must_use]
    pub fn names() -> &'static [&'static str] {
        &["table", "json", "csv", "tsv"]
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "tsv" => Ok(Self::Tsv),
            _ => Err(format!(
                "Unknown format: {}. Valid options are: {:?}",
                s,
                Self::names()
            )),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::Json => write!(f, "json"),
            Self::Csv => write!(f, "csv"),
            Self::Tsv => write!(f, "tsv"),
        }
    }
}

/// Available commands for the dnslat CLI.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Launch the interactive terminal user interface (TUI).
    ///
    /// Select providers, tune the run settings and browse past runs.
    #[command(alias = "i")]
    Interactive {
        /// Load a custom catalog file (JSON format)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Measure and rank provider latency.
    ///
    /// Every selected provider is probed concurrently; results are ranked
    /// fastest first, failed providers last.
    #[command(alias = "r")]
    Run(RunArgs),

    /// List the providers of the catalog.
    #[command(alias = "l")]
    List {
        /// Catalog file
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Show only providers reachable over IPv6
        #[arg(long = "ipv6")]
        ipv6_only: bool,
    },

    /// Export the provider catalog to a JSON file.
    ///
    /// The exported file can be edited and loaded back with `--file`.
    #[command(alias = "e")]
    Export {
        /// Output file path
        #[arg(short, long, default_value = "catalog.json")]
        output: PathBuf,
    },
}

/// Arguments of the `run` command.
#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Catalog file (JSON format)
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Only test providers with this name (repeatable)
    #[arg(short, long = "provider")]
    pub providers: Vec<String>,

    /// Additional providers (format: IPv4#Name or IPv4,IPv6#Name)
    #[arg(long = "dns")]
    pub dns_servers: Vec<String>,

    /// Lookups per domain (1-10)
    #[arg(short, long, default_value = "3", value_parser = clap::value_parser!(u8).range(1..=10))]
    pub count: u8,

    /// Timeout per lookup in seconds (1-10)
    #[arg(short, long, default_value = "3", value_parser = clap::value_parser!(u64).range(1..=10))]
    pub timeout: u64,

    /// Query over TCP instead of UDP
    #[arg(long)]
    pub tcp: bool,

    /// Prefer IPv6 addresses when the provider has one
    #[arg(long)]
    pub ipv6: bool,

    /// Run each provider's lookups one at a time
    #[arg(long)]
    pub sequential: bool,

    /// Number of consecutive runs; with more than one the history is printed
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u8).range(1..=10))]
    pub rounds: u8,

    /// Also export the last run to this CSV file
    #[arg(long)]
    pub csv: Option<PathBuf>,
}

impl RunArgs {
    /// Build the run configuration these arguments describe.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is out of range.
    pub fn to_config(&self) -> Result<RunConfig> {
        let config = RunConfig {
            tests_per_domain: usize::from(self.count),
            timeout: Duration::from_secs(self.timeout),
            transport: if self.tcp { Transport::Tcp } else { Transport::Udp },
            family: if self.ipv6 { AddressFamily::V6 } else { AddressFamily::V4 },
            parallel: !self.sequential,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Parse CLI arguments and return verbose flag.
///
/// # Returns
///
/// Returns a tuple of `(Cli, verbose)` where `verbose` indicates
/// whether verbose logging was enabled.
#[must_use]
pub fn parse_verbose() -> (Cli, bool) {
    let cli = Cli::parse();
    let verbose = cli.verbose;
    (cli, verbose)
}
