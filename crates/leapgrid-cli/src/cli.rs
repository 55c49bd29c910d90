//! CLI argument definitions for leapgrid.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `snapshot` | Run a full acquisition pass and write the CSV artifacts |
//! | `quote` | Fetch current equity quotes for symbols |
//! | `decode` | Decode OCC option symbols offline |
//! | `clock` | Show the current market clock state |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--format` | `json` | Output format (json, table) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--strict` | `false` | Treat warnings as errors (exit code 5) |
//! | `--base-url` | Tradier production | Override the upstream base URL |
//! | `--timeout-ms` | `25000` | Per-request timeout in ms |
//!
//! Every command that talks to the upstream requires a Tradier API token in
//! the `TRADIER_TOKEN` environment variable.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Resilient market snapshots over the Tradier API: trend indicators,
/// session VWAP, gap screening, and option position P/L.
#[derive(Debug, Parser)]
#[command(
    name = "leapgrid",
    author,
    version,
    about = "Market snapshot and option P/L CLI for Tradier"
)]
pub struct Cli {
    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Treat warnings as failures (exit code 5).
    ///
    /// Useful for CI/CD pipelines that need strict validation.
    #[arg(long, global = true, default_value_t = false)]
    pub strict: bool,

    /// Override the upstream API base URL.
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Per-request timeout budget in milliseconds.
    #[arg(long, global = true, default_value_t = 25_000)]
    pub timeout_ms: u64,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format for terminal display.
    Table,
    /// Single JSON object output.
    Json,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one full snapshot pass and write the CSV artifacts.
    Snapshot(SnapshotArgs),
    /// Fetch current equity quotes for one or more symbols.
    Quote(QuoteArgs),
    /// Decode OCC option symbols without touching the network.
    Decode(DecodeArgs),
    /// Show the current market clock state.
    Clock,
}

#[derive(Debug, Args)]
pub struct SnapshotArgs {
    /// Path to the run configuration file.
    #[arg(long, default_value = "leapgrid.json")]
    pub config: PathBuf,

    /// Evaluate the session as of this exchange-local time
    /// (`YYYY-MM-DD HH:MM`); defaults to now.
    #[arg(long)]
    pub as_of: Option<String>,

    /// Compute and report without writing any artifact.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct QuoteArgs {
    /// Symbols to quote.
    #[arg(required = true)]
    pub symbols: Vec<String>,
}

#[derive(Debug, Args)]
pub struct DecodeArgs {
    /// OCC option symbols, e.g. META260220C00700000.
    #[arg(required = true)]
    pub codes: Vec<String>,
}
