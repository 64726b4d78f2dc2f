//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use lm_core::MAX_HISTORY_DAYS;

/// License usage monitor.
///
/// Collects snapshots from the license manager's status report and summarizes
/// license usage by hour of day, by day and by user.
#[derive(Debug, Parser)]
#[command(name = "lmstat", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show stored usage per product.
    Status,

    /// Collect a status report and store its usage records.
    Collect {
        /// Read a captured report instead of running the status command.
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Print the parsed records as JSON lines instead of storing them.
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the hourly usage profile of one product.
    List {
        /// Product to summarize.
        #[arg(default_value = "MATLAB")]
        product: String,

        /// Number of days of history to include.
        #[arg(long, value_parser = history_days_parser())]
        days: Option<u32>,

        /// Output the full profile as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Export summary tables for every tracked product.
    Export {
        /// Directory to write the TSV files into.
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Number of days of history to include.
        #[arg(long, value_parser = history_days_parser())]
        days: Option<u32>,
    },
}

fn history_days_parser() -> clap::builder::RangedI64ValueParser<u32> {
    clap::value_parser!(u32).range(1..=i64::from(MAX_HISTORY_DAYS))
}
