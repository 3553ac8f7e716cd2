//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Clubstat - Warehouse-club spending reports
#[derive(Parser)]
#[command(name = "clubstat")]
#[command(about = "Receipt and online-order analytics for warehouse-club members", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "clubstat.db", global = true)]
    pub db: PathBuf,

    /// Config file (defaults to the data-dir override, then built-in defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Date range, month and tab selection shared by the report commands
#[derive(Args, Debug, Clone)]
pub struct FilterArgs {
    /// Date range preset: all, ytd, last12, custom
    #[arg(long, default_value = "all")]
    pub preset: String,

    /// Custom range start (YYYY-MM-DD); implies --preset custom
    #[arg(long)]
    pub from: Option<String>,

    /// Custom range end (YYYY-MM-DD); implies --preset custom
    #[arg(long)]
    pub to: Option<String>,

    /// Single month (YYYY-MM), or "all"
    #[arg(long)]
    pub month: Option<String>,

    /// Tab: all, warehouse, online, gas
    #[arg(long, default_value = "all")]
    pub tab: String,
}

impl Default for FilterArgs {
    fn default() -> Self {
        Self {
            preset: "all".to_string(),
            from: None,
            to: None,
            month: None,
            tab: "all".to_string(),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download receipts, online orders and order details
    ///
    /// Credentials are read from CLUBSTAT_CLIENT_ID and CLUBSTAT_ID_TOKEN.
    Sync {
        /// Years of history to fetch (defaults to the configured lookback)
        #[arg(long)]
        years: Option<u32>,
    },

    /// Show summary cards for a tab
    Summary {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Show item leaderboards (most spent, most purchased, priciest, price increases)
    Items {
        #[command(flatten)]
        filter: FilterArgs,

        /// Rows per leaderboard
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Show gas fill-ups
    Gas {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// List every trip, newest first
    Visits {
        #[command(flatten)]
        filter: FilterArgs,

        /// Maximum rows to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show a monthly chart as a text table
    Chart {
        #[command(flatten)]
        filter: FilterArgs,

        /// Chart id (see --list); defaults to the tab's first chart
        #[arg(short, long)]
        metric: Option<String>,

        /// List the charts available on the tab
        #[arg(long)]
        list: bool,
    },

    /// List months that have data
    Months,

    /// Show the downloaded details for an online order
    Order {
        /// Order number
        number: String,
    },

    /// Export data to CSV or JSON
    Export {
        #[command(subcommand)]
        export_type: ExportType,
    },

    /// Show the active sync configuration
    Config,
}

#[derive(Subcommand)]
pub enum ExportType {
    /// One row per receipt line and online order line
    Ledger {
        #[command(flatten)]
        filter: FilterArgs,

        /// Output file (defaults to costco-receipts-<range>.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write to stdout instead of a file
        #[arg(long, conflicts_with = "output")]
        stdout: bool,
    },

    /// One row per warehouse visit, online order and gas fill-up
    Trips {
        #[command(flatten)]
        filter: FilterArgs,

        /// Output file (defaults to costco-trips-<tab>.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write to stdout instead of a file
        #[arg(long, conflicts_with = "output")]
        stdout: bool,
    },

    /// The values behind a monthly chart
    Chart {
        #[command(flatten)]
        filter: FilterArgs,

        /// Chart id; defaults to the tab's first chart
        #[arg(short, long)]
        metric: Option<String>,

        /// Output file (defaults to costco-chart-<tab>-<id>.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write to stdout instead of a file
        #[arg(long, conflicts_with = "output")]
        stdout: bool,
    },

    /// The raw stored snapshot as JSON
    Json {
        /// Output file (required)
        #[arg(short, long)]
        output: PathBuf,
    },
}
