//! Clubstat CLI - Warehouse-club spending reports
//!
//! Usage:
//!   clubstat sync                     Download receipts and online orders
//!   clubstat summary --tab warehouse  Summary cards for a tab
//!   clubstat items --preset ytd       Item leaderboards
//!   clubstat export ledger            Line-level CSV export

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Sync { years } => {
            commands::cmd_sync(&cli.db, cli.config.as_deref(), years).await
        }
        Commands::Summary { filter } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_summary(&db, &filter)
        }
        Commands::Items { filter, limit } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_items(&db, &filter, limit)
        }
        Commands::Gas { filter } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_gas(&db, &filter)
        }
        Commands::Visits { filter, limit } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_visits(&db, &filter, limit)
        }
        Commands::Chart {
            filter,
            metric,
            list,
        } => {
            let db = commands::open_db(&cli.db)?;
            if list {
                commands::cmd_chart_list(&filter)
            } else {
                commands::cmd_chart(&db, &filter, metric.as_deref())
            }
        }
        Commands::Months => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_months(&db)
        }
        Commands::Order { number } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_order(&db, &number)
        }
        Commands::Export { export_type } => {
            let db = commands::open_db(&cli.db)?;
            match export_type {
                ExportType::Ledger {
                    filter,
                    output,
                    stdout,
                } => commands::cmd_export_ledger(&db, &filter, output, stdout),
                ExportType::Trips {
                    filter,
                    output,
                    stdout,
                } => commands::cmd_export_trips(&db, &filter, output, stdout),
                ExportType::Chart {
                    filter,
                    metric,
                    output,
                    stdout,
                } => commands::cmd_export_chart(&db, &filter, metric.as_deref(), output, stdout),
                ExportType::Json { output } => commands::cmd_export_json(&db, &output),
            }
        }
        Commands::Config => commands::cmd_config(cli.config.as_deref()),
    }
}
