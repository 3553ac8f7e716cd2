//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the snapshot database
//! - `resolve_filter` / `load_state` - Turn filter flags into a built view
//! - `cmd_config` - Show the active sync configuration

use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use clubstat_core::config::{default_config_path, CLIENT_ID_ENV, ID_TOKEN_ENV};
use clubstat_core::{AppState, Database, FilterState, Preset, SyncConfig, Tab};

use crate::cli::FilterArgs;

pub fn open_db(db_path: &Path) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path is not valid UTF-8")?;
    Database::open(path_str).context("Failed to open database")
}

/// Local wall-clock time; presets and "today" are computed from it
pub fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

fn parse_day(value: &str, flag: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid {} date format (use YYYY-MM-DD)", flag))
}

/// Parse filter flags. `--from`/`--to` force the custom preset.
pub fn resolve_filter(args: &FilterArgs) -> Result<(FilterState, Tab)> {
    let tab: Tab = args.tab.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let mut preset: Preset = args.preset.parse().map_err(|e: String| anyhow::anyhow!(e))?;

    let custom_start = args.from.as_deref().map(|d| parse_day(d, "--from")).transpose()?;
    let custom_end = args.to.as_deref().map(|d| parse_day(d, "--to")).transpose()?;
    if custom_start.is_some() || custom_end.is_some() {
        preset = Preset::Custom;
    }
    if let (Some(start), Some(end)) = (custom_start, custom_end) {
        if start > end {
            bail!("--from ({}) is after --to ({})", start, end);
        }
    }

    let filter = FilterState {
        preset,
        custom_start,
        custom_end,
        month: None,
    }
    .with_month(args.month.as_deref());

    Ok((filter, tab))
}

/// Load the stored snapshot and build the view for the given flags
pub fn load_state(db: &Database, args: &FilterArgs) -> Result<AppState> {
    let (mut filter, tab) = resolve_filter(args)?;
    let snapshot = db
        .load_snapshot()
        .context("Failed to load snapshot")?
        .context("No data yet. Run 'clubstat sync' first.")?;

    let now = now();
    let mut state = AppState::new();
    state.set_tab(tab);
    let view = state.set_data(snapshot, now);

    if let Some(month) = &filter.month {
        if !view.month_options.iter().any(|o| &o.key == month) {
            let valid: Vec<&str> = view.month_options.iter().map(|o| o.key.as_str()).collect();
            bail!(
                "No data for month {} (available: {})",
                month,
                if valid.is_empty() { "none".to_string() } else { valid.join(", ") }
            );
        }
    }

    // A half-open custom range takes its other end from the data
    if filter.preset == Preset::Custom {
        filter.custom_start = filter.custom_start.or(state.filter().custom_start);
        filter.custom_end = filter.custom_end.or(state.filter().custom_end);
    }
    state.set_filter(filter, now);

    Ok(state)
}

/// Print the filter line shared by the report commands
pub fn print_filter_line(state: &AppState) {
    let filter = state.filter();
    let mut parts = vec![format!("Range: {}", filter.preset.as_str())];
    if filter.preset == Preset::Custom {
        let day = |d: Option<NaiveDate>| d.map(|d| d.to_string()).unwrap_or_else(|| "…".into());
        parts.push(format!("{} to {}", day(filter.custom_start), day(filter.custom_end)));
    }
    if let Some(month) = &filter.month {
        parts.push(format!("Month: {}", month));
    }
    println!("   {}", parts.join(" │ "));
}

pub fn cmd_config(config_path: Option<&Path>) -> Result<()> {
    let config = SyncConfig::load(config_path).context("Failed to load config")?;

    println!();
    println!("⚙️  Sync Configuration");
    println!("   Source: {}", config.source);
    if let Some(path) = default_config_path() {
        println!("   Override path: {}", path.display());
    }
    println!("   ─────────────────────────────────────────────");
    println!("   {:22} {}", "Endpoint", config.endpoint);
    println!("   {:22} {}", "Client identifier", config.client_identifier);
    println!("   {:22} {}", "Region", config.region);
    println!("   {:22} {}", "Order status page", config.region.order_status_url());
    println!("   {:22} {}s", "Request timeout", config.request_timeout.as_secs());
    println!("   {:22} {}", "Page size", config.page_size);
    println!("   {:22} {}", "Warehouses", config.partitions.join(", "));
    println!("   {:22} {}", "Detail concurrency", config.detail_concurrency);
    println!(
        "   {:22} {} attempts, {}ms x{}",
        "Retry",
        config.retry.max_attempts,
        config.retry.initial_delay.as_millis(),
        config.retry.multiplier
    );
    println!("   {:22} {} years", "Lookback", config.lookback_years);
    println!();

    let set = |name: &str| std::env::var(name).map(|v| !v.trim().is_empty()).unwrap_or(false);
    for name in [CLIENT_ID_ENV, ID_TOKEN_ENV] {
        if set(name) {
            println!("   ✅ {} is set", name);
        } else {
            println!("   ⚠️  {} is not set (required for sync)", name);
        }
    }

    Ok(())
}
