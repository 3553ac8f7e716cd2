//! Export command implementations (ledger, trips and chart CSV, raw JSON)

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clubstat_core::export::{
    chart_file_name, chart_rows, ledger_file_name, ledger_rows, to_csv_string, trips_file_name,
    trips_rows, write_csv, write_json_snapshot, CsvRecord,
};
use clubstat_core::report::find_metric;
use clubstat_core::Database;

use super::load_state;
use crate::cli::FilterArgs;

/// Write `rows` (header first) to stdout or a file; the default file name
/// is only used when neither is given
fn emit_rows(
    rows: &[CsvRecord],
    output: Option<PathBuf>,
    stdout: bool,
    default_name: String,
    what: &str,
) -> Result<()> {
    if rows.len() <= 1 {
        eprintln!("⚠️  Nothing to export: no {} match this filter", what);
        return Ok(());
    }

    if stdout {
        let csv = to_csv_string(rows).context("Failed to render CSV")?;
        print!("{}", csv);
        return Ok(());
    }

    let path = output.unwrap_or_else(|| PathBuf::from(default_name));
    let written = write_csv(&path, rows)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("✅ Exported {} {} to {}", written, what, path.display());
    Ok(())
}

pub fn cmd_export_ledger(
    db: &Database,
    args: &FilterArgs,
    output: Option<PathBuf>,
    stdout: bool,
) -> Result<()> {
    let state = load_state(db, args)?;
    let view = state.view();
    let rows = ledger_rows(
        &view.receipts,
        &view.online_orders,
        &state.snapshot().order_details,
    );
    emit_rows(&rows, output, stdout, ledger_file_name(state.filter()), "ledger rows")
}

pub fn cmd_export_trips(
    db: &Database,
    args: &FilterArgs,
    output: Option<PathBuf>,
    stdout: bool,
) -> Result<()> {
    let state = load_state(db, args)?;
    let view = state.view();
    let rows = trips_rows(view.tab, &view.receipt_report, &view.online_report);
    emit_rows(&rows, output, stdout, trips_file_name(view.tab), "trips")
}

pub fn cmd_export_chart(
    db: &Database,
    args: &FilterArgs,
    metric_id: Option<&str>,
    output: Option<PathBuf>,
    stdout: bool,
) -> Result<()> {
    let state = load_state(db, args)?;
    let view = state.view();
    let metric = find_metric(view.tab, metric_id);

    let rows = match metric.build(&view.monthly) {
        Some(dataset) => chart_rows(metric, &dataset),
        None => Vec::new(),
    };
    emit_rows(&rows, output, stdout, chart_file_name(view.tab, metric), "chart months")
}

pub fn cmd_export_json(db: &Database, output: &Path) -> Result<()> {
    let snapshot = db
        .load_snapshot()
        .context("Failed to load snapshot")?
        .context("No data yet. Run 'clubstat sync' first.")?;

    write_json_snapshot(output, &snapshot).context("Failed to write JSON export")?;

    println!("✅ Snapshot exported to: {}", output.display());
    println!("   Receipts:       {}", snapshot.receipts.len());
    println!("   Online orders:  {}", snapshot.online_orders.len());
    println!("   Order details:  {}", snapshot.order_details.len());
    Ok(())
}
