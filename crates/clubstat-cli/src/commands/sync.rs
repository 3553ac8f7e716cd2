//! Sync command: download everything and replace the stored snapshot

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clubstat_core::client::SyncStage;
use clubstat_core::{
    Credentials, Database, Error, Fetcher, HttpTransport, SyncConfig, SyncProgress, SyncWindow,
};
use tokio::sync::mpsc;

use super::{now, open_db};

pub async fn cmd_sync(db_path: &Path, config_path: Option<&Path>, years: Option<u32>) -> Result<()> {
    let config = SyncConfig::load(config_path).context("Failed to load config")?;
    let credentials = Credentials::from_env()
        .context("Missing credentials (set CLUBSTAT_CLIENT_ID and CLUBSTAT_ID_TOKEN)")?;
    let transport =
        HttpTransport::new(&config, &credentials).context("Failed to create HTTP client")?;

    let years = years.unwrap_or(config.lookback_years);
    let db = open_db(db_path)?;
    let fetcher = Fetcher::new(Arc::new(transport), config);

    run_sync(&db, &fetcher, SyncWindow::ending(now().date(), years)).await
}

/// Fetch with live progress, then store the result. The stored snapshot is
/// left untouched when the fetch fails.
pub async fn run_sync(db: &Database, fetcher: &Fetcher, window: SyncWindow) -> Result<()> {
    println!("🔄 Syncing {} to {}...", window.start, window.end);
    println!("   Endpoint: {}", fetcher.config().endpoint);

    let (tx, mut rx) = mpsc::unbounded_channel::<SyncProgress>();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            // Detail progress ticks per order; only show every 25th and the last
            let show = match event.stage {
                SyncStage::OrderDetails => {
                    event.completed == event.total || event.completed % 25 == 0
                }
                _ => true,
            };
            if show {
                println!("   {}", event.message());
            }
        }
    });

    let result = fetcher.sync(window, Some(&tx)).await;
    drop(tx);
    let _ = printer.await;

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(Error::Upstream(e)) => {
            println!();
            println!("❌ Sync failed: {}", e.reason());
            if matches!(e.status(), Some(401) | Some(403)) {
                println!(
                    "   Sign in and verify your membership at {}, then refresh CLUBSTAT_ID_TOKEN.",
                    fetcher.config().region.order_status_url()
                );
            }
            return Err(e).context("Sync failed");
        }
        Err(e) => return Err(e).context("Sync failed"),
    };

    let mut snapshot = outcome.snapshot;
    db.save_snapshot(&mut snapshot)
        .context("Failed to save snapshot")?;

    println!();
    println!("✅ Sync complete!");
    println!("   Receipts:       {}", outcome.receipt_count);
    println!("   Online orders:  {}", outcome.order_count);
    println!("   Order details:  {}", outcome.detail_count);
    if outcome.failed_detail_count > 0 {
        println!(
            "   ⚠️  {} order details could not be downloaded (see 'clubstat order <number>')",
            outcome.failed_detail_count
        );
    }

    Ok(())
}
