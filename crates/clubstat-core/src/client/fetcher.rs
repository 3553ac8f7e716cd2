//! Paged retrieval, dedup and batched detail download
//!
//! List calls are strict: a failed receipts call, or an online-order listing
//! where no page came back, fails the sync. Detail calls are forgiving: each
//! order is retried on 503 and otherwise recorded as a [`FetchErrorInfo`]
//! next to the successful details.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{Months, NaiveDate, Utc};
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::error::{Result, UpstreamError};
use crate::models::{DetailMap, FetchErrorInfo, OnlineOrder, OrderDetail, Receipt, Snapshot};
use crate::parse::order_dedup_key;

use super::queries::{
    decode_order_detail, decode_orders_page, decode_receipts, online_orders_request,
    order_details_request, receipts_request,
};
use super::retry::with_retry;
use super::transport::GraphqlTransport;

/// Phase of a sync, carried on every progress event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStage {
    Receipts,
    OnlineOrders,
    OrderDetails,
    NoOrders,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncProgress {
    pub stage: SyncStage,
    pub completed: usize,
    pub total: usize,
}

impl SyncProgress {
    pub fn new(stage: SyncStage, completed: usize, total: usize) -> Self {
        Self {
            stage,
            completed,
            total,
        }
    }

    pub fn message(&self) -> String {
        match self.stage {
            SyncStage::Receipts => "Fetching warehouse receipts...".to_string(),
            SyncStage::OnlineOrders => "Fetching online orders...".to_string(),
            SyncStage::OrderDetails => format!(
                "Downloading order details {}/{}",
                self.completed, self.total
            ),
            SyncStage::NoOrders => "No online orders to detail.".to_string(),
            SyncStage::Finished => "Finishing up...".to_string(),
        }
    }
}

pub type ProgressSender = UnboundedSender<SyncProgress>;

fn emit(progress: Option<&ProgressSender>, event: SyncProgress) {
    if let Some(tx) = progress {
        // A dropped receiver just means nobody is watching
        let _ = tx.send(event);
    }
}

/// Inclusive date range a sync covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl SyncWindow {
    /// The `years` years up to and including `today`
    pub fn ending(today: NaiveDate, years: u32) -> Self {
        let start = today
            .checked_sub_months(Months::new(years.saturating_mul(12)))
            .unwrap_or(NaiveDate::MIN);
        Self { start, end: today }
    }
}

/// Result of a full sync
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOutcome {
    pub snapshot: Snapshot,
    pub receipt_count: usize,
    pub order_count: usize,
    pub detail_count: usize,
    pub failed_detail_count: usize,
}

/// Downloads receipts, online orders and order details over a transport
pub struct Fetcher {
    transport: Arc<dyn GraphqlTransport>,
    config: SyncConfig,
}

impl Fetcher {
    pub fn new(transport: Arc<dyn GraphqlTransport>, config: SyncConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// All warehouse and gas receipts in the window
    pub async fn list_receipts(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Receipt>> {
        debug!("Listing receipts {} to {}", start, end);
        let data = self
            .transport
            .execute(&receipts_request(start, end))
            .await?;
        let receipts = decode_receipts(data)?;
        info!("Fetched {} receipts", receipts.len());
        Ok(receipts)
    }

    /// Online order headers across every configured partition
    ///
    /// Pages stop at the first short or failed page. Partial results are kept
    /// unless not a single page succeeded.
    pub async fn list_online_orders(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OnlineOrder>> {
        let page_size = self.config.page_size;
        let mut dedup = OrderDedup::default();
        let mut pages_ok = 0usize;
        let mut last_error: Option<UpstreamError> = None;

        for warehouse in &self.config.partitions {
            let mut page_number: u32 = 1;
            let mut total_records = u64::MAX;

            while u64::from(page_number - 1) * u64::from(page_size) < total_records {
                let request = online_orders_request(start, end, page_number, page_size, warehouse);
                let page = match self.transport.execute(&request).await {
                    Ok(data) => decode_orders_page(data),
                    Err(e) => Err(e),
                };

                let page = match page {
                    Ok(page) => page,
                    Err(e) => {
                        warn!(
                            "Online orders page {} for warehouse {} failed: {}",
                            page_number, warehouse, e
                        );
                        last_error = Some(e);
                        break;
                    }
                };

                pages_ok += 1;
                total_records = page.total_records();
                let count = page.bc_orders.len();
                debug!(
                    "Warehouse {} page {}: {} orders of {}",
                    warehouse, page_number, count, total_records
                );
                dedup.extend(page.bc_orders);

                if count < page_size as usize {
                    break;
                }
                page_number += 1;
            }
        }

        if pages_ok == 0 {
            if let Some(e) = last_error {
                return Err(e.into());
            }
        }

        let orders = dedup.into_orders();
        info!("Fetched {} online orders", orders.len());
        Ok(orders)
    }

    /// Details for each order number, one request per order, in batches
    ///
    /// Never fails: orders that could not be fetched end up in
    /// [`DetailMap::errors`].
    pub async fn fetch_order_details(
        &self,
        order_numbers: &[String],
        progress: Option<&ProgressSender>,
    ) -> DetailMap {
        let numbers = unique(order_numbers);
        let total = numbers.len();
        let mut out = DetailMap::default();

        if total == 0 {
            emit(progress, SyncProgress::new(SyncStage::NoOrders, 0, 0));
            return out;
        }

        info!("Fetching details for {} orders", total);
        let concurrency = self.config.detail_concurrency.max(1);
        let mut completed = 0usize;

        for batch in numbers.chunks(concurrency) {
            let mut tasks = JoinSet::new();
            for number in batch {
                let transport = Arc::clone(&self.transport);
                let policy = self.config.retry;
                let number = number.clone();
                tasks.spawn(async move {
                    let request = order_details_request(&number);
                    let result = with_retry(&policy, UpstreamError::is_retryable, |_| {
                        transport.execute(&request)
                    })
                    .await
                    .and_then(decode_order_detail);
                    (number, result)
                });
            }

            while let Some(joined) = tasks.join_next().await {
                completed += 1;
                match joined {
                    Ok((number, result)) => record_detail(&mut out, number, result),
                    Err(e) => warn!("Order detail task failed: {}", e),
                }
                emit(
                    progress,
                    SyncProgress::new(SyncStage::OrderDetails, completed, total),
                );
            }
        }

        info!(
            "Order details complete: {} fetched, {} failed",
            out.details.len(),
            out.errors.len()
        );
        out
    }

    /// Full download: receipts, warehouse detail map, online orders, details
    pub async fn sync(
        &self,
        window: SyncWindow,
        progress: Option<&ProgressSender>,
    ) -> Result<SyncOutcome> {
        emit(progress, SyncProgress::new(SyncStage::Receipts, 0, 0));
        let receipts = self.list_receipts(window.start, window.end).await?;
        let warehouse_details = build_warehouse_details(&receipts);

        emit(progress, SyncProgress::new(SyncStage::OnlineOrders, 0, 0));
        let online_orders = self.list_online_orders(window.start, window.end).await?;

        let numbers = order_numbers(&online_orders);
        let order_details = self.fetch_order_details(&numbers, progress).await;
        emit(progress, SyncProgress::new(SyncStage::Finished, 0, 0));

        let outcome = SyncOutcome {
            receipt_count: receipts.len(),
            order_count: online_orders.len(),
            detail_count: order_details.details.len(),
            failed_detail_count: order_details.errors.len(),
            snapshot: Snapshot {
                receipts,
                warehouse_details,
                online_orders,
                order_details,
                updated_at: Some(Utc::now().timestamp_millis()),
            },
        };

        info!(
            "Sync complete: {} receipts, {} warehouse details, {} online orders, {} order details ({} failed)",
            outcome.receipt_count,
            outcome.snapshot.warehouse_details.len(),
            outcome.order_count,
            outcome.detail_count,
            outcome.failed_detail_count
        );
        Ok(outcome)
    }
}

fn record_detail(
    out: &mut DetailMap,
    number: String,
    result: std::result::Result<Option<OrderDetail>, UpstreamError>,
) {
    match result {
        Ok(Some(detail)) => {
            let key = detail.key().map(str::to_string).unwrap_or(number);
            out.details.insert(key, detail);
        }
        Ok(None) => debug!("No detail returned for order {}", number),
        Err(e) => {
            warn!("Order detail fetch failed for {}: {}", number, e);
            out.errors.insert(number, detail_error(&e));
        }
    }
}

/// Per-order failure entry with guidance text for the member
pub fn detail_error(err: &UpstreamError) -> FetchErrorInfo {
    let message = match err.status() {
        Some(503) => {
            "Service temporarily unavailable (503). Costco's servers may be experiencing high load."
        }
        Some(400) => "Invalid request (400). Order may not exist or be accessible.",
        _ => "Failed to fetch order details",
    };
    FetchErrorInfo {
        error: true,
        status_code: err.status(),
        kind: err.kind(),
        message: message.to_string(),
        timestamp: Utc::now().timestamp_millis(),
    }
}

/// First-seen-wins dedup of online orders, in arrival order
#[derive(Debug, Default)]
pub struct OrderDedup {
    seen: HashSet<String>,
    orders: Vec<OnlineOrder>,
}

impl OrderDedup {
    pub fn extend(&mut self, orders: impl IntoIterator<Item = OnlineOrder>) {
        for order in orders {
            if self.seen.insert(order_dedup_key(&order)) {
                self.orders.push(order);
            }
        }
    }

    pub fn into_orders(self) -> Vec<OnlineOrder> {
        self.orders
    }
}

/// Order numbers to fetch details for, unique, in first-seen order
pub fn order_numbers(orders: &[OnlineOrder]) -> Vec<String> {
    let keys: Vec<String> = orders
        .iter()
        .filter_map(|o| o.order_key())
        .map(str::to_string)
        .collect();
    unique(&keys)
}

/// Receipts keyed by barcode (else transaction number), first seen wins
pub fn build_warehouse_details(receipts: &[Receipt]) -> HashMap<String, Receipt> {
    let mut details = HashMap::new();
    for receipt in receipts {
        let key = receipt.key();
        if key.is_empty() {
            continue;
        }
        details
            .entry(key.to_string())
            .or_insert_with(|| receipt.clone());
    }
    details
}

fn unique(values: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty() && seen.insert(v.to_string()))
        .map(str::to_string)
        .collect()
}
