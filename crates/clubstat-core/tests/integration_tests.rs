//! Integration tests for clubstat-core
//!
//! These tests exercise the full sync → store → filter → report → export
//! workflow against a scripted upstream.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{json, Value};

use clubstat_core::{
    client::{GraphqlRequest, GraphqlTransport},
    export::{ledger_rows, trips_rows, write_csv},
    models::DetailLookup,
    report::{all_visits, find_metric, Channel},
    AppState, Database, Fetcher, FetchErrorKind, FilterState, Preset, SyncConfig,
    SyncWindow, Tab, UpstreamError,
};

/// Answers by operation name; details by order number
struct ScriptedUpstream {
    receipts: Value,
    orders: Value,
    details: HashMap<String, Result<Value, UpstreamError>>,
    calls: Mutex<Vec<String>>,
}

#[async_trait]
impl GraphqlTransport for ScriptedUpstream {
    async fn execute(&self, request: &GraphqlRequest) -> Result<Value, UpstreamError> {
        let op = request.operation().to_string();
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(op.clone());
        }
        match op.as_str() {
            "receiptsWithCounts" => Ok(json!({ "receiptsWithCounts": { "receipts": self.receipts } })),
            "getOnlineOrders" => Ok(json!({
                "getOnlineOrders": [{
                    "pageNumber": 1,
                    "totalNumberOfRecords": self.orders.as_array().map_or(0, |o| o.len()),
                    "bcOrders": self.orders,
                }]
            })),
            "getOrderDetails" => {
                let number = request.variables["orderNumbers"][0].as_str().unwrap_or("");
                match self.details.get(number) {
                    Some(Ok(detail)) => Ok(json!({ "getOrderDetails": [detail] })),
                    Some(Err(e)) => Err(e.clone()),
                    None => Ok(json!({ "getOrderDetails": [] })),
                }
            }
            other => Err(UpstreamError::from_status(400, format!("unexpected {}", other))),
        }
    }

    fn endpoint(&self) -> &str {
        "scripted://graphql"
    }
}

fn upstream() -> ScriptedUpstream {
    let receipts = json!([
        {
            "warehouseName": "SEATTLE", "transactionBarcode": "21134300501862401051230",
            "transactionDateTime": "2024-01-05T12:30:00", "total": 64.36, "taxes": 2.36,
            "tenderArray": [{"tenderTypeName": "VISA"}],
            "itemArray": [
                {"itemNumber": "1234", "itemDescription01": "KS PAPER TOWEL", "unit": 2, "amount": 40.0},
                {"itemNumber": "87745", "itemDescription01": "ROTISSERIE CHKN", "unit": 1, "amount": 4.99},
                {"itemNumber": "555", "itemDescription01": "KS WATER", "unit": 1, "amount": 17.01}
            ]
        },
        {
            "warehouseName": "SEATTLE", "transactionBarcode": "gas-1",
            "transactionDateTime": "2024-02-11T08:00:00", "total": 52.5,
            "itemArray": [
                {"itemNumber": "300", "itemDescription01": "REGULAR GAS", "fuelUnitQuantity": 15.0,
                 "unit": 1, "amount": 52.5}
            ]
        },
        {
            "warehouseName": "KIRKLAND", "transactionBarcode": "ret-1",
            "transactionDateTime": "2024-03-02T16:00:00", "total": -20.0, "taxes": -1.0,
            "itemArray": [
                {"itemNumber": "1234", "itemDescription01": "KS PAPER TOWEL", "unit": -1, "amount": -20.0}
            ]
        }
    ]);
    let orders = json!([
        {"orderNumber": "1001", "orderPlacedDate": "2024-02-20T09:00:00", "orderTotal": 89.99,
         "orderLineItems": [{"itemNumber": "777", "itemDescription": "AIR FRYER", "amount": 89.99}]},
        {"orderNumber": "1002", "orderPlacedDate": "2024-03-15T09:00:00", "orderTotal": 25.0,
         "orderLineItems": [{"itemNumber": "888", "itemDescription": "FILTERS", "amount": 25.0}]},
        // Same order repeated on another page; dropped by dedup
        {"orderNumber": "1001", "orderPlacedDate": "2024-02-20T09:00:00", "orderTotal": 89.99}
    ]);

    let mut details = HashMap::new();
    details.insert(
        "1001".to_string(),
        Ok(json!({
            "orderNumber": "1001", "uSTaxTotal1": 8.1,
            "shipToAddress": [{"orderLineItems": [
                {"itemNumber": "777", "itemDescription": "AIR FRYER", "quantity": 1, "price": 89.99}
            ]}]
        })),
    );
    details.insert("1002".to_string(), Err(UpstreamError::from_status(400, "bad order")));

    ScriptedUpstream {
        receipts,
        orders,
        details,
        calls: Mutex::new(Vec::new()),
    }
}

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

// =============================================================================
// Sync → Store Integration Tests
// =============================================================================

#[tokio::test]
async fn test_sync_store_and_report() {
    let transport = Arc::new(upstream());
    let fetcher = Fetcher::new(transport.clone(), SyncConfig::default());
    let window = SyncWindow::ending(now().date(), 2);

    let outcome = fetcher.sync(window, None).await.expect("sync failed");
    assert_eq!(outcome.receipt_count, 3);
    assert_eq!(outcome.order_count, 2);
    assert_eq!(outcome.detail_count, 1);
    assert_eq!(outcome.failed_detail_count, 1);

    // A 400 is never retried
    let calls = transport.calls.lock().unwrap().clone();
    assert_eq!(calls.iter().filter(|c| *c == "getOrderDetails").count(), 2);

    let db = Database::in_memory().expect("Failed to create database");
    let mut changes = db.subscribe();
    let mut snapshot = outcome.snapshot;
    let stamp = db.save_snapshot(&mut snapshot).expect("save failed");
    assert_eq!(changes.recv().await.unwrap().updated_at, stamp);

    let stored = db.load_snapshot().unwrap().expect("snapshot missing");
    assert_eq!(stored.warehouse_details.len(), 3);

    match stored.order_details.lookup("1002") {
        DetailLookup::Failed(err) => {
            assert_eq!(err.kind, FetchErrorKind::Rejected);
            assert_eq!(err.status_code, Some(400));
        }
        other => panic!("expected a failed lookup, got {:?}", other),
    }

    let mut state = AppState::new();
    let view = state.set_data(stored, now());

    let summary = &view.receipt_report.summary;
    assert_eq!(summary.shopping_receipts, 1);
    assert_eq!(summary.gas_only_receipts, 1);
    assert_eq!(summary.return_count, 1);
    assert!((summary.total_spent - 64.36).abs() < 1e-9);
    assert!((summary.rotisserie_count - 1.0).abs() < 1e-9);

    let gas = &view.receipt_report.gas;
    assert_eq!(gas.total_trips, 1);
    assert!((gas.average_price_per_gallon() - 3.5).abs() < 1e-9);

    assert_eq!(view.online_report.total_orders, 2);
    assert!((view.online_report.total_tax - 8.1).abs() < 1e-9);

    // 1 shopping trip, 1 fill-up, 2 online orders
    assert_eq!(view.summary.card("Trips").map(|c| c.value.as_str()), Some("4"));
    assert_eq!(view.month_options.len(), 3);
}

// =============================================================================
// Filter → Export Integration Tests
// =============================================================================

#[tokio::test]
async fn test_filtered_exports() {
    let fetcher = Fetcher::new(Arc::new(upstream()), SyncConfig::default());
    let outcome = fetcher
        .sync(SyncWindow::ending(now().date(), 2), None)
        .await
        .unwrap();

    let mut state = AppState::new();
    state.set_data(outcome.snapshot, now());

    let filter = FilterState {
        preset: Preset::Custom,
        custom_start: NaiveDate::from_ymd_opt(2024, 2, 1),
        custom_end: NaiveDate::from_ymd_opt(2024, 2, 29),
        month: None,
    };
    let view = state.set_filter(filter, now()).clone();
    assert_eq!(view.receipts.len(), 1);
    assert_eq!(view.online_orders.len(), 1);

    let ledger = ledger_rows(&view.receipts, &view.online_orders, &state.snapshot().order_details);
    assert_eq!(ledger.len(), 3);
    assert_eq!(ledger[1][1], "Gas");
    assert_eq!(ledger[2][4], "AIR FRYER");

    let trips = trips_rows(Tab::Gas, &view.receipt_report, &view.online_report);
    assert_eq!(trips.len(), 2);
    assert_eq!(trips[1][4], "15");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trips.csv");
    assert_eq!(write_csv(&path, &trips).unwrap(), 1);

    let metric = find_metric(Tab::Online, Some("onlineSpent"));
    let dataset = metric.build(&view.monthly).expect("online chart");
    assert_eq!(dataset.labels(), &["Feb 2024".to_string()]);

    let entries = all_visits(
        &view.receipt_report.visits,
        &view.online_report.rows,
        &view.receipt_report.gas.trips,
    );
    let channels: Vec<Channel> = entries.iter().map(|e| e.channel).collect();
    assert_eq!(channels, vec![Channel::Online, Channel::Gas]);
}

#[tokio::test]
async fn test_failed_receipt_listing_is_an_error() {
    struct Down;

    #[async_trait]
    impl GraphqlTransport for Down {
        async fn execute(&self, _request: &GraphqlRequest) -> Result<Value, UpstreamError> {
            Err(UpstreamError::from_status(403, "forbidden"))
        }

        fn endpoint(&self) -> &str {
            "down://"
        }
    }

    let fetcher = Fetcher::new(Arc::new(Down), SyncConfig::default());
    let err = fetcher
        .sync(SyncWindow::ending(now().date(), 1), None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("403"));

    let db = Database::in_memory().unwrap();
    assert!(db.load_snapshot().unwrap().is_none());
}
