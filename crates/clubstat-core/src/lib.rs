//! Clubstat Core Library
//!
//! Shared functionality for the clubstat warehouse-club spending tool:
//! - Order-history GraphQL client with paging, dedup and retry
//! - Lenient models for receipts, online orders and order details
//! - Spending reports: item statistics, gas fills, monthly charts, leaderboards
//! - Date-range and month filters
//! - SQLite snapshot store with change notifications
//! - CSV and JSON exports

pub mod classify;
pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod filter;
pub mod format;
pub mod models;
pub mod parse;
pub mod report;
pub mod state;
pub mod store;

pub use client::{Fetcher, HttpTransport, SyncOutcome, SyncProgress, SyncStage, SyncWindow};
pub use config::{Credentials, Region, SyncConfig};
pub use error::{Error, FetchErrorKind, Result, UpstreamError};
pub use filter::{FilterState, MonthOption, Preset};
pub use models::{
    DetailLookup, DetailMap, FetchErrorInfo, OnlineOrder, OrderDetail, Receipt, ReceiptItem,
    Snapshot,
};
pub use report::{Channel, DateBounds, Tab};
pub use state::{AppState, DashboardView};
pub use store::{Database, SnapshotChange, STORAGE_KEY};
