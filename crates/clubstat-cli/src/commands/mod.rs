//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Config command and shared utilities (open_db, filter flags)
//! - `export` - Ledger, trips and chart CSV exports, raw JSON export
//! - `reports` - Summary, items, gas, visits, chart, months and order views
//! - `sync` - Download from upstream and store the snapshot

pub mod core;
pub mod export;
pub mod reports;
pub mod sync;

// Re-export command functions for main.rs
pub use self::core::*;
pub use export::*;
pub use reports::*;
pub use sync::*;
