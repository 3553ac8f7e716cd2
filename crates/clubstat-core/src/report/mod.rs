//! Spending reports derived from a filtered snapshot
//!
//! Every function here is pure: it reads receipts, orders and details and
//! returns freshly built structures. Nothing is cached between filter changes.
//!
//! ## Pipeline
//!
//! - [`process_receipts`] and [`process_online_orders`] run independently
//! - [`items`] builds per-tab item statistics and the leaderboards
//! - [`monthly`] turns the monthly buckets into chart datasets
//! - [`summary`] combines the two channel reports into per-tab cards
//! - [`visits`] lists every trip across channels

pub mod items;
pub mod monthly;
pub mod online;
pub mod receipts;
pub mod summary;
pub mod visits;

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::format::format_date;

pub use items::{
    biggest_price_increases, build_online_item_stats, item_stats_for_tab, merge_item_stats,
    months_between, most_expensive, most_purchased, most_total_spent, ExpensiveRow, Leaderboards,
    PriceIncreaseRow, PurchasedRow, SpentRow, LEADERBOARD_SIZE,
};
pub use monthly::{
    chart_metrics, find_metric, ChartDataset, ChartMetric, MonthlyData, MonthlyEntry,
    STACK_COLORS,
};
pub use online::{process_online_orders, OnlineMonth, OnlineReport, OnlineRow};
pub use receipts::{
    process_receipts, GasMonth, GasStats, GasTrip, ItemStat, ItemStats, PriceSample,
    ReceiptReport, ReceiptSummary, WarehouseMonth, WarehouseVisit,
};
pub use summary::{Highlights, SummaryCard, TabSummary, TripHighlight};
pub use visits::{all_visits, Channel, VisitEntry};

/// Location name → visit count
pub type LocationCounts = BTreeMap<String, u32>;

/// Dashboard tab, also the channel selector for item stats, charts and exports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    All,
    Warehouse,
    Online,
    Gas,
}

impl Tab {
    pub const ALL: [Tab; 4] = [Tab::All, Tab::Warehouse, Tab::Online, Tab::Gas];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Warehouse => "warehouse",
            Self::Online => "online",
            Self::Gas => "gas",
        }
    }

    pub fn subtitle(&self) -> &'static str {
        match self {
            Self::All => "All spending channels combined.",
            Self::Warehouse => "Warehouse purchases only.",
            Self::Online => "Online orders only.",
            Self::Gas => "Gas station activity.",
        }
    }
}

impl std::fmt::Display for Tab {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Tab {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "warehouse" => Ok(Self::Warehouse),
            "online" => Ok(Self::Online),
            "gas" => Ok(Self::Gas),
            _ => Err(format!(
                "Unknown tab: {} (valid: all, warehouse, online, gas)",
                s
            )),
        }
    }
}

/// Earliest and latest timestamp seen
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DateBounds {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl DateBounds {
    pub fn include(&mut self, date: &NaiveDateTime) {
        if self.start.map_or(true, |s| *date < s) {
            self.start = Some(*date);
        }
        if self.end.map_or(true, |e| *date > e) {
            self.end = Some(*date);
        }
    }

    pub fn include_opt(&mut self, date: Option<&NaiveDateTime>) {
        if let Some(date) = date {
            self.include(date);
        }
    }

    pub fn merge(mut self, other: &DateBounds) -> DateBounds {
        self.include_opt(other.start.as_ref());
        self.include_opt(other.end.as_ref());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_none()
    }

    /// Display text for both ends, `None` where unknown
    pub fn text(&self) -> DateRangeText {
        DateRangeText {
            start: self.start.as_ref().map(format_date),
            end: self.end.as_ref().map(format_date),
        }
    }
}

/// Formatted date range, e.g. `Jan 5, 2024`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DateRangeText {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl std::fmt::Display for DateRangeText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.start, &self.end) {
            (Some(start), Some(end)) => write!(f, "{} – {}", start, end),
            (Some(day), None) | (None, Some(day)) => f.write_str(day),
            (None, None) => f.write_str("—"),
        }
    }
}

pub(crate) fn bump(counts: &mut LocationCounts, location: &str) {
    *counts.entry(location.to_string()).or_insert(0) += 1;
}

/// Sum location maps key by key
pub fn merge_location_counts<'a>(
    maps: impl IntoIterator<Item = &'a LocationCounts>,
) -> LocationCounts {
    let mut merged = LocationCounts::new();
    for map in maps {
        for (location, count) in map {
            *merged.entry(location.clone()).or_insert(0) += count;
        }
    }
    merged
}

/// Locations ordered by count desc, then name
pub fn ranked_locations(counts: &LocationCounts) -> Vec<(String, u32)> {
    let mut ranked: Vec<(String, u32)> = counts.iter().map(|(k, v)| (k.clone(), *v)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_date_bounds() {
        let mut bounds = DateBounds::default();
        assert!(bounds.is_empty());
        assert_eq!(bounds.text().to_string(), "—");

        bounds.include(&at(2024, 3, 1));
        bounds.include(&at(2024, 1, 5));
        bounds.include_opt(None);
        bounds.include(&at(2024, 2, 1));

        assert_eq!(bounds.start, Some(at(2024, 1, 5)));
        assert_eq!(bounds.end, Some(at(2024, 3, 1)));
        assert_eq!(bounds.text().to_string(), "Jan 5, 2024 – Mar 1, 2024");

        let mut other = DateBounds::default();
        other.include(&at(2025, 1, 1));
        let merged = bounds.merge(&other);
        assert_eq!(merged.end, Some(at(2025, 1, 1)));
        assert_eq!(merged.start, Some(at(2024, 1, 5)));
    }

    #[test]
    fn test_location_counts() {
        let mut a = LocationCounts::new();
        bump(&mut a, "Seattle");
        bump(&mut a, "Seattle");
        bump(&mut a, "Kirkland");
        let mut b = LocationCounts::new();
        bump(&mut b, "Kirkland");
        bump(&mut b, "Online");

        let merged = merge_location_counts([&a, &b]);
        assert_eq!(merged["Seattle"], 2);
        assert_eq!(merged["Kirkland"], 2);

        let ranked = ranked_locations(&merged);
        assert_eq!(ranked[0], ("Kirkland".to_string(), 2));
        assert_eq!(ranked[1], ("Seattle".to_string(), 2));
        assert_eq!(ranked[2], ("Online".to_string(), 1));
    }

    #[test]
    fn test_tab_parse() {
        assert_eq!("Gas".parse::<Tab>().unwrap(), Tab::Gas);
        assert!("fuel".parse::<Tab>().is_err());
        assert_eq!(Tab::Online.to_string(), "online");
    }
}
