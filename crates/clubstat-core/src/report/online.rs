//! Online order aggregation

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::classify::is_return;
use crate::models::{DetailMap, OnlineOrder};
use crate::parse::{month_key, order_date};

use super::{bump, DateBounds, DateRangeText, LocationCounts};

pub const ONLINE_LOCATION: &str = "Online";

/// One order as listed on the online tab
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OnlineRow {
    pub date: Option<NaiveDateTime>,
    pub order_number: String,
    pub status: String,
    pub total: f64,
    pub location: String,
    pub is_return: bool,
    /// Embedded line count
    pub items: usize,
    pub tax: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OnlineMonth {
    pub spent: f64,
    pub orders: u32,
    pub items: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OnlineReport {
    pub rows: Vec<OnlineRow>,
    /// Non-return orders
    pub total_orders: u32,
    pub total_spent: f64,
    pub total_items: usize,
    pub unique_items: usize,
    pub location_counts: LocationCounts,
    pub return_count: u32,
    pub return_amount: f64,
    pub total_tax: f64,
    pub monthly: BTreeMap<String, OnlineMonth>,
    pub date_range: DateBounds,
    pub date_range_text: DateRangeText,
}

impl OnlineReport {
    pub fn net_spent(&self) -> f64 {
        self.total_spent - self.return_amount
    }
}

/// Aggregate online orders, taking tax from fetched details where present
pub fn process_online_orders(orders: &[OnlineOrder], details: &DetailMap) -> OnlineReport {
    let mut report = OnlineReport::default();
    let mut unique_items = BTreeSet::new();

    for order in orders {
        let total = order.total_amount();
        let returned = is_return(total);
        let date = order_date(order);
        let key = order.order_key();

        let tax = key
            .and_then(|k| details.get(k))
            .and_then(|d| d.us_tax_total)
            .or(order.us_tax_total)
            .unwrap_or(0.0);
        let lines = &order.order_line_items;

        if returned {
            report.return_count += 1;
            report.return_amount += total.abs();
            report.total_tax -= tax;
        } else {
            report.total_spent += total;
            report.total_orders += 1;
            report.total_tax += tax;
            bump(&mut report.location_counts, ONLINE_LOCATION);

            report.total_items += lines.len();
            unique_items.extend(lines.iter().filter_map(|l| l.identity()));

            if let Some(date) = &date {
                let month = report.monthly.entry(month_key(date)).or_default();
                month.spent += total;
                month.orders += 1;
                month.items += lines.len();
            }
        }

        report.date_range.include_opt(date.as_ref());
        report.rows.push(OnlineRow {
            date,
            order_number: key.unwrap_or("—").to_string(),
            status: order.status.clone().unwrap_or_default(),
            total,
            location: ONLINE_LOCATION.to_string(),
            is_return: returned,
            items: lines.len(),
            tax,
        });
    }

    report.unique_items = unique_items.len();
    report.date_range_text = report.date_range.text();
    report
}
