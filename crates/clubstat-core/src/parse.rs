//! Date, identifier and location parsing for raw upstream records
//!
//! All dates are treated as local wall-clock time. Timestamps with an explicit
//! offset keep the wall-clock reading of that offset.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime};

use crate::models::{OnlineOrder, Receipt};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// Parse an upstream timestamp or date, `None` when unrecognizable
///
/// Date-only values land at midnight.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }

    parse_date(raw).map(|d| d.and_time(NaiveTime::MIN))
}

/// Parse a date-only value
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Transaction time of a receipt
///
/// A present `transactionDateTime` wins even when it does not parse; only a
/// missing one falls back to `transactionDate` at midnight.
pub fn receipt_date(receipt: &Receipt) -> Option<NaiveDateTime> {
    match non_blank(&receipt.transaction_date_time) {
        Some(dt) => parse_timestamp(dt),
        None => non_blank(&receipt.transaction_date)
            .and_then(parse_date)
            .map(|d| d.and_time(NaiveTime::MIN)),
    }
}

pub fn order_date(order: &OnlineOrder) -> Option<NaiveDateTime> {
    non_blank(&order.order_placed_date).and_then(parse_timestamp)
}

/// `YYYY-MM` key for a date
pub fn month_key<D: Datelike>(date: &D) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// Split a `YYYY-MM` key into year and month
pub fn parse_month_key(key: &str) -> Option<(i32, u32)> {
    let (year, month) = key.split_once('-')?;
    if year.len() != 4 || month.len() != 2 {
        return None;
    }
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    (1..=12).contains(&month).then_some((year, month))
}

/// Month key for a warehouse receipt
///
/// Uses the parsed transaction date; falls back to the first seven characters
/// of `transactionDate` when that looks like a month key.
pub fn receipt_month_key(receipt: &Receipt, date: Option<&NaiveDateTime>) -> Option<String> {
    if let Some(date) = date {
        return Some(month_key(date));
    }
    let prefix: String = non_blank(&receipt.transaction_date)?.chars().take(7).collect();
    parse_month_key(&prefix).map(|_| prefix)
}

/// Identity used to deduplicate online orders across pages and partitions
///
/// `orderHeaderId`, else the order number, else a synthetic
/// `<warehouse>-<placedDate>-<total>` key.
pub fn order_dedup_key(order: &OnlineOrder) -> String {
    if let Some(id) = non_blank(&order.order_header_id) {
        return id.to_string();
    }
    if let Some(number) = non_blank(&order.order_number) {
        return number.to_string();
    }
    format!(
        "{}-{}-{}",
        order.warehouse_number.as_deref().unwrap_or(""),
        order.order_placed_date.as_deref().unwrap_or(""),
        order.order_total.map(|t| t.to_string()).unwrap_or_default()
    )
}

/// Display location of a warehouse visit
pub fn warehouse_location(receipt: &Receipt) -> String {
    non_blank(&receipt.warehouse_name)
        .or_else(|| non_blank(&receipt.warehouse_short_name))
        .or_else(|| non_blank(&receipt.warehouse_city))
        .map(str::to_string)
        .unwrap_or_else(|| {
            format!(
                "Warehouse #{}",
                non_blank(&receipt.warehouse_number).unwrap_or("–")
            )
        })
}

/// Display location of a fuel purchase
pub fn gas_location(receipt: &Receipt) -> String {
    non_blank(&receipt.warehouse_name)
        .or_else(|| non_blank(&receipt.warehouse_short_name))
        .unwrap_or("Gas Station")
        .to_string()
}

fn non_blank(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Serde helpers for upstream fields whose JSON type is not stable
pub(crate) mod lenient {
    use serde::de::{Deserialize, DeserializeOwned, Deserializer};
    use serde_json::Value;
    use tracing::debug;

    /// Number, numeric string or null
    pub fn opt_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        let value = match Value::deserialize(d)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
            Value::Bool(_) | Value::Null | Value::Array(_) | Value::Object(_) => None,
        };
        Ok(value.filter(|f| f.is_finite()))
    }

    /// String or number, null stays `None`
    pub fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        })
    }

    /// Array whose unreadable elements are dropped; null or non-array is empty
    pub fn vec<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let Value::Array(items) = Value::deserialize(d)? else {
            return Ok(Vec::new());
        };
        Ok(items
            .into_iter()
            .filter_map(|item| match serde_json::from_value(item) {
                Ok(v) => Some(v),
                Err(e) => {
                    debug!("Skipping unreadable record: {}", e);
                    None
                }
            })
            .collect())
    }
}
