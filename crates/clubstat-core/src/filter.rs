//! Date-range and month filters over raw receipts and orders
//!
//! Presets never drop undated records; a month selection always does. The
//! current time is always passed in so results are reproducible.

use std::collections::BTreeSet;

use chrono::{Datelike, Months, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::format::format_month_long;
use crate::models::{OnlineOrder, Receipt};
use crate::parse::{month_key, order_date, parse_month_key, receipt_date};
use crate::report::DateBounds;

/// Date range preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    #[default]
    All,
    /// From January 1st of the current year
    Ytd,
    /// From the first day of the month eleven months back
    Last12,
    /// Inclusive `custom_start..=custom_end`
    Custom,
}

impl Preset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Ytd => "ytd",
            Self::Last12 => "last12",
            Self::Custom => "custom",
        }
    }
}

impl std::str::FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "ytd" => Ok(Self::Ytd),
            "last12" => Ok(Self::Last12),
            "custom" => Ok(Self::Custom),
            _ => Err(format!(
                "Unknown preset: {} (valid: all, ytd, last12, custom)",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    pub preset: Preset,
    pub custom_start: Option<NaiveDate>,
    pub custom_end: Option<NaiveDate>,
    /// `YYYY-MM`; `None` shows every month
    pub month: Option<String>,
}

/// Resolved inclusive window; an open end is unbounded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Window {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl Window {
    pub fn contains(&self, date: &NaiveDateTime) -> bool {
        self.start.map_or(true, |s| *date >= s) && self.end.map_or(true, |e| *date <= e)
    }
}

fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN))
}

impl FilterState {
    pub fn preset(preset: Preset) -> Self {
        Self {
            preset,
            ..Default::default()
        }
    }

    /// Set the month filter; `"all"` or an empty value clears it
    pub fn with_month(mut self, month: Option<&str>) -> Self {
        self.month = month
            .map(str::trim)
            .filter(|m| !m.is_empty() && !m.eq_ignore_ascii_case("all"))
            .map(str::to_string);
        self
    }

    /// Window the preset selects at `now`
    pub fn window(&self, now: NaiveDateTime) -> Window {
        let today = now.date();
        match self.preset {
            Preset::All => Window::default(),
            Preset::Ytd => Window {
                start: NaiveDate::from_ymd_opt(today.year(), 1, 1).map(|d| d.and_time(NaiveTime::MIN)),
                end: None,
            },
            Preset::Last12 => Window {
                start: today
                    .with_day(1)
                    .and_then(|first| first.checked_sub_months(Months::new(11)))
                    .map(|d| d.and_time(NaiveTime::MIN)),
                end: None,
            },
            Preset::Custom => Window {
                start: self.custom_start.map(|d| d.and_time(NaiveTime::MIN)),
                end: self.custom_end.map(end_of_day),
            },
        }
    }

    /// Whether a record dated `date` passes the month filter and `window`
    pub fn matches(&self, date: Option<&NaiveDateTime>, window: &Window) -> bool {
        if let Some(month) = &self.month {
            let Some((year, mon)) = parse_month_key(month) else {
                return false;
            };
            match date {
                Some(d) if d.year() == year && d.month() == mon => {}
                _ => return false,
            }
        }
        date.map_or(true, |d| window.contains(d))
    }
}

pub fn filter_receipts(receipts: &[Receipt], filter: &FilterState, now: NaiveDateTime) -> Vec<Receipt> {
    let window = filter.window(now);
    receipts
        .iter()
        .filter(|r| filter.matches(receipt_date(r).as_ref(), &window))
        .cloned()
        .collect()
}

pub fn filter_online_orders(
    orders: &[OnlineOrder],
    filter: &FilterState,
    now: NaiveDateTime,
) -> Vec<OnlineOrder> {
    let window = filter.window(now);
    orders
        .iter()
        .filter(|o| filter.matches(order_date(o).as_ref(), &window))
        .cloned()
        .collect()
}

/// Earliest and latest dates across receipts and orders
pub fn combined_bounds(receipts: &[Receipt], orders: &[OnlineOrder]) -> DateBounds {
    let mut bounds = DateBounds::default();
    for date in receipts.iter().filter_map(receipt_date) {
        bounds.include(&date);
    }
    for date in orders.iter().filter_map(order_date) {
        bounds.include(&date);
    }
    bounds
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthOption {
    /// `YYYY-MM`
    pub key: String,
    /// `January 2024`
    pub label: String,
}

/// Months with at least one dated record, newest first
pub fn month_options(receipts: &[Receipt], orders: &[OnlineOrder]) -> Vec<MonthOption> {
    let keys: BTreeSet<String> = receipts
        .iter()
        .filter_map(receipt_date)
        .chain(orders.iter().filter_map(order_date))
        .map(|d| month_key(&d))
        .collect();

    keys.into_iter()
        .rev()
        .map(|key| MonthOption {
            label: format_month_long(&key),
            key,
        })
        .collect()
}

/// Keep a month selection only if it is still offered
pub fn reconcile_month(previous: Option<&str>, options: &[MonthOption]) -> Option<String> {
    previous
        .filter(|p| options.iter().any(|o| o.key == *p))
        .map(str::to_string)
}
