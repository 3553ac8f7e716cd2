//! Display formatting shared by reports, charts and exports

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::parse::parse_month_key;

const MONTHS_SHORT: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

const MONTHS_LONG: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// How a series value is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueFormat {
    Money,
    Number,
    /// Fixed decimals
    Decimal(u8),
}

impl ValueFormat {
    pub fn apply(&self, value: f64) -> String {
        match self {
            Self::Money => format_money(value),
            Self::Number => format_number(value),
            Self::Decimal(places) => format!("{:.*}", *places as usize, value),
        }
    }
}

/// `$1,234.56`, negatives as `-$1,234.56`
pub fn format_money(value: f64) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    let cents = (value.abs() * 100.0).round() as u64;
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, group_thousands(cents / 100), cents % 100)
}

/// Integers with thousands separators; fractions kept to at most 3 places
pub fn format_number(value: f64) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    let rounded = (value * 1000.0).round() / 1000.0;
    let sign = if rounded < 0.0 { "-" } else { "" };
    let abs = rounded.abs();
    let whole = abs.trunc() as u64;
    let frac = format!("{:.3}", abs.fract());
    let frac = frac.trim_start_matches('0').trim_end_matches('0');
    let frac = if frac == "." { "" } else { frac };
    format!("{}{}{}", sign, group_thousands(whole), frac)
}

pub fn format_gallons(value: f64) -> String {
    format!("{:.2}", value)
}

/// `-$12.00` style amount for returns
pub fn format_return_amount(amount: f64) -> String {
    format!("-{}", format_money(amount.abs()))
}

/// `Jan 5, 2024`
pub fn format_date(date: &NaiveDateTime) -> String {
    format_day(&date.date())
}

pub fn format_day(date: &NaiveDate) -> String {
    format!(
        "{} {}, {}",
        MONTHS_SHORT[date.month0() as usize],
        date.day(),
        date.year()
    )
}

/// `—` when the date is missing
pub fn format_opt_date(date: Option<&NaiveDateTime>) -> String {
    date.map(format_date).unwrap_or_else(|| "—".to_string())
}

/// `2024-01-05`
pub fn format_input_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// `2024-01` → `Jan 2024`; unrecognized keys are returned unchanged
pub fn format_month_label(key: &str) -> String {
    match parse_month_key(key) {
        Some((year, month)) => format!("{} {}", MONTHS_SHORT[(month - 1) as usize], year),
        None => key.to_string(),
    }
}

/// `2024-01` → `January 2024`
pub fn format_month_long(key: &str) -> String {
    match parse_month_key(key) {
        Some((year, month)) => format!("{} {}", MONTHS_LONG[(month - 1) as usize], year),
        None => key.to_string(),
    }
}

/// Shorten a name for table cells, ending in `…` when cut
pub fn truncate_name(name: &str, max_len: usize) -> String {
    if name.is_empty() {
        return "Item".to_string();
    }
    if name.chars().count() <= max_len {
        return name.to_string();
    }
    let cut: String = name.chars().take(max_len.saturating_sub(1)).collect();
    format!("{}…", cut)
}

fn group_thousands(mut n: u64) -> String {
    let mut groups = Vec::new();
    loop {
        if n < 1000 {
            groups.push(n.to_string());
            break;
        }
        groups.push(format!("{:03}", n % 1000));
        n /= 1000;
    }
    groups.reverse();
    groups.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(1234.56), "$1,234.56");
        assert_eq!(format_money(0.0), "$0.00");
        assert_eq!(format_money(-45.5), "-$45.50");
        assert_eq!(format_money(1_000_000.0), "$1,000,000.00");
        assert_eq!(format_money(f64::NAN), "$0.00");
        assert_eq!(format_return_amount(-12.0), "-$12.00");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1234.0), "1,234");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(10.12345), "10.123");
    }

    #[test]
    fn test_format_dates() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(format_day(&date), "Jan 5, 2024");
        assert_eq!(format_input_date(&date), "2024-01-05");
        assert_eq!(format_opt_date(None), "—");
        assert_eq!(format_month_label("2024-03"), "Mar 2024");
        assert_eq!(format_month_long("2024-03"), "March 2024");
        assert_eq!(format_month_label("bogus"), "bogus");
    }

    #[test]
    fn test_value_format() {
        assert_eq!(ValueFormat::Money.apply(3.5), "$3.50");
        assert_eq!(ValueFormat::Decimal(1).apply(12.34), "12.3");
        assert_eq!(format_gallons(10.0), "10.00");
    }

    #[test]
    fn test_truncate_name() {
        assert_eq!(truncate_name("SHORT", 28), "SHORT");
        assert_eq!(truncate_name("ABCDEFGHIJ", 5), "ABCD…");
        assert_eq!(truncate_name("", 5), "Item");
    }
}
