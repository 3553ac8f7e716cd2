//! Line-item classification rules
//!
//! Keyword matching over receipt descriptions decides whether a line is fuel
//! or merchandise. Matching is substring based and case-insensitive, so
//! "GAS " and "gas/" both hit while "GASKET" does not.

use crate::models::ReceiptItem;

/// Substrings that mark a receipt line as fuel
pub const FUEL_KEYWORDS: &[&str] = &[
    "gasoline", "gas ", "gas-", "gas/", "unleaded", "premium", "diesel", "fuel",
];

/// Item number of the rotisserie chicken, tracked separately in summaries
pub const ROTISSERIE_ITEM_NUMBER: &str = "87745";

/// Items whose upstream price history is known to be noise
pub const PRICE_INCREASE_EXCLUSIONS: &[&str] = &["155", "712309"];

/// What a receipt line contributes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Fuel,
    Merchandise,
}

pub fn classify_line(item: &ReceiptItem) -> LineKind {
    if is_fuel(item) {
        LineKind::Fuel
    } else {
        LineKind::Merchandise
    }
}

pub fn is_fuel(item: &ReceiptItem) -> bool {
    let desc = format!(
        "{} {}",
        item.item_description01.as_deref().unwrap_or(""),
        item.item_description02.as_deref().unwrap_or("")
    )
    .to_lowercase();
    FUEL_KEYWORDS.iter().any(|kw| desc.contains(kw))
}

/// Receipt made entirely of countable fuel lines; an empty receipt is not
/// gas-only, and neither is one with a zero-amount fuel line
pub fn is_gas_only(items: &[ReceiptItem]) -> bool {
    !items.is_empty() && items.iter().all(|item| is_countable(item) && is_fuel(item))
}

/// Lines that count toward statistics at all
///
/// Needs an item number and positive quantity and amount.
pub fn is_countable(item: &ReceiptItem) -> bool {
    item.item_number().is_some() && item.units() > 0.0 && item.amount_value() > 0.0
}

/// Negative totals are returns
pub fn is_return(total: f64) -> bool {
    total < 0.0
}

pub fn is_rotisserie(item_number: &str) -> bool {
    item_number.trim() == ROTISSERIE_ITEM_NUMBER
}

pub fn is_excluded_from_price_trends(item_number: &str) -> bool {
    PRICE_INCREASE_EXCLUSIONS.contains(&item_number.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(desc1: &str, desc2: &str) -> ReceiptItem {
        ReceiptItem {
            item_number: Some("1".into()),
            item_description01: Some(desc1.into()),
            item_description02: Some(desc2.into()),
            unit: Some(1.0),
            amount: Some(1.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_fuel_keywords() {
        assert!(is_fuel(&item("UNLEADED", "")));
        assert!(is_fuel(&item("Premium", "")));
        assert!(is_fuel(&item("REG GAS", "10 GAL")));
        assert!(is_fuel(&item("DIESEL", "")));
        assert!(!is_fuel(&item("GASKET SET", "")));
        assert!(!is_fuel(&item("PAPER TOWELS", "")));
    }

    #[test]
    fn test_description_join_matches_across_fields() {
        // "GAS" at the end of the first field plus the joining space
        assert!(is_fuel(&item("SELF SERVE GAS", "REGULAR")));
        assert_eq!(classify_line(&item("BANANAS", "")), LineKind::Merchandise);
    }

    #[test]
    fn test_gas_only() {
        assert!(is_gas_only(&[item("UNLEADED", "")]));
        assert!(!is_gas_only(&[item("UNLEADED", ""), item("MILK", "")]));
        assert!(!is_gas_only(&[]));

        let mut voided = item("UNLEADED", "");
        voided.amount = Some(0.0);
        assert!(!is_gas_only(&[item("UNLEADED", ""), voided]));
    }

    #[test]
    fn test_countable_lines() {
        assert!(is_countable(&item("MILK", "")));

        let mut line = item("MILK", "");
        line.unit = Some(0.0);
        assert!(!is_countable(&line));

        let mut line = item("MILK", "");
        line.amount = Some(-4.0);
        assert!(!is_countable(&line));

        let mut line = item("MILK", "");
        line.item_number = None;
        assert!(!is_countable(&line));
    }

    #[test]
    fn test_item_lists() {
        assert!(is_rotisserie(" 87745"));
        assert!(is_excluded_from_price_trends("712309"));
        assert!(!is_excluded_from_price_trends("12345"));
        assert!(is_return(-0.01));
        assert!(!is_return(0.0));
    }
}
