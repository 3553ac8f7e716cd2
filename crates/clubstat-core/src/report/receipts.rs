//! Warehouse and gas-station receipt aggregation

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::classify::{classify_line, is_countable, is_gas_only, is_return, is_rotisserie, LineKind};
use crate::models::{Receipt, ReceiptItem};
use crate::parse::{gas_location, month_key, receipt_date, receipt_month_key, warehouse_location};

use super::{bump, DateBounds, DateRangeText, LocationCounts};

/// One observed per-unit price
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceSample {
    pub date: Option<NaiveDateTime>,
    pub price: f64,
}

/// Running totals for one item, keyed by `itemNumber|name`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ItemStat {
    pub item_number: String,
    pub name: String,
    pub total_spent: f64,
    pub total_units: f64,
    pub purchases: f64,
    pub prices: Vec<PriceSample>,
}

impl ItemStat {
    pub fn new(item_number: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            item_number: item_number.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn record(&mut self, amount: f64, units: f64, sample: PriceSample) {
        self.total_spent += amount;
        self.total_units += units;
        self.purchases += units;
        self.prices.push(sample);
    }

    /// Average spend per purchase, 0 with no purchases
    pub fn average_price(&self) -> f64 {
        if self.purchases > 0.0 {
            self.total_spent / self.purchases
        } else {
            0.0
        }
    }
}

/// Item key → stats; ordered so ties rank deterministically
pub type ItemStats = BTreeMap<String, ItemStat>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GasTrip {
    pub date: Option<NaiveDateTime>,
    pub location: String,
    pub gallons: f64,
    pub total_price: f64,
    pub price_per_gallon: f64,
    pub transaction_number: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GasMonth {
    pub spent: f64,
    pub trips: u32,
    pub total_gallons: f64,
    pub locations: LocationCounts,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GasStats {
    pub trips: Vec<GasTrip>,
    pub total_trips: u32,
    pub total_gallons: f64,
    pub total_cost: f64,
    pub location_counts: LocationCounts,
    pub date_range: DateBounds,
    pub monthly: BTreeMap<String, GasMonth>,
}

impl GasStats {
    pub fn average_price_per_gallon(&self) -> f64 {
        if self.total_gallons > 0.0 {
            self.total_cost / self.total_gallons
        } else {
            0.0
        }
    }

    fn add_trip(&mut self, trip: GasTrip) {
        self.total_trips += 1;
        self.total_gallons += trip.gallons;
        self.total_cost += trip.total_price;
        bump(&mut self.location_counts, &trip.location);

        if let Some(date) = &trip.date {
            self.date_range.include(date);
            let month = self.monthly.entry(month_key(date)).or_default();
            month.spent += trip.total_price;
            month.trips += 1;
            month.total_gallons += trip.gallons;
            bump(&mut month.locations, &trip.location);
        }
        self.trips.push(trip);
    }
}

/// A receipt that was not gas-only
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WarehouseVisit {
    pub date: Option<NaiveDateTime>,
    pub location: String,
    pub total: f64,
    pub barcode: String,
    pub is_return: bool,
    /// Merchandise units on the receipt
    pub items: f64,
    pub tax: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WarehouseMonth {
    pub spent: f64,
    pub trips: u32,
    pub items: f64,
    pub rotisserie: f64,
    pub locations: LocationCounts,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReceiptSummary {
    pub total_spent: f64,
    pub total_units: f64,
    pub receipts_count: usize,
    pub shopping_receipts: u32,
    pub gas_only_receipts: u32,
    pub unique_items: usize,
    pub avg_item_price: f64,
    pub avg_per_receipt: f64,
    pub return_count: u32,
    pub return_amount: f64,
    pub gas_total: f64,
    pub total_tax: f64,
    pub rotisserie_spent: f64,
    pub rotisserie_count: f64,
    pub date_range: DateRangeText,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReceiptReport {
    pub item_stats: ItemStats,
    pub monthly: BTreeMap<String, WarehouseMonth>,
    pub gas: GasStats,
    pub visits: Vec<WarehouseVisit>,
    pub date_range: DateBounds,
    pub summary: ReceiptSummary,
}

#[derive(Default)]
struct Totals {
    total_spent: f64,
    sum_item_amounts: f64,
    total_units: f64,
    shopping_receipts: u32,
    gas_only_receipts: u32,
    return_count: u32,
    return_amount: f64,
    total_tax: f64,
    rotisserie_spent: f64,
    rotisserie_count: f64,
}

/// Per-receipt merchandise tallies
#[derive(Default)]
struct ReceiptUnits {
    units: f64,
    rotisserie: f64,
}

/// Aggregate receipts into item, gas, visit and monthly statistics
///
/// Malformed records never fail the report: missing numbers count as zero,
/// unparseable dates keep the record in totals but out of date bounds.
pub fn process_receipts(receipts: &[Receipt]) -> ReceiptReport {
    let mut report = ReceiptReport::default();
    let mut totals = Totals::default();

    for receipt in receipts {
        let total = receipt.total_amount();
        let date = receipt_date(receipt);
        report.date_range.include_opt(date.as_ref());

        let mut units = ReceiptUnits::default();
        for item in receipt.item_array.iter().filter(|i| is_countable(i)) {
            match classify_line(item) {
                LineKind::Merchandise => {
                    record_merchandise(&mut report.item_stats, &mut totals, &mut units, item, date)
                }
                LineKind::Fuel => record_fuel(&mut report.gas, receipt, item, date),
            }
        }

        if is_gas_only(&receipt.item_array) {
            totals.gas_only_receipts += 1;
            continue;
        }

        let location = warehouse_location(receipt);
        let tax = receipt.tax_amount();
        let returned = is_return(total);
        report.visits.push(WarehouseVisit {
            date,
            location: location.clone(),
            total,
            barcode: receipt.key().to_string(),
            is_return: returned,
            items: units.units,
            tax,
        });

        if returned {
            totals.return_count += 1;
            totals.return_amount += total.abs();
            totals.total_tax -= tax;
            continue;
        }

        totals.shopping_receipts += 1;
        totals.total_spent += total;
        totals.total_tax += tax;

        if let Some(key) = receipt_month_key(receipt, date.as_ref()) {
            let month = report.monthly.entry(key).or_default();
            month.spent += total;
            month.trips += 1;
            month.items += units.units;
            month.rotisserie += units.rotisserie;
            bump(&mut month.locations, &location);
        }
    }

    report.summary = ReceiptSummary {
        total_spent: totals.total_spent,
        total_units: totals.total_units,
        receipts_count: receipts.len(),
        shopping_receipts: totals.shopping_receipts,
        gas_only_receipts: totals.gas_only_receipts,
        unique_items: report.item_stats.len(),
        avg_item_price: ratio(totals.sum_item_amounts, totals.total_units),
        avg_per_receipt: ratio(totals.total_spent, totals.shopping_receipts as f64),
        return_count: totals.return_count,
        return_amount: totals.return_amount,
        gas_total: report.gas.total_cost,
        total_tax: totals.total_tax,
        rotisserie_spent: totals.rotisserie_spent,
        rotisserie_count: totals.rotisserie_count,
        date_range: report.date_range.text(),
    };
    report
}

fn record_merchandise(
    stats: &mut ItemStats,
    totals: &mut Totals,
    units: &mut ReceiptUnits,
    item: &ReceiptItem,
    date: Option<NaiveDateTime>,
) {
    let item_number = item.item_number().unwrap_or_default();
    let name = item
        .item_description01
        .as_deref()
        .unwrap_or("")
        .trim()
        .to_string();
    let unit = item.units();
    let amount = item.amount_value();

    let price = match item.item_unit_price_amount {
        Some(p) if p != 0.0 => p,
        _ if unit > 0.0 => amount / unit,
        _ => amount,
    };

    stats
        .entry(format!("{}|{}", item_number, name))
        .or_insert_with(|| ItemStat::new(item_number, name))
        .record(amount, unit, PriceSample { date, price });

    totals.sum_item_amounts += amount;
    totals.total_units += unit;
    units.units += unit;

    if is_rotisserie(item_number) {
        totals.rotisserie_spent += amount;
        totals.rotisserie_count += unit;
        units.rotisserie += unit;
    }
}

fn record_fuel(gas: &mut GasStats, receipt: &Receipt, item: &ReceiptItem, date: Option<NaiveDateTime>) {
    let gallons = item.fuel_unit_quantity.unwrap_or_else(|| item.units());
    let total_price = item.amount_value();
    if gallons <= 0.0 || total_price <= 0.0 {
        return;
    }

    let price_per_gallon = match item.item_unit_price_amount {
        Some(p) if p != 0.0 => p,
        _ => total_price / gallons,
    };
    let transaction_number = receipt
        .transaction_number
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .or_else(|| receipt.transaction_barcode.as_deref())
        .unwrap_or("")
        .to_string();

    gas.add_trip(GasTrip {
        date,
        location: gas_location(receipt),
        gallons,
        total_price,
        price_per_gallon,
        transaction_number,
    });
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn receipt(value: serde_json::Value) -> Receipt {
        serde_json::from_value(value).unwrap()
    }

    fn paper_towels() -> Receipt {
        receipt(json!({
            "warehouseName": "SEATTLE",
            "warehouseNumber": "1",
            "transactionDateTime": "2024-01-05T10:00:00",
            "transactionDate": "2024-01-05",
            "transactionBarcode": "21000100012401051000",
            "total": 45.67,
            "taxes": 0,
            "itemArray": [{
                "itemNumber": "12345",
                "itemDescription01": "PAPER TOWELS",
                "unit": 2,
                "amount": 45.67,
            }]
        }))
    }

    fn fuel_receipt() -> Receipt {
        receipt(json!({
            "warehouseName": "KIRKLAND",
            "transactionDateTime": "2024-02-10T08:15:00",
            "transactionNumber": "557",
            "total": 35.00,
            "itemArray": [{
                "itemNumber": "300",
                "itemDescription01": "UNLEADED",
                "unit": 1,
                "amount": 35.00,
                "fuelUnitQuantity": 10,
                "itemUnitPriceAmount": 3.50,
            }]
        }))
    }

    #[test]
    fn test_single_merchandise_receipt() {
        let report = process_receipts(&[paper_towels()]);

        let stat = &report.item_stats["12345|PAPER TOWELS"];
        assert!((stat.total_spent - 45.67).abs() < 1e-9);
        assert_eq!(stat.total_units, 2.0);
        assert_eq!(stat.purchases, 2.0);
        assert_eq!(stat.prices.len(), 1);
        assert!((stat.prices[0].price - 22.835).abs() < 1e-9);

        assert_eq!(report.visits.len(), 1);
        assert_eq!(report.visits[0].location, "SEATTLE");
        assert_eq!(report.visits[0].items, 2.0);
        assert!((report.monthly["2024-01"].spent - 45.67).abs() < 1e-9);
        assert_eq!(report.monthly["2024-01"].trips, 1);
        assert_eq!(report.monthly["2024-01"].locations["SEATTLE"], 1);

        assert_eq!(report.summary.shopping_receipts, 1);
        assert_eq!(report.summary.unique_items, 1);
        assert_eq!(report.summary.date_range.start.as_deref(), Some("Jan 5, 2024"));
    }

    #[test]
    fn test_gas_only_receipt() {
        let report = process_receipts(&[fuel_receipt()]);

        assert_eq!(report.gas.trips.len(), 1);
        let trip = &report.gas.trips[0];
        assert_eq!(trip.gallons, 10.0);
        assert_eq!(trip.total_price, 35.0);
        assert_eq!(trip.price_per_gallon, 3.5);
        assert_eq!(trip.location, "KIRKLAND");
        assert_eq!(trip.transaction_number, "557");

        assert!(report.visits.is_empty());
        assert!(report.item_stats.is_empty());
        assert!(report.monthly.is_empty());
        assert_eq!(report.summary.gas_only_receipts, 1);
        assert_eq!(report.summary.shopping_receipts, 0);
        assert_eq!(report.gas.monthly["2024-02"].trips, 1);
        assert_eq!(report.summary.gas_total, 35.0);
    }

    #[test]
    fn test_mixed_receipt_splits_fuel_and_merchandise() {
        let mixed = receipt(json!({
            "warehouseName": "KIRKLAND",
            "transactionDateTime": "2024-02-10T08:15:00",
            "total": 50.0,
            "itemArray": [
                {"itemNumber": "300", "itemDescription01": "PREMIUM", "unit": 5, "amount": 25.0},
                {"itemNumber": "87745", "itemDescription01": "ROTISSERIE CHICKEN", "unit": 5, "amount": 24.95}
            ]
        }));
        let report = process_receipts(&[mixed]);

        assert_eq!(report.gas.total_trips, 1);
        assert_eq!(report.gas.trips[0].price_per_gallon, 5.0);
        assert_eq!(report.visits.len(), 1);
        assert_eq!(report.visits[0].items, 5.0);
        assert_eq!(report.summary.rotisserie_count, 5.0);
        assert!((report.summary.rotisserie_spent - 24.95).abs() < 1e-9);
        assert_eq!(report.monthly["2024-02"].rotisserie, 5.0);
        assert_eq!(report.summary.gas_only_receipts, 0);
    }

    #[test]
    fn test_return_receipt() {
        let refund = receipt(json!({
            "warehouseCity": "ISSAQUAH",
            "transactionDate": "2024-03-01",
            "total": -12.00,
            "taxes": 1.00,
            "itemArray": [{"itemNumber": "5", "itemDescription01": "LAMP", "unit": -1, "amount": -12.00}]
        }));
        let report = process_receipts(&[paper_towels(), refund]);

        assert_eq!(report.summary.return_count, 1);
        assert_eq!(report.summary.return_amount, 12.0);
        assert!((report.summary.total_spent - 45.67).abs() < 1e-9);
        assert_eq!(report.summary.total_tax, -1.0);
        assert_eq!(report.summary.shopping_receipts, 1);
        assert_eq!(report.visits.len(), 2);
        assert!(report.visits[1].is_return);
        assert_eq!(report.visits[1].location, "ISSAQUAH");
        assert!(!report.monthly.contains_key("2024-03"));
    }

    #[test]
    fn test_average_item_price() {
        let basket = receipt(json!({
            "transactionDate": "2024-01-06",
            "total": 30.0,
            "itemArray": [
                {"itemNumber": "1", "itemDescription01": "A", "unit": 1, "amount": 10.0},
                {"itemNumber": "2", "itemDescription01": "B", "unit": 3, "amount": 20.0},
                {"itemNumber": "3", "itemDescription01": "VOID", "unit": 1, "amount": 0}
            ]
        }));
        let report = process_receipts(&[basket]);

        assert_eq!(report.summary.total_units, 4.0);
        assert!((report.summary.avg_item_price - 7.5).abs() < 1e-9);
        assert_eq!(report.summary.avg_per_receipt, 30.0);
        assert_eq!(report.summary.unique_items, 2);
    }

    #[test]
    fn test_undated_receipt_counts_without_bounds() {
        let undated = receipt(json!({
            "transactionDateTime": "not a date",
            "total": 5.0,
            "itemArray": [{"itemNumber": "9", "itemDescription01": "GUM", "unit": 1, "amount": 5.0}]
        }));
        let report = process_receipts(&[undated]);

        assert_eq!(report.summary.total_spent, 5.0);
        assert!(report.date_range.is_empty());
        assert!(report.monthly.is_empty());
        assert_eq!(report.item_stats["9|GUM"].prices[0].date, None);
        assert_eq!(report.visits[0].location, "Warehouse #–");
    }

    #[test]
    fn test_empty_input() {
        let report = process_receipts(&[]);
        assert_eq!(report.summary, ReceiptSummary::default());
        assert!(report.gas.trips.is_empty());
    }
}
