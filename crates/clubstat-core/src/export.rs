//! CSV and JSON exports
//!
//! Row builders return plain string records (header first) so callers can
//! print them or hand them to [`write_csv`]. Files are written to a temp file
//! next to the destination and renamed into place.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::info;

use crate::classify::is_fuel;
use crate::error::{Error, Result};
use crate::filter::{FilterState, Preset};
use crate::format::format_input_date;
use crate::models::{DetailMap, OnlineOrder, Receipt, Snapshot};
use crate::parse::{order_date, receipt_date, warehouse_location};
use crate::report::{ChartDataset, ChartMetric, OnlineReport, ReceiptReport, Tab};

pub type CsvRecord = Vec<String>;

pub const LEDGER_HEADER: [&str; 10] = [
    "Date",
    "Channel",
    "Location",
    "Number",
    "Item Description",
    "Item Number",
    "Quantity",
    "Unit Price",
    "Total Price",
    "Payment Type",
];

pub const TRIPS_HEADER: [&str; 8] = [
    "Date",
    "Channel",
    "Location",
    "Number",
    "Items/Gallons",
    "Tax",
    "Price / Gal",
    "Total",
];

fn header(names: &[&str]) -> CsvRecord {
    names.iter().map(|s| s.to_string()).collect()
}

/// Numbers print in their shortest form: `3`, `2.5`
fn num(value: f64) -> String {
    value.to_string()
}

fn date_cell(date: Option<chrono::NaiveDateTime>) -> String {
    date.map(|d| format_input_date(&d.date())).unwrap_or_default()
}

/// Receipt location for the ledger; blank when the receipt names no warehouse
fn ledger_location(receipt: &Receipt) -> String {
    let named = [
        &receipt.warehouse_name,
        &receipt.warehouse_short_name,
        &receipt.warehouse_city,
        &receipt.warehouse_number,
    ]
    .iter()
    .any(|f| f.as_deref().is_some_and(|s| !s.trim().is_empty()));
    if named {
        warehouse_location(receipt)
    } else {
        String::new()
    }
}

/// One row per receipt line and per online order line
///
/// Fuel lines are tagged `Gas` and report gallons as the quantity. Online
/// orders use fetched detail lines when available, then the header's summary
/// lines, then a single `Order total` row.
pub fn ledger_rows(receipts: &[Receipt], orders: &[OnlineOrder], details: &DetailMap) -> Vec<CsvRecord> {
    let mut rows = vec![header(&LEDGER_HEADER)];

    for receipt in receipts {
        let date = date_cell(receipt_date(receipt));
        let location = ledger_location(receipt);
        let number = receipt.key().to_string();
        let payment = receipt.payment_type().to_string();

        for item in &receipt.item_array {
            let gas = is_fuel(item);
            let quantity = if gas {
                item.fuel_unit_quantity.unwrap_or_else(|| item.units())
            } else {
                item.units()
            };
            let total = item.amount_value();
            let unit_price = match item.item_unit_price_amount {
                Some(p) if p != 0.0 => num(p),
                _ if quantity != 0.0 => num(total / quantity),
                _ => String::new(),
            };

            rows.push(vec![
                date.clone(),
                if gas { "Gas" } else { "Warehouse" }.to_string(),
                location.clone(),
                number.clone(),
                item.description(),
                item.item_number.clone().unwrap_or_default(),
                num(quantity),
                unit_price,
                num(total),
                payment.clone(),
            ]);
        }
    }

    for order in orders {
        let date = date_cell(order_date(order));
        let number = order.order_key().unwrap_or("").to_string();
        let detail = details.get(&number).filter(|_| !number.is_empty());

        let detail_lines: Vec<_> = detail.map(|d| d.line_items().collect()).unwrap_or_default();
        if !detail_lines.is_empty() {
            for line in detail_lines {
                rows.push(vec![
                    date.clone(),
                    "Online".to_string(),
                    String::new(),
                    number.clone(),
                    line.item_description.clone().unwrap_or_default(),
                    line.identity().unwrap_or("").to_string(),
                    num(line.quantity_value()),
                    num(line.price_value()),
                    num(line.line_total()),
                    String::new(),
                ]);
            }
        } else if !order.order_line_items.is_empty() {
            for line in &order.order_line_items {
                rows.push(vec![
                    date.clone(),
                    "Online".to_string(),
                    String::new(),
                    number.clone(),
                    line.item_description.clone().unwrap_or_default(),
                    line.identity().unwrap_or("").to_string(),
                    "1".to_string(),
                    String::new(),
                    String::new(),
                    String::new(),
                ]);
            }
        } else {
            let total = num(order.total_amount());
            rows.push(vec![
                date,
                "Online".to_string(),
                String::new(),
                number,
                "Order total".to_string(),
                String::new(),
                "1".to_string(),
                total.clone(),
                total,
                String::new(),
            ]);
        }
    }

    rows
}

/// `costco-receipts-<preset>[_<start>-<end>][_month-<YYYY-MM>].csv`
pub fn ledger_file_name(filter: &FilterState) -> String {
    let mut parts = vec![filter.preset.as_str().to_string()];
    if filter.preset == Preset::Custom {
        parts.push(format!(
            "{}-{}",
            filter
                .custom_start
                .map(|d| format_input_date(&d))
                .unwrap_or_else(|| "start".to_string()),
            filter
                .custom_end
                .map(|d| format_input_date(&d))
                .unwrap_or_else(|| "end".to_string()),
        ));
    }
    if let Some(month) = &filter.month {
        parts.push(format!("month-{}", month));
    }
    format!("costco-receipts-{}.csv", parts.join("_"))
}

/// Trip-level rows for the channels shown on `tab`
///
/// Warehouse visits, then online orders, then gas trips; the all tab
/// includes every channel.
pub fn trips_rows(tab: Tab, receipts: &ReceiptReport, online: &OnlineReport) -> Vec<CsvRecord> {
    let mut rows = vec![header(&TRIPS_HEADER)];

    if matches!(tab, Tab::All | Tab::Warehouse) {
        for visit in &receipts.visits {
            rows.push(vec![
                date_cell(visit.date),
                "Warehouse".to_string(),
                visit.location.clone(),
                visit.barcode.clone(),
                num(visit.items),
                num(visit.tax),
                String::new(),
                num(visit.total),
            ]);
        }
    }

    if matches!(tab, Tab::All | Tab::Online) {
        for order in &online.rows {
            rows.push(vec![
                date_cell(order.date),
                "Online".to_string(),
                order.location.clone(),
                order.order_number.clone(),
                order.items.to_string(),
                num(order.tax),
                String::new(),
                num(order.total),
            ]);
        }
    }

    if matches!(tab, Tab::All | Tab::Gas) {
        for trip in &receipts.gas.trips {
            rows.push(vec![
                date_cell(trip.date),
                "Gas".to_string(),
                trip.location.clone(),
                trip.transaction_number.clone(),
                num(trip.gallons),
                String::new(),
                num(trip.price_per_gallon),
                num(trip.total_price),
            ]);
        }
    }

    rows
}

pub fn trips_file_name(tab: Tab) -> String {
    format!("costco-trips-{}.csv", tab)
}

/// `Label` plus one column per series
pub fn chart_rows(metric: &ChartMetric, dataset: &ChartDataset) -> Vec<CsvRecord> {
    let mut rows = Vec::with_capacity(dataset.labels().len() + 1);

    match dataset {
        ChartDataset::Simple(series) => {
            rows.push(vec!["Label".to_string(), metric.label.to_string()]);
            for (i, label) in series.labels.iter().enumerate() {
                let value = series.values.get(i).copied().unwrap_or(0.0);
                rows.push(vec![label.clone(), num(value)]);
            }
        }
        ChartDataset::Stacked(stacked) => {
            let mut head = vec!["Label".to_string()];
            head.extend(stacked.series.iter().map(|s| s.label.clone()));
            rows.push(head);
            for (i, label) in stacked.labels.iter().enumerate() {
                let mut row = vec![label.clone()];
                row.extend(
                    stacked
                        .series
                        .iter()
                        .map(|s| num(s.values.get(i).copied().unwrap_or(0.0))),
                );
                rows.push(row);
            }
        }
    }

    rows
}

pub fn chart_file_name(tab: Tab, metric: &ChartMetric) -> String {
    format!("costco-chart-{}-{}.csv", tab, metric.id)
}

/// Write records to `path` atomically. Returns the number of data rows.
pub fn write_csv(path: &Path, rows: &[CsvRecord]) -> Result<usize> {
    let mut tmp = temp_beside(path)?;
    {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(tmp.as_file_mut());
        for row in rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
    }
    persist(tmp, path)?;

    let data_rows = rows.len().saturating_sub(1);
    info!("Wrote {} rows to {}", data_rows, path.display());
    Ok(data_rows)
}

/// Records as a CSV string, for printing to stdout
pub fn to_csv_string(rows: &[CsvRecord]) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    for row in rows {
        writer.write_record(row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| Error::InvalidData(format!("CSV buffer error: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| Error::InvalidData(format!("CSV is not UTF-8: {}", e)))
}

/// Pretty-printed raw snapshot, the same shape the store keeps
pub fn write_json_snapshot(path: &Path, snapshot: &Snapshot) -> Result<()> {
    let mut tmp = temp_beside(path)?;
    serde_json::to_writer_pretty(tmp.as_file_mut(), snapshot)?;
    tmp.as_file_mut().write_all(b"\n")?;
    persist(tmp, path)?;

    info!("Wrote snapshot JSON to {}", path.display());
    Ok(())
}

fn temp_beside(path: &Path) -> Result<NamedTempFile> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    Ok(NamedTempFile::new_in(dir)?)
}

fn persist(tmp: NamedTempFile, path: &Path) -> Result<()> {
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{find_metric, process_online_orders, process_receipts, MonthlyData};
    use chrono::NaiveDate;
    use serde_json::json;

    fn receipts() -> Vec<Receipt> {
        serde_json::from_value(json!([
            {
                "warehouseName": "SEATTLE",
                "transactionBarcode": "bc1",
                "transactionDateTime": "2024-01-05T12:30:00",
                "total": 27.5,
                "taxes": 1.5,
                "tenderArray": [{"tenderTypeName": "VISA"}],
                "itemArray": [
                    {"itemNumber": "1", "itemDescription01": "KS TOWEL", "itemDescription02": "12 PK",
                     "unit": 2, "amount": 20.0},
                    {"itemNumber": "2", "itemDescription01": "GAS, \"REGULAR\"", "fuelUnitQuantity": 2.5,
                     "unit": 1, "amount": 6.0}
                ]
            },
            {"transactionNumber": "55", "itemArray": [
                {"itemNumber": "9", "itemDescription01": "FREEBIE", "unit": 0, "amount": 0}
            ]}
        ]))
        .unwrap()
    }

    fn orders() -> (Vec<OnlineOrder>, DetailMap) {
        let orders = serde_json::from_value(json!([
            {"orderNumber": "A1", "orderPlacedDate": "2024-02-01", "orderTotal": 30.0},
            {"orderNumber": "A2", "orderPlacedDate": "2024-02-03", "orderTotal": 12.0,
             "orderLineItems": [{"itemNumber": "44", "itemDescription": "CABLE"}]},
            {"orderNumber": "A3", "orderTotal": 8.25}
        ]))
        .unwrap();
        let details = serde_json::from_value(json!({
            "A1": {"orderNumber": "A1", "shipToAddress": [{"orderLineItems": [
                {"itemNumber": "500", "itemDescription": "BLENDER", "quantity": 2, "price": 15.0}
            ]}]}
        }))
        .unwrap();
        (orders, details)
    }

    #[test]
    fn test_ledger_rows() {
        let (orders, details) = orders();
        let rows = ledger_rows(&receipts(), &orders, &details);
        assert_eq!(rows[0], header(&LEDGER_HEADER));
        assert_eq!(rows.len(), 1 + 3 + 3);

        assert_eq!(
            rows[1],
            vec!["2024-01-05", "Warehouse", "SEATTLE", "bc1", "KS TOWEL 12 PK", "1", "2", "10", "20", "VISA"]
        );
        // Fuel: gallons as quantity, price per gallon derived
        assert_eq!(rows[2][1], "Gas");
        assert_eq!(rows[2][6], "2.5");
        assert_eq!(rows[2][7], "2.4");

        // No date, no location, zero quantity
        assert_eq!(rows[3][0], "");
        assert_eq!(rows[3][2], "");
        assert_eq!(rows[3][3], "55");
        assert_eq!(rows[3][7], "");

        assert_eq!(
            rows[4],
            vec!["2024-02-01", "Online", "", "A1", "BLENDER", "500", "2", "15", "30", ""]
        );
        assert_eq!(rows[5], vec!["2024-02-03", "Online", "", "A2", "CABLE", "44", "1", "", "", ""]);
        assert_eq!(rows[6], vec!["", "Online", "", "A3", "Order total", "", "1", "8.25", "8.25", ""]);
        assert!(rows.iter().all(|r| r.len() == LEDGER_HEADER.len()));
    }

    #[test]
    fn test_ledger_file_name() {
        assert_eq!(ledger_file_name(&FilterState::default()), "costco-receipts-all.csv");

        let filter = FilterState {
            preset: Preset::Custom,
            custom_start: NaiveDate::from_ymd_opt(2024, 1, 1),
            custom_end: None,
            month: Some("2024-03".to_string()),
        };
        assert_eq!(
            ledger_file_name(&filter),
            "costco-receipts-custom_2024-01-01-end_month-2024-03.csv"
        );
    }

    #[test]
    fn test_trips_rows_by_tab() {
        let (orders, details) = orders();
        let receipt_report = process_receipts(&receipts());
        let online_report = process_online_orders(&orders, &details);

        let all = trips_rows(Tab::All, &receipt_report, &online_report);
        assert_eq!(all[0], header(&TRIPS_HEADER));
        // 2 warehouse visits, 3 orders, 1 gas fill
        assert_eq!(all.len(), 1 + 2 + 3 + 1);

        let gas = trips_rows(Tab::Gas, &receipt_report, &online_report);
        assert_eq!(gas.len(), 2);
        assert_eq!(gas[1], vec!["2024-01-05", "Gas", "SEATTLE", "bc1", "2.5", "", "2.4", "6"]);

        let online = trips_rows(Tab::Online, &receipt_report, &online_report);
        assert!(online[1..].iter().all(|r| r[1] == "Online"));
        assert_eq!(trips_file_name(Tab::Online), "costco-trips-online.csv");
    }

    #[test]
    fn test_chart_rows() {
        let receipt_report = process_receipts(&receipts());
        let monthly = MonthlyData::build(
            &receipt_report.monthly,
            &Default::default(),
            &receipt_report.gas.monthly,
        );
        let metric = find_metric(Tab::Warehouse, None);
        let dataset = metric.build(&monthly).unwrap();
        let rows = chart_rows(metric, &dataset);

        assert_eq!(rows[0], vec!["Label".to_string(), metric.label.to_string()]);
        assert_eq!(rows[1][0], "Jan 2024");
        assert_eq!(rows.len(), dataset.labels().len() + 1);
        assert_eq!(chart_file_name(Tab::Warehouse, metric), format!("costco-chart-warehouse-{}.csv", metric.id));
    }

    #[test]
    fn test_write_csv_quotes_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.csv");
        let rows = ledger_rows(&receipts(), &[], &DetailMap::default());

        let written = write_csv(&path, &rows).unwrap();
        assert_eq!(written, 3);

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("Date,Channel,Location,Number,Item Description"));
        assert!(content.contains("\"GAS, \"\"REGULAR\"\"\""));
        assert_eq!(content, to_csv_string(&rows).unwrap());
    }

    #[test]
    fn test_write_json_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        let snapshot = Snapshot {
            receipts: receipts(),
            updated_at: Some(1_700_000_000_000),
            ..Default::default()
        };

        write_json_snapshot(&path, &snapshot).unwrap();
        let loaded: Snapshot = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded, snapshot);
    }
}
