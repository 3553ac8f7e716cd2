//! Month-by-month series and the chart catalog built on them

use std::collections::BTreeMap;

use serde::Serialize;

use crate::format::{format_month_label, ValueFormat};

use super::online::OnlineMonth;
use super::receipts::{GasMonth, WarehouseMonth};
use super::{LocationCounts, Tab};

/// Palette for stacked location series; "Other" takes the next free slot
pub const STACK_COLORS: [&str; 5] = ["#2563eb", "#0ea5e9", "#a855f7", "#f97316", "#f43f5e"];

/// Named locations in a stacked chart before the rest fold into "Other"
const STACK_TOP_LOCATIONS: usize = 4;

pub const ROTISSERIE_LABEL: &str = "🍗";
pub const ROTISSERIE_TOOLTIP: &str = "Rotisserie Chicken";

/// One month of one channel (or of all channels combined)
///
/// Fields a channel does not track stay zero: online months have `orders`
/// but no `trips`, only gas months carry `total_gallons`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonthlyEntry {
    /// `YYYY-MM`
    pub month: String,
    /// `Jan 2024`
    pub label: String,
    pub spent: f64,
    pub trips: u32,
    pub orders: u32,
    pub items: f64,
    pub rotisserie: f64,
    pub total_gallons: f64,
    /// Gas gallons folded into a combined month
    pub gas_gallons: f64,
    pub locations: LocationCounts,
}

impl MonthlyEntry {
    fn new(month: &str) -> Self {
        Self {
            month: month.to_string(),
            label: format_month_label(month),
            ..Default::default()
        }
    }
}

/// Month-sorted entries per channel
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonthlyData {
    pub warehouse: Vec<MonthlyEntry>,
    pub online: Vec<MonthlyEntry>,
    pub gas: Vec<MonthlyEntry>,
    pub all: Vec<MonthlyEntry>,
}

impl MonthlyData {
    pub fn build(
        warehouse: &BTreeMap<String, WarehouseMonth>,
        online: &BTreeMap<String, OnlineMonth>,
        gas: &BTreeMap<String, GasMonth>,
    ) -> Self {
        let warehouse = normalize_warehouse(warehouse);
        let online = normalize_online(online);
        let gas = normalize_gas(gas);
        let all = build_all_monthly(&warehouse, &online, &gas);
        Self {
            warehouse,
            online,
            gas,
            all,
        }
    }
}

// BTreeMap iteration is already in month order

pub fn normalize_warehouse(months: &BTreeMap<String, WarehouseMonth>) -> Vec<MonthlyEntry> {
    months
        .iter()
        .map(|(month, data)| MonthlyEntry {
            spent: data.spent,
            trips: data.trips,
            items: data.items,
            rotisserie: data.rotisserie,
            locations: data.locations.clone(),
            ..MonthlyEntry::new(month)
        })
        .collect()
}

pub fn normalize_online(months: &BTreeMap<String, OnlineMonth>) -> Vec<MonthlyEntry> {
    months
        .iter()
        .map(|(month, data)| MonthlyEntry {
            spent: data.spent,
            orders: data.orders,
            items: data.items as f64,
            ..MonthlyEntry::new(month)
        })
        .collect()
}

pub fn normalize_gas(months: &BTreeMap<String, GasMonth>) -> Vec<MonthlyEntry> {
    months
        .iter()
        .map(|(month, data)| MonthlyEntry {
            spent: data.spent,
            trips: data.trips,
            total_gallons: data.total_gallons,
            locations: data.locations.clone(),
            ..MonthlyEntry::new(month)
        })
        .collect()
}

/// Combine the three channels month by month
///
/// Online orders count as trips. Only warehouse locations carry over, and gas
/// gallons land in `gas_gallons`.
pub fn build_all_monthly(
    warehouse: &[MonthlyEntry],
    online: &[MonthlyEntry],
    gas: &[MonthlyEntry],
) -> Vec<MonthlyEntry> {
    fn entry<'a>(combined: &'a mut BTreeMap<String, MonthlyEntry>, month: &str) -> &'a mut MonthlyEntry {
        combined
            .entry(month.to_string())
            .or_insert_with(|| MonthlyEntry::new(month))
    }

    let mut combined: BTreeMap<String, MonthlyEntry> = BTreeMap::new();
    for w in warehouse {
        let e = entry(&mut combined, &w.month);
        e.spent += w.spent;
        e.trips += w.trips;
        e.items += w.items;
        e.rotisserie += w.rotisserie;
        for (location, count) in &w.locations {
            *e.locations.entry(location.clone()).or_insert(0) += count;
        }
    }
    for o in online {
        let e = entry(&mut combined, &o.month);
        e.spent += o.spent;
        e.trips += o.orders;
        e.items += o.items;
    }
    for g in gas {
        let e = entry(&mut combined, &g.month);
        e.spent += g.spent;
        e.trips += g.trips;
        e.gas_gallons += g.total_gallons;
    }

    combined.into_values().collect()
}

/// One line of values over the month labels
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    pub format: ValueFormat,
    pub integer_ticks: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackSeries {
    pub label: String,
    pub color: &'static str,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackedSeries {
    pub labels: Vec<String>,
    pub series: Vec<StackSeries>,
    pub format: ValueFormat,
    pub integer_ticks: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartDataset {
    Simple(Series),
    Stacked(StackedSeries),
}

impl ChartDataset {
    pub fn labels(&self) -> &[String] {
        match self {
            Self::Simple(s) => &s.labels,
            Self::Stacked(s) => &s.labels,
        }
    }

    pub fn format(&self) -> ValueFormat {
        match self {
            Self::Simple(s) => s.format,
            Self::Stacked(s) => s.format,
        }
    }
}

fn labels(entries: &[MonthlyEntry]) -> Vec<String> {
    entries.iter().map(|e| e.label.clone()).collect()
}

/// `None` for an empty month list
pub fn simple_series(
    entries: &[MonthlyEntry],
    value: impl Fn(&MonthlyEntry) -> f64,
    format: ValueFormat,
    integer_ticks: bool,
) -> Option<ChartDataset> {
    if entries.is_empty() {
        return None;
    }
    Some(ChartDataset::Simple(Series {
        labels: labels(entries),
        values: entries.iter().map(value).collect(),
        format,
        integer_ticks,
    }))
}

/// Per-month ratio, 0 where the denominator is not positive
pub fn average_series(
    entries: &[MonthlyEntry],
    numerator: impl Fn(&MonthlyEntry) -> f64,
    denominator: impl Fn(&MonthlyEntry) -> f64,
    format: ValueFormat,
) -> Option<ChartDataset> {
    simple_series(
        entries,
        |e| {
            let d = denominator(e);
            if d > 0.0 {
                numerator(e) / d
            } else {
                0.0
            }
        },
        format,
        false,
    )
}

/// Visits per location stacked by month
///
/// The four busiest locations get their own series; "Other" appears only when
/// more locations exist and holds the remainder of each month.
pub fn stacked_by_location(entries: &[MonthlyEntry]) -> Option<ChartDataset> {
    if entries.is_empty() {
        return None;
    }

    let totals = super::merge_location_counts(entries.iter().map(|e| &e.locations));
    if totals.is_empty() {
        return None;
    }

    let top: Vec<String> = super::ranked_locations(&totals)
        .into_iter()
        .take(STACK_TOP_LOCATIONS)
        .map(|(location, _)| location)
        .collect();

    let count_at = |e: &MonthlyEntry, location: &str| e.locations.get(location).copied().unwrap_or(0);

    let mut series: Vec<StackSeries> = top
        .iter()
        .enumerate()
        .map(|(idx, location)| StackSeries {
            label: location.clone(),
            color: STACK_COLORS[idx % STACK_COLORS.len()],
            values: entries.iter().map(|e| count_at(e, location) as f64).collect(),
        })
        .collect();

    if totals.len() > top.len() {
        series.push(StackSeries {
            label: "Other".to_string(),
            color: STACK_COLORS[top.len() % STACK_COLORS.len()],
            values: entries
                .iter()
                .map(|e| {
                    let total: u32 = e.locations.values().sum();
                    let top_sum: u32 = top.iter().map(|l| count_at(e, l)).sum();
                    total.saturating_sub(top_sum) as f64
                })
                .collect(),
        });
    }

    Some(ChartDataset::Stacked(StackedSeries {
        labels: labels(entries),
        series,
        format: ValueFormat::Number,
        integer_ticks: true,
    }))
}

/// A chart the user can pick on a tab
#[derive(Debug, Clone, Copy)]
pub struct ChartMetric {
    pub id: &'static str,
    pub label: &'static str,
    pub tooltip: Option<&'static str>,
    pub builder: fn(&MonthlyData) -> Option<ChartDataset>,
}

impl ChartMetric {
    pub fn build(&self, data: &MonthlyData) -> Option<ChartDataset> {
        (self.builder)(data)
    }

    pub fn display_label(&self) -> &'static str {
        self.tooltip.unwrap_or(self.label)
    }
}

const fn metric(
    id: &'static str,
    label: &'static str,
    builder: fn(&MonthlyData) -> Option<ChartDataset>,
) -> ChartMetric {
    ChartMetric {
        id,
        label,
        tooltip: None,
        builder,
    }
}

const fn rotisserie_metric(
    id: &'static str,
    builder: fn(&MonthlyData) -> Option<ChartDataset>,
) -> ChartMetric {
    ChartMetric {
        id,
        label: ROTISSERIE_LABEL,
        tooltip: Some(ROTISSERIE_TOOLTIP),
        builder,
    }
}

fn spent(e: &MonthlyEntry) -> f64 {
    e.spent
}
fn trips(e: &MonthlyEntry) -> f64 {
    e.trips as f64
}
fn orders(e: &MonthlyEntry) -> f64 {
    e.orders as f64
}
fn items(e: &MonthlyEntry) -> f64 {
    e.items
}
fn rotisserie(e: &MonthlyEntry) -> f64 {
    e.rotisserie
}
fn gallons(e: &MonthlyEntry) -> f64 {
    e.total_gallons
}

fn all_spent(d: &MonthlyData) -> Option<ChartDataset> {
    simple_series(&d.all, spent, ValueFormat::Money, false)
}
fn all_trips(d: &MonthlyData) -> Option<ChartDataset> {
    simple_series(&d.all, trips, ValueFormat::Number, true)
}
fn all_items(d: &MonthlyData) -> Option<ChartDataset> {
    simple_series(&d.all, items, ValueFormat::Number, true)
}
fn all_avg(d: &MonthlyData) -> Option<ChartDataset> {
    average_series(&d.all, spent, trips, ValueFormat::Money)
}
fn all_rotisserie(d: &MonthlyData) -> Option<ChartDataset> {
    simple_series(&d.all, rotisserie, ValueFormat::Number, true)
}
fn warehouse_spent(d: &MonthlyData) -> Option<ChartDataset> {
    simple_series(&d.warehouse, spent, ValueFormat::Money, false)
}
fn warehouse_trips(d: &MonthlyData) -> Option<ChartDataset> {
    simple_series(&d.warehouse, trips, ValueFormat::Number, true)
}
fn warehouse_items(d: &MonthlyData) -> Option<ChartDataset> {
    simple_series(&d.warehouse, items, ValueFormat::Number, true)
}
fn warehouse_locations(d: &MonthlyData) -> Option<ChartDataset> {
    stacked_by_location(&d.warehouse)
}
fn warehouse_avg(d: &MonthlyData) -> Option<ChartDataset> {
    average_series(&d.warehouse, spent, trips, ValueFormat::Money)
}
fn warehouse_rotisserie(d: &MonthlyData) -> Option<ChartDataset> {
    simple_series(&d.warehouse, rotisserie, ValueFormat::Number, true)
}
fn online_spent(d: &MonthlyData) -> Option<ChartDataset> {
    simple_series(&d.online, spent, ValueFormat::Money, false)
}
fn online_orders(d: &MonthlyData) -> Option<ChartDataset> {
    simple_series(&d.online, orders, ValueFormat::Number, true)
}
fn online_items(d: &MonthlyData) -> Option<ChartDataset> {
    simple_series(&d.online, items, ValueFormat::Number, true)
}
fn online_avg(d: &MonthlyData) -> Option<ChartDataset> {
    average_series(&d.online, spent, orders, ValueFormat::Money)
}
fn gas_spent(d: &MonthlyData) -> Option<ChartDataset> {
    simple_series(&d.gas, spent, ValueFormat::Money, false)
}
fn gas_trips(d: &MonthlyData) -> Option<ChartDataset> {
    simple_series(&d.gas, trips, ValueFormat::Number, true)
}
fn gas_avg_price(d: &MonthlyData) -> Option<ChartDataset> {
    average_series(&d.gas, spent, gallons, ValueFormat::Money)
}
fn gas_gallons(d: &MonthlyData) -> Option<ChartDataset> {
    simple_series(&d.gas, gallons, ValueFormat::Number, false)
}
fn gas_avg_gallons(d: &MonthlyData) -> Option<ChartDataset> {
    average_series(&d.gas, gallons, trips, ValueFormat::Decimal(1))
}
fn gas_locations(d: &MonthlyData) -> Option<ChartDataset> {
    stacked_by_location(&d.gas)
}

const ALL_METRICS: &[ChartMetric] = &[
    metric("allSpent", "Monthly Spend", all_spent),
    metric("allTrips", "Trips per Month", all_trips),
    metric("allItems", "Items per Month", all_items),
    metric("allWarehouses", "Warehouses Visited", warehouse_locations),
    metric("allAvg", "Avg Spend per Trip", all_avg),
    rotisserie_metric("allRotisserie", all_rotisserie),
];

const WAREHOUSE_METRICS: &[ChartMetric] = &[
    metric("warehouseSpent", "Monthly Spend", warehouse_spent),
    metric("warehouseTrips", "Trips per Month", warehouse_trips),
    metric("warehouseItems", "Items per Month", warehouse_items),
    metric("warehouseWarehouses", "Warehouses Visited", warehouse_locations),
    metric("warehouseAvg", "Avg Spend per Trip", warehouse_avg),
    rotisserie_metric("warehouseRotisserie", warehouse_rotisserie),
];

const ONLINE_METRICS: &[ChartMetric] = &[
    metric("onlineSpent", "Monthly Spend", online_spent),
    metric("onlineOrders", "Orders per Month", online_orders),
    metric("onlineItems", "Items per Month", online_items),
    metric("onlineAvg", "Avg Spend per Order", online_avg),
];

const GAS_METRICS: &[ChartMetric] = &[
    metric("gasSpent", "Monthly Spend", gas_spent),
    metric("gasTrips", "Refuels per Month", gas_trips),
    metric("gasAvgPrice", "Avg Price / Gallon", gas_avg_price),
    metric("gasGallons", "Gallons per Month", gas_gallons),
    metric("gasAvgGallons", "Avg Gallons / Trip", gas_avg_gallons),
    metric("gasLocations", "Locations Visited", gas_locations),
];

/// Charts offered on a tab; the first is the default
pub fn chart_metrics(tab: Tab) -> &'static [ChartMetric] {
    match tab {
        Tab::All => ALL_METRICS,
        Tab::Warehouse => WAREHOUSE_METRICS,
        Tab::Online => ONLINE_METRICS,
        Tab::Gas => GAS_METRICS,
    }
}

/// Look a chart up by id, falling back to the tab's default for unknown ids
pub fn find_metric(tab: Tab, id: Option<&str>) -> &'static ChartMetric {
    let metrics = chart_metrics(tab);
    id.and_then(|id| metrics.iter().find(|m| m.id.eq_ignore_ascii_case(id)))
        .unwrap_or(&metrics[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warehouse_month(spent: f64, trips: u32, locations: &[(&str, u32)]) -> WarehouseMonth {
        WarehouseMonth {
            spent,
            trips,
            items: trips as f64 * 3.0,
            rotisserie: 1.0,
            locations: locations.iter().map(|(l, c)| (l.to_string(), *c)).collect(),
        }
    }

    fn sample_data() -> MonthlyData {
        let warehouse: BTreeMap<String, WarehouseMonth> = [
            ("2024-02".to_string(), warehouse_month(200.0, 2, &[("SEATTLE", 2)])),
            ("2024-01".to_string(), warehouse_month(100.0, 1, &[("KIRKLAND", 1)])),
        ]
        .into_iter()
        .collect();
        let online: BTreeMap<String, OnlineMonth> = [(
            "2024-01".to_string(),
            OnlineMonth {
                spent: 50.0,
                orders: 1,
                items: 2,
            },
        )]
        .into_iter()
        .collect();
        let gas: BTreeMap<String, GasMonth> = [(
            "2024-03".to_string(),
            GasMonth {
                spent: 40.0,
                trips: 2,
                total_gallons: 12.0,
                locations: [("KIRKLAND".to_string(), 2)].into_iter().collect(),
            },
        )]
        .into_iter()
        .collect();
        MonthlyData::build(&warehouse, &online, &gas)
    }

    #[test]
    fn test_combined_months() {
        let data = sample_data();

        let months: Vec<&str> = data.all.iter().map(|e| e.month.as_str()).collect();
        assert_eq!(months, vec!["2024-01", "2024-02", "2024-03"]);

        let jan = &data.all[0];
        assert_eq!(jan.label, "Jan 2024");
        assert_eq!(jan.spent, 150.0);
        assert_eq!(jan.trips, 2);
        assert_eq!(jan.items, 5.0);
        assert_eq!(jan.locations["KIRKLAND"], 1);

        let mar = &data.all[2];
        assert_eq!(mar.trips, 2);
        assert_eq!(mar.gas_gallons, 12.0);
        assert_eq!(mar.items, 0.0);
        // gas locations stay out of the combined map
        assert!(mar.locations.is_empty());
    }

    #[test]
    fn test_average_series_zero_denominator() {
        let entries = vec![
            MonthlyEntry {
                spent: 30.0,
                trips: 3,
                ..MonthlyEntry::new("2024-01")
            },
            MonthlyEntry {
                spent: 10.0,
                ..MonthlyEntry::new("2024-02")
            },
        ];
        let Some(ChartDataset::Simple(series)) =
            average_series(&entries, spent, trips, ValueFormat::Money)
        else {
            panic!("expected a simple series");
        };
        assert_eq!(series.values, vec![10.0, 0.0]);
        assert!(!series.integer_ticks);
        assert!(simple_series(&[], spent, ValueFormat::Money, false).is_none());
    }

    #[test]
    fn test_stacked_locations_with_other() {
        let locations = [("A", 5), ("B", 4), ("C", 3), ("D", 2), ("E", 1), ("F", 1)];
        let entries = vec![MonthlyEntry {
            locations: locations.iter().map(|(l, c)| (l.to_string(), *c)).collect(),
            ..MonthlyEntry::new("2024-01")
        }];

        let Some(ChartDataset::Stacked(stacked)) = stacked_by_location(&entries) else {
            panic!("expected a stacked series");
        };
        let names: Vec<&str> = stacked.series.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C", "D", "Other"]);
        assert_eq!(stacked.series[4].values, vec![2.0]);
        assert_eq!(stacked.series[4].color, STACK_COLORS[4]);
        assert_eq!(stacked.series[0].color, STACK_COLORS[0]);
        assert!(stacked.integer_ticks);
    }

    #[test]
    fn test_stacked_without_other() {
        let entries = vec![MonthlyEntry {
            locations: [("A".to_string(), 1), ("B".to_string(), 2)].into_iter().collect(),
            ..MonthlyEntry::new("2024-01")
        }];
        let Some(ChartDataset::Stacked(stacked)) = stacked_by_location(&entries) else {
            panic!("expected a stacked series");
        };
        assert_eq!(stacked.series.len(), 2);
        assert_eq!(stacked.series[0].label, "B");

        let bare = vec![MonthlyEntry::new("2024-01")];
        assert!(stacked_by_location(&bare).is_none());
    }

    #[test]
    fn test_metric_catalog() {
        let data = sample_data();

        assert_eq!(chart_metrics(Tab::All).len(), 6);
        assert_eq!(chart_metrics(Tab::Online).len(), 4);
        assert_eq!(find_metric(Tab::Gas, None).id, "gasSpent");
        assert_eq!(find_metric(Tab::Gas, Some("nope")).id, "gasSpent");

        let avg = find_metric(Tab::Gas, Some("gasAvgPrice")).build(&data).unwrap();
        let ChartDataset::Simple(avg) = avg else {
            panic!("expected a simple series");
        };
        assert_eq!(avg.values, vec![40.0 / 12.0]);

        let per_trip = find_metric(Tab::Gas, Some("gasAvgGallons")).build(&data).unwrap();
        assert_eq!(per_trip.format(), ValueFormat::Decimal(1));

        let rotisserie = find_metric(Tab::Warehouse, Some("warehouseRotisserie"));
        assert_eq!(rotisserie.display_label(), ROTISSERIE_TOOLTIP);
        assert_eq!(rotisserie.build(&data).unwrap().labels().len(), 2);

        // the all-tab location chart reads warehouse months only
        let Some(ChartDataset::Stacked(visited)) =
            find_metric(Tab::All, Some("allWarehouses")).build(&data)
        else {
            panic!("expected a stacked series");
        };
        assert_eq!(visited.labels, vec!["Jan 2024", "Feb 2024"]);
    }

    #[test]
    fn test_empty_channel_has_no_charts() {
        let data = MonthlyData::default();
        for tab in Tab::ALL {
            for metric in chart_metrics(tab) {
                assert!(metric.build(&data).is_none(), "{}", metric.id);
            }
        }
    }
}
