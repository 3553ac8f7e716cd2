//! Per-tab summary cards and cross-channel highlights

use serde::Serialize;

use crate::format::{format_gallons, format_money, format_number, format_return_amount};

use super::monthly::{MonthlyData, ROTISSERIE_LABEL, ROTISSERIE_TOOLTIP};
use super::online::{OnlineReport, OnlineRow};
use super::receipts::{GasTrip, ReceiptReport, WarehouseVisit};
use super::{merge_location_counts, ranked_locations, DateBounds, LocationCounts, Tab};

/// Locations listed under the cards
const TOP_LOCATIONS: usize = 6;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryCard {
    pub label: String,
    pub value: String,
    pub sub: Option<String>,
    /// Rendered as a deduction
    pub negative: bool,
    pub tooltip: Option<String>,
}

impl SummaryCard {
    fn new(label: &str, value: String) -> Self {
        Self {
            label: label.to_string(),
            value,
            sub: None,
            negative: false,
            tooltip: None,
        }
    }

    fn sub(mut self, sub: String) -> Self {
        self.sub = Some(sub);
        self
    }

    fn negative(mut self) -> Self {
        self.negative = true;
        self
    }
}

/// Cards, busiest locations and coverage line for one tab
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TabSummary {
    pub tab: Tab,
    pub cards: Vec<SummaryCard>,
    /// Busiest first; empty on the online tab
    pub locations: Vec<(String, u32)>,
    pub coverage: String,
}

/// Visits per location, returns included; blank locations count as "Unknown"
pub fn visit_locations(visits: &[WarehouseVisit]) -> LocationCounts {
    let mut counts = LocationCounts::new();
    for visit in visits {
        let location = match visit.location.trim() {
            "" => "Unknown",
            name => name,
        };
        super::bump(&mut counts, location);
    }
    counts
}

fn coverage(bounds: &DateBounds) -> String {
    let text = bounds.text();
    match (text.start, text.end) {
        (Some(start), Some(end)) => format!("Showing data from {} → {}", start, end),
        _ => "Date coverage unavailable.".to_string(),
    }
}

fn rotisserie_card(receipts: &ReceiptReport) -> SummaryCard {
    let mut card = SummaryCard::new(ROTISSERIE_LABEL, format_money(receipts.summary.rotisserie_spent))
        .sub(format!("{} purchased", format_number(receipts.summary.rotisserie_count)));
    card.tooltip = Some(ROTISSERIE_TOOLTIP.to_string());
    card
}

fn returns_card(amount: f64, count: u32) -> SummaryCard {
    SummaryCard::new("Returns", format_return_amount(amount))
        .sub(format!("{} returns", format_number(count as f64)))
        .negative()
}

impl TabSummary {
    /// Spending figures are net of returns; the gas tab has none
    pub fn build(tab: Tab, receipts: &ReceiptReport, online: &OnlineReport) -> Self {
        let summary = &receipts.summary;
        let gas = &receipts.gas;
        let net_warehouse = summary.total_spent - summary.return_amount;
        let net_online = online.net_spent();
        let warehouse_locations = visit_locations(&receipts.visits);

        match tab {
            Tab::Warehouse => Self {
                tab,
                cards: vec![
                    SummaryCard::new("Trips", format_number(summary.shopping_receipts as f64)),
                    SummaryCard::new("Total Spent (incl. tax)", format_money(net_warehouse))
                        .sub(format!("Tax: {}", format_money(summary.total_tax))),
                    SummaryCard::new("Items", format_number(summary.total_units))
                        .sub(format!("{} unique", format_number(summary.unique_items as f64))),
                    SummaryCard::new("Avg Item Price", format_money(summary.avg_item_price)),
                    SummaryCard::new("Avg Per Receipt", format_money(summary.avg_per_receipt)),
                    returns_card(summary.return_amount, summary.return_count),
                    rotisserie_card(receipts),
                ],
                locations: top_locations(&warehouse_locations),
                coverage: coverage(&receipts.date_range),
            },
            Tab::Online => {
                let per = |n: f64| if n > 0.0 { net_online / n } else { 0.0 };
                Self {
                    tab,
                    cards: vec![
                        SummaryCard::new("Orders", format_number(online.total_orders as f64)),
                        SummaryCard::new("Total Spent (incl. tax)", format_money(net_online))
                            .sub(format!("Tax: {}", format_money(online.total_tax))),
                        SummaryCard::new("Items", format_number(online.total_items as f64))
                            .sub(format!("{} unique", format_number(online.unique_items as f64))),
                        SummaryCard::new("Avg Item Price", format_money(per(online.total_items as f64))),
                        SummaryCard::new("Avg Per Receipt", format_money(per(online.total_orders as f64))),
                        returns_card(online.return_amount, online.return_count),
                    ],
                    locations: Vec::new(),
                    coverage: coverage(&online.date_range),
                }
            }
            Tab::Gas => Self {
                tab,
                cards: vec![
                    SummaryCard::new("Fill-ups", format_number(gas.total_trips as f64)),
                    SummaryCard::new("Total Gallons", format_gallons(gas.total_gallons)),
                    SummaryCard::new("Total Cost", format_money(gas.total_cost)),
                    SummaryCard::new("Avg Price / Gallon", format_money(gas.average_price_per_gallon())),
                ],
                locations: top_locations(&gas.location_counts),
                coverage: coverage(&gas.date_range),
            },
            Tab::All => {
                let trips = summary.shopping_receipts + gas.total_trips + online.total_orders;
                let spent = net_warehouse + gas.total_cost + net_online;
                let avg = if trips > 0 { spent / trips as f64 } else { 0.0 };
                let locations =
                    merge_location_counts([&warehouse_locations, &online.location_counts, &gas.location_counts]);
                Self {
                    tab,
                    cards: vec![
                        SummaryCard::new("Trips", format_number(trips as f64)),
                        SummaryCard::new("Total Spent (incl. tax)", format_money(spent))
                            .sub(format!("Tax: {}", format_money(summary.total_tax + online.total_tax))),
                        SummaryCard::new("Average per Trip", format_money(avg)),
                        returns_card(
                            summary.return_amount + online.return_amount,
                            summary.return_count + online.return_count,
                        ),
                        rotisserie_card(receipts),
                    ],
                    locations: top_locations(&locations),
                    coverage: coverage(
                        &receipts
                            .date_range
                            .merge(&online.date_range)
                            .merge(&gas.date_range),
                    ),
                }
            }
        }
    }

    pub fn card(&self, label: &str) -> Option<&SummaryCard> {
        self.cards.iter().find(|c| c.label == label)
    }
}

fn top_locations(counts: &LocationCounts) -> Vec<(String, u32)> {
    let mut ranked = ranked_locations(counts);
    ranked.truncate(TOP_LOCATIONS);
    ranked
}

/// Largest single purchase across channels
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TripHighlight {
    pub label: String,
    pub total: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Highlights {
    pub biggest_trip: TripHighlight,
    pub biggest_month: Option<TripHighlight>,
    pub top_warehouse: Option<(String, u32)>,
}

impl Highlights {
    pub fn build(receipts: &ReceiptReport, online: &OnlineReport, monthly: &MonthlyData) -> Self {
        Self {
            biggest_trip: biggest_trip(&receipts.visits, &online.rows, &receipts.gas.trips),
            biggest_month: biggest_month(monthly),
            top_warehouse: top_warehouse_location(&receipts.visits),
        }
    }
}

/// `{label: "None", total: 0}` when nothing positive was bought
pub fn biggest_trip(visits: &[WarehouseVisit], rows: &[OnlineRow], trips: &[GasTrip]) -> TripHighlight {
    let candidates = visits
        .iter()
        .map(|v| (v.location.as_str(), v.total, "Warehouse"))
        .chain(rows.iter().map(|r| (r.location.as_str(), r.total, "Online")))
        .chain(trips.iter().map(|t| (t.location.as_str(), t.total_price, "Gas")));

    let mut best = TripHighlight {
        label: "None".to_string(),
        total: 0.0,
    };
    for (location, total, fallback) in candidates {
        if total > best.total {
            let label = if location.is_empty() { fallback } else { location };
            best = TripHighlight {
                label: label.to_string(),
                total,
            };
        }
    }
    best
}

/// Month of the combined series with the highest spend, if any spend at all
pub fn biggest_month(monthly: &MonthlyData) -> Option<TripHighlight> {
    let mut best: Option<&super::MonthlyEntry> = None;
    for entry in &monthly.all {
        if best.map_or(true, |b| entry.spent > b.spent) {
            best = Some(entry);
        }
    }
    best.filter(|e| e.spent != 0.0).map(|e| TripHighlight {
        label: e.label.clone(),
        total: e.spent,
    })
}

pub fn top_warehouse_location(visits: &[WarehouseVisit]) -> Option<(String, u32)> {
    ranked_locations(&visit_locations(visits)).into_iter().next()
}
