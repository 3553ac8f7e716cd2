//! Item statistics across channels and the leaderboards built from them

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::classify::is_excluded_from_price_trends;
use crate::models::{DetailMap, OnlineOrder, OrderDetail};
use crate::parse::order_date;

use super::receipts::{ItemStat, ItemStats, PriceSample};
use super::Tab;

/// Rows per leaderboard
pub const LEADERBOARD_SIZE: usize = 10;

/// Smallest increase worth reporting
const MIN_PRICE_INCREASE: f64 = 0.01;
/// Smallest span, in months, over which an increase is reported
const MIN_INCREASE_MONTHS: f64 = 0.01;
const DAYS_PER_MONTH: f64 = 30.4375;

/// Line flattened from either an order detail or an order header
struct OnlineLine {
    item_number: Option<String>,
    description: Option<String>,
    quantity: f64,
    price: f64,
    total: f64,
}

fn detail_lines(detail: &OrderDetail) -> Vec<OnlineLine> {
    detail
        .line_items()
        .map(|line| {
            let item_number = line.identity().map(str::to_string);
            let description = line
                .item_description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string)
                .or_else(|| Some(format!("Item #{}", item_number.as_deref().unwrap_or(""))));
            OnlineLine {
                item_number,
                description,
                quantity: line.quantity_value(),
                price: line.price_value(),
                total: line.line_total(),
            }
        })
        .collect()
}

fn summary_lines(order: &OnlineOrder, order_key: &str) -> Vec<OnlineLine> {
    order
        .order_line_items
        .iter()
        .map(|line| {
            let amount = line.amount.unwrap_or(0.0);
            let price = match line.unit_price {
                Some(p) if p != 0.0 => p,
                _ => amount,
            };
            OnlineLine {
                item_number: Some(line.identity().unwrap_or(order_key).to_string()),
                description: Some(
                    line.item_description
                        .as_deref()
                        .map(str::trim)
                        .filter(|d| !d.is_empty())
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("Order {}", order_key)),
                ),
                quantity: 1.0,
                price,
                total: amount,
            }
        })
        .collect()
}

/// Item statistics synthesized from non-return online orders
///
/// Detail line items are used when the order's detail was fetched, otherwise
/// the summary lines embedded in the order header with a quantity of one.
/// Keys end in `|online` so they never collide with warehouse keys.
pub fn build_online_item_stats(orders: &[OnlineOrder], details: &DetailMap) -> ItemStats {
    let mut stats = ItemStats::new();

    for order in orders.iter().filter(|o| o.total_amount() >= 0.0) {
        let order_key = order.order_key().unwrap_or("");
        let lines = match details.get(order_key).filter(|_| !order_key.is_empty()) {
            Some(detail) => detail_lines(detail),
            None => summary_lines(order, order_key),
        };
        let date = order_date(order);

        for line in lines {
            let quantity = if line.quantity != 0.0 { line.quantity } else { 1.0 };
            let total = if line.total != 0.0 {
                line.total
            } else {
                line.price * quantity
            };

            let identity = line
                .item_number
                .clone()
                .filter(|n| !n.is_empty())
                .or_else(|| line.description.clone())
                .unwrap_or_else(|| order_key.to_string());
            let name = format!(
                "{} (Online)",
                line.description.as_deref().unwrap_or("Online Item")
            );

            stats
                .entry(format!("{}|online", identity))
                .or_insert_with(|| ItemStat::new(identity.clone(), name))
                .record(
                    total,
                    quantity,
                    PriceSample {
                        date,
                        price: total / quantity,
                    },
                );
        }
    }

    stats
}

/// Sum two stat maps key by key, concatenating price samples
pub fn merge_item_stats(warehouse: &ItemStats, online: &ItemStats) -> ItemStats {
    let mut merged = warehouse.clone();
    for (key, stat) in online {
        match merged.get_mut(key) {
            Some(existing) => {
                existing.total_spent += stat.total_spent;
                existing.total_units += stat.total_units;
                existing.purchases += stat.purchases;
                existing.prices.extend(stat.prices.iter().copied());
            }
            None => {
                merged.insert(key.clone(), stat.clone());
            }
        }
    }
    merged
}

/// Item statistics shown on a tab
///
/// The gas tab has no items; it shows the combined set like the all tab.
pub fn item_stats_for_tab(
    tab: Tab,
    warehouse: &ItemStats,
    orders: &[OnlineOrder],
    details: &DetailMap,
) -> ItemStats {
    match tab {
        Tab::Warehouse => warehouse.clone(),
        Tab::Online => build_online_item_stats(orders, details),
        Tab::All | Tab::Gas => merge_item_stats(warehouse, &build_online_item_stats(orders, details)),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpentRow {
    pub item_number: String,
    pub name: String,
    pub total_spent: f64,
    pub purchases: f64,
    pub average_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurchasedRow {
    pub item_number: String,
    pub name: String,
    pub purchases: f64,
    pub average_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    /// Percent change from min to max, 0 when min is not positive
    pub increase_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpensiveRow {
    pub item_number: String,
    pub name: String,
    pub average_price: f64,
    pub max_price: f64,
    pub purchases: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceIncreaseRow {
    pub item_number: String,
    pub name: String,
    pub min_price: f64,
    pub max_price: f64,
    pub min_date: NaiveDateTime,
    pub max_date: NaiveDateTime,
    pub increase: f64,
    pub months: f64,
    pub rate_per_month: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Leaderboards {
    pub most_spent: Vec<SpentRow>,
    pub most_purchased: Vec<PurchasedRow>,
    pub most_expensive: Vec<ExpensiveRow>,
    pub price_increases: Vec<PriceIncreaseRow>,
}

impl Leaderboards {
    pub fn build(stats: &ItemStats, limit: usize) -> Self {
        Self {
            most_spent: most_total_spent(stats, limit),
            most_purchased: most_purchased(stats, limit),
            most_expensive: most_expensive(stats, limit),
            price_increases: biggest_price_increases(stats, limit),
        }
    }
}

/// Sort descending by `key`; the sort is stable so equal keys keep map order
fn top_by<'a>(
    stats: impl Iterator<Item = &'a ItemStat>,
    key: impl Fn(&ItemStat) -> f64,
    limit: usize,
) -> Vec<&'a ItemStat> {
    let mut rows: Vec<&ItemStat> = stats.collect();
    rows.sort_by(|a, b| key(*b).total_cmp(&key(*a)));
    rows.truncate(limit);
    rows
}

pub fn most_total_spent(stats: &ItemStats, limit: usize) -> Vec<SpentRow> {
    top_by(stats.values(), |s| s.total_spent, limit)
        .into_iter()
        .map(|s| SpentRow {
            item_number: s.item_number.clone(),
            name: s.name.clone(),
            total_spent: s.total_spent,
            purchases: s.purchases,
            average_price: s.average_price(),
        })
        .collect()
}

pub fn most_purchased(stats: &ItemStats, limit: usize) -> Vec<PurchasedRow> {
    top_by(stats.values(), |s| s.purchases, limit)
        .into_iter()
        .map(|s| {
            let (min_price, max_price) = price_range(&s.prices);
            let increase_pct = if min_price > 0.0 {
                (max_price - min_price) / min_price * 100.0
            } else {
                0.0
            };
            PurchasedRow {
                item_number: s.item_number.clone(),
                name: s.name.clone(),
                purchases: s.purchases,
                average_price: s.average_price(),
                min_price,
                max_price,
                increase_pct,
            }
        })
        .collect()
}

/// Highest average price among items bought at least three times
pub fn most_expensive(stats: &ItemStats, limit: usize) -> Vec<ExpensiveRow> {
    top_by(
        stats.values().filter(|s| s.purchases >= 3.0),
        ItemStat::average_price,
        limit,
    )
    .into_iter()
    .map(|s| ExpensiveRow {
        item_number: s.item_number.clone(),
        name: s.name.clone(),
        average_price: s.average_price(),
        max_price: s.prices.iter().fold(0.0, |m, p| f64::max(m, p.price)),
        purchases: s.purchases,
    })
    .collect()
}

/// Items whose unit price rose the most between its cheapest and dearest sample
pub fn biggest_price_increases(stats: &ItemStats, limit: usize) -> Vec<PriceIncreaseRow> {
    let mut rows: Vec<PriceIncreaseRow> = stats.values().filter_map(price_increase).collect();
    rows.sort_by(|a, b| b.increase.total_cmp(&a.increase));
    rows.truncate(limit);
    rows
}

fn price_increase(stat: &ItemStat) -> Option<PriceIncreaseRow> {
    if stat.prices.len() < 2 || is_excluded_from_price_trends(&stat.item_number) {
        return None;
    }

    // Only a strictly better price moves min/max, so ties keep the first date
    let first = stat.prices[0];
    let (mut min, mut max) = (first, first);
    for sample in &stat.prices[1..] {
        if sample.price < min.price {
            min = *sample;
        }
        if sample.price > max.price {
            max = *sample;
        }
    }

    let increase = max.price - min.price;
    let (min_date, max_date) = (min.date?, max.date?);
    if increase <= MIN_PRICE_INCREASE {
        return None;
    }
    let months = months_between(&min_date, &max_date);
    if months < MIN_INCREASE_MONTHS {
        return None;
    }

    Some(PriceIncreaseRow {
        item_number: stat.item_number.clone(),
        name: stat.name.clone(),
        min_price: min.price,
        max_price: max.price,
        min_date,
        max_date,
        increase,
        months,
        rate_per_month: increase / months,
    })
}

/// Absolute distance in average-length months
pub fn months_between(a: &NaiveDateTime, b: &NaiveDateTime) -> f64 {
    let millis = (*b - *a).num_milliseconds().abs() as f64;
    millis / (DAYS_PER_MONTH * 24.0 * 60.0 * 60.0 * 1000.0)
}

fn price_range(prices: &[PriceSample]) -> (f64, f64) {
    if prices.is_empty() {
        return (0.0, 0.0);
    }
    prices.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
        (lo.min(p.price), hi.max(p.price))
    })
}
