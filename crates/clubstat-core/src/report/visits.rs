//! Every trip across channels in one list, newest first

use chrono::NaiveDateTime;
use serde::Serialize;

use super::online::OnlineRow;
use super::receipts::{GasTrip, WarehouseVisit};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Warehouse,
    Online,
    Gas,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Warehouse => "Warehouse",
            Self::Online => "Online",
            Self::Gas => "Gas",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisitEntry {
    pub date: Option<NaiveDateTime>,
    pub channel: Channel,
    pub location: String,
    pub items: Option<f64>,
    pub gallons: Option<f64>,
    pub tax: Option<f64>,
    pub price_per_gallon: Option<f64>,
    pub total: f64,
    /// Set on online rows; drill-down key for order details
    pub order_number: Option<String>,
    /// Set on warehouse rows
    pub barcode: Option<String>,
}

/// Merge warehouse visits, online orders and gas trips
///
/// Sorted by date descending; undated entries go last and otherwise keep
/// their input order.
pub fn all_visits(visits: &[WarehouseVisit], orders: &[OnlineRow], trips: &[GasTrip]) -> Vec<VisitEntry> {
    let mut entries: Vec<VisitEntry> = Vec::with_capacity(visits.len() + orders.len() + trips.len());

    entries.extend(visits.iter().map(|visit| VisitEntry {
        date: visit.date,
        channel: Channel::Warehouse,
        location: visit.location.clone(),
        items: Some(visit.items),
        gallons: None,
        tax: Some(visit.tax),
        price_per_gallon: None,
        total: visit.total,
        order_number: None,
        barcode: Some(visit.barcode.clone()).filter(|b| !b.is_empty()),
    }));

    entries.extend(orders.iter().map(|order| VisitEntry {
        date: order.date,
        channel: Channel::Online,
        location: if order.location.is_empty() {
            format!("Order #{}", order.order_number)
        } else {
            order.location.clone()
        },
        items: Some(order.items as f64),
        gallons: None,
        tax: Some(order.tax),
        price_per_gallon: None,
        total: order.total,
        order_number: Some(order.order_number.clone()).filter(|n| !n.is_empty()),
        barcode: None,
    }));

    entries.extend(trips.iter().map(|trip| VisitEntry {
        date: trip.date,
        channel: Channel::Gas,
        location: if trip.location.is_empty() {
            "Gas Station".to_string()
        } else {
            trip.location.clone()
        },
        items: None,
        gallons: Some(trip.gallons),
        tax: None,
        price_per_gallon: Some(trip.price_per_gallon),
        total: trip.total_price,
        order_number: None,
        barcode: None,
    }));

    // None sorts below Some, so undated rows end up last
    entries.sort_by(|a, b| b.date.cmp(&a.date));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(d: u32) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(2024, 3, d)
            .and_then(|date| date.and_hms_opt(10, 0, 0))
    }

    fn visit(date: Option<NaiveDateTime>, total: f64) -> WarehouseVisit {
        WarehouseVisit {
            date,
            location: "SEATTLE".to_string(),
            total,
            barcode: format!("bc{}", total),
            is_return: total < 0.0,
            items: 2.0,
            tax: 1.0,
        }
    }

    #[test]
    fn test_all_visits_sorted_newest_first() {
        let visits = vec![visit(at(1), 50.0), visit(None, 10.0), visit(at(20), -5.0)];
        let orders = vec![OnlineRow {
            date: at(10),
            order_number: "900".to_string(),
            status: "Delivered".to_string(),
            total: 80.0,
            location: String::new(),
            is_return: false,
            items: 3,
            tax: 4.0,
        }];
        let trips = vec![GasTrip {
            date: at(15),
            location: String::new(),
            gallons: 10.0,
            total_price: 35.0,
            price_per_gallon: 3.5,
            transaction_number: "77".to_string(),
        }];

        let entries = all_visits(&visits, &orders, &trips);
        let channels: Vec<Channel> = entries.iter().map(|e| e.channel).collect();
        assert_eq!(
            channels,
            vec![Channel::Warehouse, Channel::Gas, Channel::Online, Channel::Warehouse, Channel::Warehouse]
        );
        assert_eq!(entries[0].total, -5.0);
        assert_eq!(entries[1].location, "Gas Station");
        assert_eq!(entries[2].location, "Order #900");
        assert_eq!(entries[2].order_number.as_deref(), Some("900"));
        assert_eq!(entries[4].date, None);
        assert_eq!(entries[4].barcode.as_deref(), Some("bc10"));
    }

    #[test]
    fn test_all_visits_empty() {
        assert!(all_visits(&[], &[], &[]).is_empty());
    }
}
