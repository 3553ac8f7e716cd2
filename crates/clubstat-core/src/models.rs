//! Raw upstream records
//!
//! These mirror the GraphQL payloads closely (camelCase on the wire) and are
//! the only things persisted. Everything derived lives in `report`.
//!
//! Upstream is loose about types: amounts arrive as numbers or strings, item
//! numbers as strings or integers, arrays as `null`. The `lenient`
//! deserializers absorb that so one odd record never fails a whole page.

use std::collections::HashMap;
use std::fmt;

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::FetchErrorKind;
use crate::parse::lenient;

/// One warehouse or gas-station transaction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub warehouse_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub warehouse_short_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub warehouse_city: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub warehouse_number: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub transaction_date_time: Option<String>,
    /// Date only (`YYYY-MM-DD`)
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub transaction_date: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub transaction_barcode: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub transaction_number: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub register_number: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub operator_number: Option<String>,
    /// Signed; negative means a return
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub total: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub sub_total: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub taxes: Option<f64>,
    #[serde(default, deserialize_with = "lenient::vec")]
    pub item_array: Vec<ReceiptItem>,
    #[serde(default, deserialize_with = "lenient::vec")]
    pub tender_array: Vec<Tender>,
}

impl Receipt {
    pub fn total_amount(&self) -> f64 {
        self.total.unwrap_or(0.0)
    }

    pub fn tax_amount(&self) -> f64 {
        self.taxes.unwrap_or(0.0)
    }

    /// Barcode, else transaction number, else empty
    pub fn key(&self) -> &str {
        first_present(&[&self.transaction_barcode, &self.transaction_number]).unwrap_or("")
    }

    /// Payment type of the first tender, if any
    pub fn payment_type(&self) -> &str {
        self.tender_array
            .first()
            .and_then(|t| first_present(&[&t.tender_type_name, &t.tender_description]))
            .unwrap_or("")
    }
}

/// A line on a warehouse receipt
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptItem {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub item_number: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub item_description01: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub item_description02: Option<String>,
    /// Quantity
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub unit: Option<f64>,
    /// Extended price
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub item_unit_price_amount: Option<f64>,
    /// Gallons on fuel lines
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub fuel_unit_quantity: Option<f64>,
}

impl ReceiptItem {
    pub fn units(&self) -> f64 {
        self.unit.unwrap_or(0.0)
    }

    pub fn amount_value(&self) -> f64 {
        self.amount.unwrap_or(0.0)
    }

    /// Trimmed item number, `None` when missing or blank
    pub fn item_number(&self) -> Option<&str> {
        first_present(&[&self.item_number])
    }

    /// Both description fields joined, trimmed
    pub fn description(&self) -> String {
        format!(
            "{} {}",
            self.item_description01.as_deref().unwrap_or(""),
            self.item_description02.as_deref().unwrap_or("")
        )
        .trim()
        .to_string()
    }
}

/// How a receipt was paid
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tender {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub tender_description: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub tender_type_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub amount_tender: Option<f64>,
}

/// Online order header from the paged orders query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineOrder {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub order_header_id: Option<String>,
    #[serde(
        default,
        alias = "orderedDate",
        alias = "orderPlaced",
        deserialize_with = "lenient::opt_string"
    )]
    pub order_placed_date: Option<String>,
    #[serde(
        default,
        alias = "sourceOrderNumber",
        deserialize_with = "lenient::opt_string"
    )]
    pub order_number: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub order_total: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub warehouse_number: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub status: Option<String>,
    #[serde(
        default,
        rename = "uSTaxTotal1",
        deserialize_with = "lenient::opt_f64"
    )]
    pub us_tax_total: Option<f64>,
    #[serde(default, deserialize_with = "lenient::vec")]
    pub order_line_items: Vec<OrderLineItem>,
}

impl OnlineOrder {
    pub fn total_amount(&self) -> f64 {
        self.order_total.unwrap_or(0.0)
    }

    /// Order number used to look up details: number, else header id
    pub fn order_key(&self) -> Option<&str> {
        first_present(&[&self.order_number, &self.order_header_id])
    }
}

/// Line summary embedded in an order header
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineItem {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub item_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub item_number: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub item_description: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub unit_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub amount: Option<f64>,
}

impl OrderLineItem {
    /// Item number, else item id
    pub fn identity(&self) -> Option<&str> {
        first_present(&[&self.item_number, &self.item_id])
    }
}

/// Fully expanded order, fetched one order per request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    #[serde(
        default,
        alias = "sourceOrderNumber",
        deserialize_with = "lenient::opt_string"
    )]
    pub order_number: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub order_header_id: Option<String>,
    #[serde(
        default,
        alias = "orderedDate",
        deserialize_with = "lenient::opt_string"
    )]
    pub order_placed_date: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub merchandise_total: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub retail_delivery_fee: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub shipping_and_handling: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub grocery_surcharge: Option<f64>,
    #[serde(
        default,
        rename = "uSTaxTotal1",
        deserialize_with = "lenient::opt_f64"
    )]
    pub us_tax_total: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub order_total: Option<f64>,
    #[serde(default, deserialize_with = "lenient::vec")]
    pub order_payment: Vec<OrderPayment>,
    #[serde(
        default,
        alias = "orderShipTos",
        deserialize_with = "lenient::vec"
    )]
    pub ship_to_address: Vec<ShipTo>,
}

impl OrderDetail {
    /// Key the detail is stored under
    pub fn key(&self) -> Option<&str> {
        first_present(&[&self.order_number, &self.order_header_id])
    }

    /// All line items across every ship-to
    pub fn line_items(&self) -> impl Iterator<Item = &DetailLineItem> {
        self.ship_to_address
            .iter()
            .flat_map(|ship| ship.order_line_items.iter())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPayment {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub payment_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub total_charged: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub name_on_card: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub card_number: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipTo {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub reference_number: Option<String>,
    #[serde(default, deserialize_with = "lenient::vec")]
    pub order_line_items: Vec<DetailLineItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailLineItem {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub order_status: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub item_number: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub item_id: Option<String>,
    #[serde(
        default,
        alias = "sourceItemDescription",
        deserialize_with = "lenient::opt_string"
    )]
    pub item_description: Option<String>,
    #[serde(default, alias = "unitPrice", deserialize_with = "lenient::opt_f64")]
    pub price: Option<f64>,
    #[serde(
        default,
        alias = "orderedTotalQuantity",
        deserialize_with = "lenient::opt_f64"
    )]
    pub quantity: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub merchandise_total_amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub program_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub return_status: Option<String>,
}

impl DetailLineItem {
    pub fn quantity_value(&self) -> f64 {
        self.quantity.unwrap_or(0.0)
    }

    pub fn price_value(&self) -> f64 {
        self.price.unwrap_or(0.0)
    }

    /// Merchandise total, else quantity × price
    pub fn line_total(&self) -> f64 {
        match self.merchandise_total_amount {
            Some(total) if total != 0.0 => total,
            _ => self.quantity_value() * self.price_value(),
        }
    }

    pub fn identity(&self) -> Option<&str> {
        first_present(&[&self.item_number, &self.item_id])
    }
}

/// A per-order detail fetch that was attempted and failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchErrorInfo {
    /// Always true; lets consumers tell error entries apart from details
    #[serde(default = "always_true")]
    pub error: bool,
    pub status_code: Option<u16>,
    pub kind: FetchErrorKind,
    pub message: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

fn always_true() -> bool {
    true
}

/// Reserved key that holds per-order failures in the serialized detail map
pub const DETAIL_ERRORS_KEY: &str = "__errors";

/// Order-number keyed details plus the orders whose fetch failed
///
/// Serialized as one flat object with failures under [`DETAIL_ERRORS_KEY`],
/// which keeps "never fetched" distinguishable from "fetch failed".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailMap {
    pub details: HashMap<String, OrderDetail>,
    pub errors: HashMap<String, FetchErrorInfo>,
}

/// What is known about one order's detail
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DetailLookup<'a> {
    Found(&'a OrderDetail),
    Failed(&'a FetchErrorInfo),
    NotFetched,
}

impl DetailMap {
    pub fn get(&self, order_number: &str) -> Option<&OrderDetail> {
        self.details.get(order_number)
    }

    pub fn lookup(&self, order_number: &str) -> DetailLookup<'_> {
        if let Some(detail) = self.details.get(order_number) {
            DetailLookup::Found(detail)
        } else if let Some(err) = self.errors.get(order_number) {
            DetailLookup::Failed(err)
        } else {
            DetailLookup::NotFetched
        }
    }

    pub fn len(&self) -> usize {
        self.details.len()
    }

    pub fn is_empty(&self) -> bool {
        self.details.is_empty()
    }
}

impl Serialize for DetailMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.details.len() + 1))?;
        for (key, detail) in &self.details {
            map.serialize_entry(key, detail)?;
        }
        map.serialize_entry(DETAIL_ERRORS_KEY, &self.errors)?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for DetailMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DetailMapVisitor;

        impl<'de> Visitor<'de> for DetailMapVisitor {
            type Value = DetailMap;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an order-number keyed map of order details")
            }

            fn visit_unit<E: de::Error>(self) -> Result<DetailMap, E> {
                Ok(DetailMap::default())
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<DetailMap, A::Error> {
                let mut out = DetailMap::default();
                while let Some(key) = access.next_key::<String>()? {
                    let value: serde_json::Value = access.next_value()?;
                    if key == DETAIL_ERRORS_KEY {
                        match serde_json::from_value(value) {
                            Ok(errors) => out.errors = errors,
                            Err(e) => warn!("Dropping unreadable detail error map: {}", e),
                        }
                        continue;
                    }
                    match serde_json::from_value::<OrderDetail>(value) {
                        Ok(detail) => {
                            out.details.insert(key, detail);
                        }
                        Err(e) => warn!("Dropping unreadable order detail {}: {}", key, e),
                    }
                }
                Ok(out)
            }
        }

        deserializer.deserialize_any(DetailMapVisitor)
    }
}

/// Everything one sync produces; the unit of persistence
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default, deserialize_with = "lenient::vec")]
    pub receipts: Vec<Receipt>,
    /// Receipts keyed by barcode (or transaction number)
    #[serde(default)]
    pub warehouse_details: HashMap<String, Receipt>,
    #[serde(default, deserialize_with = "lenient::vec")]
    pub online_orders: Vec<OnlineOrder>,
    #[serde(default)]
    pub order_details: DetailMap,
    /// Milliseconds since the Unix epoch
    #[serde(default)]
    pub updated_at: Option<i64>,
}

/// First field that is present and not blank, trimmed
fn first_present<'a>(fields: &[&'a Option<String>]) -> Option<&'a str> {
    fields
        .iter()
        .filter_map(|f| f.as_deref())
        .map(str::trim)
        .find(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_receipt_accepts_loose_types() {
        let receipt: Receipt = serde_json::from_value(json!({
            "warehouseName": "SEATTLE",
            "warehouseNumber": 1,
            "transactionDate": "2024-01-15",
            "total": "45.67",
            "taxes": 3.2,
            "itemArray": [
                {"itemNumber": 12345, "itemDescription01": "PAPER TOWELS", "unit": 2, "amount": 45.67}
            ],
            "tenderArray": null
        }))
        .unwrap();

        assert_eq!(receipt.warehouse_number.as_deref(), Some("1"));
        assert_eq!(receipt.total, Some(45.67));
        assert_eq!(receipt.item_array[0].item_number(), Some("12345"));
        assert!(receipt.tender_array.is_empty());
    }

    #[test]
    fn test_receipt_key_prefers_barcode() {
        let receipt = Receipt {
            transaction_barcode: Some(" ".into()),
            transaction_number: Some("T-9".into()),
            ..Default::default()
        };
        assert_eq!(receipt.key(), "T-9");
        assert_eq!(Receipt::default().key(), "");
    }

    #[test]
    fn test_online_order_aliases() {
        let order: OnlineOrder = serde_json::from_value(json!({
            "orderHeaderId": "H1",
            "orderedDate": "2024-02-01T10:00:00",
            "sourceOrderNumber": "1001",
            "orderTotal": 20.5,
            "uSTaxTotal1": 1.5
        }))
        .unwrap();
        assert_eq!(order.order_key(), Some("1001"));
        assert_eq!(order.order_placed_date.as_deref(), Some("2024-02-01T10:00:00"));
        assert_eq!(order.us_tax_total, Some(1.5));
    }

    #[test]
    fn test_detail_line_total_falls_back_to_qty_times_price() {
        let line = DetailLineItem {
            quantity: Some(3.0),
            price: Some(2.5),
            ..Default::default()
        };
        assert_eq!(line.line_total(), 7.5);

        let line = DetailLineItem {
            quantity: Some(3.0),
            price: Some(2.5),
            merchandise_total_amount: Some(6.0),
            ..Default::default()
        };
        assert_eq!(line.line_total(), 6.0);
    }

    #[test]
    fn test_detail_map_keeps_errors_separate() {
        let mut map = DetailMap::default();
        map.details.insert(
            "1001".into(),
            OrderDetail {
                order_number: Some("1001".into()),
                ..Default::default()
            },
        );
        map.errors.insert(
            "1002".into(),
            FetchErrorInfo {
                error: true,
                status_code: Some(400),
                kind: FetchErrorKind::Rejected,
                message: "bad".into(),
                timestamp: 0,
            },
        );

        let value = serde_json::to_value(&map).unwrap();
        assert!(value.get(DETAIL_ERRORS_KEY).is_some());
        assert!(value.get("1001").is_some());

        let back: DetailMap = serde_json::from_value(value).unwrap();
        assert_eq!(back, map);
        assert!(matches!(back.lookup("1001"), DetailLookup::Found(_)));
        assert!(matches!(back.lookup("1002"), DetailLookup::Failed(_)));
        assert_eq!(back.lookup("9999"), DetailLookup::NotFetched);
    }

    #[test]
    fn test_detail_map_ship_to_alias() {
        let detail: OrderDetail = serde_json::from_value(json!({
            "sourceOrderNumber": "77",
            "orderShipTos": [
                {"orderLineItems": [
                    {"itemNumber": "5", "sourceItemDescription": "TV", "unitPrice": 300, "orderedTotalQuantity": 1}
                ]}
            ]
        }))
        .unwrap();
        let lines: Vec<_> = detail.line_items().collect();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].item_description.as_deref(), Some("TV"));
        assert_eq!(lines[0].line_total(), 300.0);
    }
}
