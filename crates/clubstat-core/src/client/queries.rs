//! GraphQL query documents and response decoding
//!
//! Field aliases in the queries (`orderNumber: sourceOrderNumber`, ...) give
//! the payloads the same shape the models deserialize.

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::UpstreamError;
use crate::models::{OnlineOrder, OrderDetail, Receipt};
use crate::parse::lenient;

use super::transport::GraphqlRequest;

pub const RECEIPTS_QUERY: &str = r#"query receiptsWithCounts(
  $startDate: String!
  $endDate: String!
  $documentType: String!
  $documentSubType: String!
) {
  receiptsWithCounts(
    startDate: $startDate
    endDate: $endDate
    documentType: $documentType
    documentSubType: $documentSubType
  ) {
    receipts {
      warehouseName
      warehouseShortName
      warehouseCity
      warehouseNumber
      transactionDateTime
      transactionDate
      transactionBarcode
      transactionNumber
      registerNumber
      operatorNumber
      total
      subTotal
      taxes
      itemArray {
        itemNumber
        itemDescription01
        itemDescription02
        unit
        amount
        itemUnitPriceAmount
        fuelUnitQuantity
      }
      tenderArray {
        tenderDescription
        tenderTypeName
        amountTender
      }
    }
  }
}"#;

pub const ONLINE_ORDERS_QUERY: &str = r#"query getOnlineOrders(
  $startDate: String!
  $endDate: String!
  $pageNumber: Int
  $pageSize: Int
  $warehouseNumber: String!
) {
  getOnlineOrders(
    startDate: $startDate
    endDate: $endDate
    pageNumber: $pageNumber
    pageSize: $pageSize
    warehouseNumber: $warehouseNumber
  ) {
    pageNumber
    pageSize
    totalNumberOfRecords
    bcOrders {
      orderHeaderId
      orderPlacedDate: orderedDate
      orderNumber: sourceOrderNumber
      orderTotal
      warehouseNumber
      status
      orderLineItems {
        itemId
        itemNumber
        itemDescription
      }
    }
  }
}"#;

/// Upstream accepts exactly one order number per request
pub const ORDER_DETAILS_QUERY: &str = r#"query getOrderDetails($orderNumbers: [String]) {
  getOrderDetails(orderNumbers: $orderNumbers) {
    orderNumber: sourceOrderNumber
    orderPlacedDate: orderedDate
    status
    merchandiseTotal
    retailDeliveryFee
    shippingAndHandling
    grocerySurcharge
    uSTaxTotal1
    orderTotal
    orderPayment {
      paymentType
      totalCharged
      nameOnCard
      cardNumber
    }
    shipToAddress: orderShipTos {
      referenceNumber
      orderLineItems {
        orderStatus
        itemNumber
        itemId
        itemDescription: sourceItemDescription
        price: unitPrice
        quantity: orderedTotalQuantity
        merchandiseTotalAmount
        programType
        returnStatus
      }
    }
  }
}"#;

fn api_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn receipts_request(start: NaiveDate, end: NaiveDate) -> GraphqlRequest {
    GraphqlRequest {
        query: RECEIPTS_QUERY,
        variables: json!({
            "startDate": api_date(start),
            "endDate": api_date(end),
            "documentType": "all",
            "documentSubType": "all",
        }),
    }
}

pub fn online_orders_request(
    start: NaiveDate,
    end: NaiveDate,
    page_number: u32,
    page_size: u32,
    warehouse_number: &str,
) -> GraphqlRequest {
    GraphqlRequest {
        query: ONLINE_ORDERS_QUERY,
        variables: json!({
            "startDate": api_date(start),
            "endDate": api_date(end),
            "pageNumber": page_number,
            "pageSize": page_size,
            "warehouseNumber": warehouse_number,
        }),
    }
}

pub fn order_details_request(order_number: &str) -> GraphqlRequest {
    GraphqlRequest {
        query: ORDER_DETAILS_QUERY,
        variables: json!({ "orderNumbers": [order_number] }),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReceiptsData {
    #[serde(default)]
    receipts_with_counts: Option<ReceiptsWithCounts>,
}

#[derive(Debug, Default, Deserialize)]
struct ReceiptsWithCounts {
    #[serde(default, deserialize_with = "lenient::vec")]
    receipts: Vec<Receipt>,
}

/// Receipts from a `receiptsWithCounts` payload; a missing list is empty
pub fn decode_receipts(data: Value) -> Result<Vec<Receipt>, UpstreamError> {
    let decoded: ReceiptsData = serde_json::from_value(data)
        .map_err(|e| UpstreamError::Malformed(format!("receipts: {}", e)))?;
    Ok(decoded
        .receipts_with_counts
        .map(|r| r.receipts)
        .unwrap_or_default())
}

/// One page of online orders
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrdersPage {
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub total_number_of_records: Option<f64>,
    #[serde(default, deserialize_with = "lenient::vec")]
    pub bc_orders: Vec<OnlineOrder>,
}

impl OrdersPage {
    pub fn total_records(&self) -> u64 {
        self.total_number_of_records
            .filter(|n| *n > 0.0)
            .map(|n| n as u64)
            .unwrap_or(0)
    }
}

/// `getOnlineOrders` arrives either as an object or a one-element array
pub fn decode_orders_page(data: Value) -> Result<OrdersPage, UpstreamError> {
    let payload = first_or_self(data, "getOnlineOrders");
    if payload.is_null() {
        return Ok(OrdersPage::default());
    }
    serde_json::from_value(payload).map_err(|e| UpstreamError::Malformed(format!("orders: {}", e)))
}

/// The single detail in a `getOrderDetails` payload, if any
pub fn decode_order_detail(data: Value) -> Result<Option<OrderDetail>, UpstreamError> {
    let payload = first_or_self(data, "getOrderDetails");
    if payload.is_null() {
        return Ok(None);
    }
    serde_json::from_value(payload)
        .map(Some)
        .map_err(|e| UpstreamError::Malformed(format!("order details: {}", e)))
}

fn first_or_self(mut data: Value, field: &str) -> Value {
    match data.get_mut(field).map(Value::take) {
        Some(Value::Array(items)) => items.into_iter().next().unwrap_or(Value::Null),
        Some(value) => value,
        None => Value::Null,
    }
}
