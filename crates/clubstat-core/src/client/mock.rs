//! Scripted transport for testing
//!
//! Responses are queued per route. A route is the operation name plus the
//! variables that distinguish calls: `getOnlineOrders:<warehouse>:<page>`,
//! `getOrderDetails:<orderNumber>`, or just `receiptsWithCounts`. The last
//! queued response for a route repeats once the queue is drained.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::UpstreamError;

use super::transport::{GraphqlRequest, GraphqlTransport};

type Response = Result<Value, UpstreamError>;

#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<String, VecDeque<Response>>>,
    calls: Mutex<Vec<String>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for a route
    pub fn respond(self, route: impl Into<String>, response: Response) -> Self {
        if let Ok(mut routes) = self.routes.lock() {
            routes.entry(route.into()).or_default().push_back(response);
        }
        self
    }

    /// Queue a receipts payload built from raw receipt objects
    pub fn with_receipts(self, receipts: Vec<Value>) -> Self {
        self.respond(
            receipts_route(),
            Ok(json!({ "receiptsWithCounts": { "receipts": receipts } })),
        )
    }

    /// Queue one page of online orders
    pub fn with_orders_page(
        self,
        warehouse: &str,
        page: u32,
        total_records: u64,
        orders: Vec<Value>,
    ) -> Self {
        self.respond(
            orders_route(warehouse, page),
            Ok(json!({
                "getOnlineOrders": [{
                    "pageNumber": page,
                    "totalNumberOfRecords": total_records,
                    "bcOrders": orders,
                }]
            })),
        )
    }

    /// Queue an order detail object
    pub fn with_detail(self, order_number: &str, detail: Value) -> Self {
        self.respond(
            detail_route(order_number),
            Ok(json!({ "getOrderDetails": [detail] })),
        )
    }

    /// Routes called so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self, route: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == route).count()
    }
}

pub fn receipts_route() -> String {
    "receiptsWithCounts".to_string()
}

pub fn orders_route(warehouse: &str, page: u32) -> String {
    format!("getOnlineOrders:{}:{}", warehouse, page)
}

pub fn detail_route(order_number: &str) -> String {
    format!("getOrderDetails:{}", order_number)
}

fn route_of(request: &GraphqlRequest) -> String {
    let vars = &request.variables;
    match request.operation() {
        "getOnlineOrders" => orders_route(
            vars["warehouseNumber"].as_str().unwrap_or(""),
            vars["pageNumber"].as_u64().unwrap_or(0) as u32,
        ),
        "getOrderDetails" => detail_route(vars["orderNumbers"][0].as_str().unwrap_or("")),
        other => other.to_string(),
    }
}

#[async_trait]
impl GraphqlTransport for MockTransport {
    async fn execute(&self, request: &GraphqlRequest) -> Response {
        let route = route_of(request);
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(route.clone());
        }

        let mut routes = self
            .routes
            .lock()
            .map_err(|_| UpstreamError::Transport("mock poisoned".into()))?;
        match routes.get_mut(&route) {
            Some(queue) if queue.len() > 1 => queue
                .pop_front()
                .unwrap_or_else(|| Err(UpstreamError::from_status(404, "empty"))),
            Some(queue) => queue
                .front()
                .cloned()
                .unwrap_or_else(|| Err(UpstreamError::from_status(404, "empty"))),
            None => Err(UpstreamError::from_status(
                404,
                format!("no mock response for {}", route),
            )),
        }
    }

    fn endpoint(&self) -> &str {
        "mock://graphql"
    }
}
