use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::UpstreamError;

/// One GraphQL POST body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphqlRequest {
    pub query: &'static str,
    pub variables: Value,
}

impl GraphqlRequest {
    /// Operation name, taken from the query text (`query <name>(`)
    pub fn operation(&self) -> &str {
        self.query
            .trim_start()
            .strip_prefix("query")
            .map(str::trim_start)
            .and_then(|rest| rest.split(|c: char| c == '(' || c.is_whitespace()).next())
            .unwrap_or("")
    }
}

/// Something that can execute a GraphQL request against the order API
///
/// Implementations return the `data` envelope of a 200 response and map
/// everything else onto [`UpstreamError`].
#[async_trait]
pub trait GraphqlTransport: Send + Sync {
    async fn execute(&self, request: &GraphqlRequest) -> Result<Value, UpstreamError>;

    /// Where requests go, for logs
    fn endpoint(&self) -> &str;
}

/// Pull `data` out of a decoded response body
pub(crate) fn extract_data(body: Value) -> Result<Value, UpstreamError> {
    match body {
        Value::Object(mut map) => match map.remove("data") {
            Some(data) if !data.is_null() => Ok(data),
            _ => Err(UpstreamError::Malformed(format!(
                "response without data: {}",
                Value::Object(map)
            ))),
        },
        other => Err(UpstreamError::Malformed(format!(
            "response without data: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_operation_name() {
        let request = GraphqlRequest {
            query: " query getOnlineOrders($startDate:String!) { x }",
            variables: Value::Null,
        };
        assert_eq!(request.operation(), "getOnlineOrders");
    }

    #[test]
    fn test_extract_data() {
        assert_eq!(
            extract_data(json!({"data": {"a": 1}})).unwrap(),
            json!({"a": 1})
        );
        assert!(matches!(
            extract_data(json!({"errors": []})),
            Err(UpstreamError::Malformed(_))
        ));
        assert!(extract_data(json!({"data": null})).is_err());
        assert!(extract_data(Value::Null).is_err());
    }
}
