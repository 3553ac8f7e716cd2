//! reqwest-backed GraphQL transport

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{Credentials, SyncConfig};
use crate::error::{Error, Result, UpstreamError};

use super::transport::{extract_data, GraphqlRequest, GraphqlTransport};

const USER_AGENT: &str = concat!("clubstat/", env!("CARGO_PKG_VERSION"));

/// Transport that POSTs to the order-history GraphQL endpoint
///
/// Every request carries the environment/service headers plus the member's
/// client id and bearer token.
#[derive(Clone)]
pub struct HttpTransport {
    http_client: Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(config: &SyncConfig, credentials: &Credentials) -> Result<Self> {
        let headers = default_headers(&config.client_identifier, credentials)?;
        let http_client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http_client,
            endpoint: config.endpoint.clone(),
        })
    }
}

fn default_headers(client_identifier: &str, credentials: &Credentials) -> Result<HeaderMap> {
    let value = |v: &str| {
        HeaderValue::from_str(v)
            .map_err(|_| Error::Config("credential contains invalid header characters".into()))
    };

    // Header names are case-insensitive; HeaderMap stores them lowercased
    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/json-patch+json"),
    );
    headers.insert("costco.env", HeaderValue::from_static("ecom"));
    headers.insert("costco.service", HeaderValue::from_static("restOrders"));
    headers.insert("costco-x-wcs-clientid", value(&credentials.client_id)?);
    headers.insert("client-identifier", value(client_identifier)?);

    let mut auth = value(&format!("Bearer {}", credentials.id_token))?;
    auth.set_sensitive(true);
    headers.insert("costco-x-authorization", auth);

    Ok(headers)
}

#[async_trait]
impl GraphqlTransport for HttpTransport {
    async fn execute(&self, request: &GraphqlRequest) -> std::result::Result<Value, UpstreamError> {
        debug!("POST {} ({})", self.endpoint, request.operation());

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport_error)?;

        if status != 200 {
            warn!(
                "{} failed with status {}: {}",
                request.operation(),
                status,
                body
            );
            return Err(UpstreamError::from_status(status, body));
        }

        let decoded: Value = serde_json::from_str(&body)
            .map_err(|e| UpstreamError::Malformed(format!("invalid JSON: {}", e)))?;
        extract_data(decoded)
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn transport_error(e: reqwest::Error) -> UpstreamError {
    if e.is_timeout() {
        UpstreamError::Transport(format!("request timed out: {}", e))
    } else {
        UpstreamError::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_headers() {
        let creds = Credentials::new("client-123", "token-abc");
        let headers = default_headers("ident", &creds).unwrap();

        assert_eq!(headers["costco.env"], "ecom");
        assert_eq!(headers["costco.service"], "restOrders");
        assert_eq!(headers["costco-x-wcs-clientid"], "client-123");
        assert_eq!(headers["client-identifier"], "ident");
        assert_eq!(headers["costco-x-authorization"], "Bearer token-abc");
        assert!(headers["costco-x-authorization"].is_sensitive());
        assert_eq!(headers[CONTENT_TYPE], "application/json-patch+json");
    }

    #[test]
    fn test_invalid_credentials_rejected() {
        let creds = Credentials::new("bad\nid", "token");
        assert!(default_headers("ident", &creds).is_err());
    }

    #[test]
    fn test_new_transport() {
        let transport =
            HttpTransport::new(&SyncConfig::default(), &Credentials::new("c", "t")).unwrap();
        assert!(transport.endpoint().ends_with("/orders/graphql"));
    }
}
