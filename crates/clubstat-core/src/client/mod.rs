//! Order-history API client
//!
//! # Architecture
//!
//! - `GraphqlTransport` trait: executes one GraphQL request, returns `data`
//! - `HttpTransport`: reqwest implementation with the upstream's headers
//! - `MockTransport`: scripted responses for tests (`test-utils` feature)
//! - `Fetcher`: paging, dedup, batched detail download and full sync
//! - `with_retry`: backoff policy shared by anything that talks upstream
//!
//! # Usage
//!
//! ```rust,ignore
//! let config = SyncConfig::load(None)?;
//! let transport = HttpTransport::new(&config, &Credentials::from_env()?)?;
//! let fetcher = Fetcher::new(Arc::new(transport), config);
//! let outcome = fetcher.sync(SyncWindow::ending(today, 2), None).await?;
//! ```

mod fetcher;
mod http;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod queries;
mod retry;
mod transport;

pub use fetcher::{
    build_warehouse_details, detail_error, order_numbers, Fetcher, OrderDedup, ProgressSender,
    SyncOutcome, SyncProgress, SyncStage, SyncWindow,
};
pub use http::HttpTransport;
#[cfg(any(test, feature = "test-utils"))]
pub use mock::MockTransport;
pub use retry::{with_retry, RetryPolicy};
pub use transport::{GraphqlRequest, GraphqlTransport};
