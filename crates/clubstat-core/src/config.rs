//! Sync configuration
//!
//! ## Configuration Resolution
//!
//! Config is loaded with a two-layer resolution:
//! 1. An explicit path, else the override in the data dir
//!    (~/.local/share/clubstat/config/clubstat.toml)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Credentials are deliberately absent from the file and come from the
//! environment (`CLUBSTAT_CLIENT_ID`, `CLUBSTAT_ID_TOKEN`).

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::client::RetryPolicy;
use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/clubstat.toml");

pub const CLIENT_ID_ENV: &str = "CLUBSTAT_CLIENT_ID";
pub const ID_TOKEN_ENV: &str = "CLUBSTAT_ID_TOKEN";

/// Membership region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Region {
    #[default]
    Us,
    Ca,
}

impl Region {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Us => "US",
            Self::Ca => "CA",
        }
    }

    /// Page where members sign in and see their orders
    pub fn order_status_url(&self) -> &'static str {
        match self {
            Self::Us => "https://www.costco.com/OrderStatusCmd",
            Self::Ca => "https://www.costco.ca/OrderStatusCmd",
        }
    }
}

impl std::str::FromStr for Region {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "US" => Ok(Self::Us),
            "CA" => Ok(Self::Ca),
            other => Err(Error::Config(format!("Unknown region: {}", other))),
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the active configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Embedded,
    File(PathBuf),
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Embedded => f.write_str("embedded defaults"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    pub endpoint: String,
    pub client_identifier: String,
    pub region: Region,
    pub request_timeout: Duration,
    pub page_size: u32,
    /// Warehouse numbers the online-order list is paged over
    pub partitions: Vec<String>,
    pub detail_concurrency: usize,
    pub retry: RetryPolicy,
    pub lookback_years: u32,
    pub source: ConfigSource,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://ecom-api.costco.com/ebusiness/order/v1/orders/graphql".to_string(),
            client_identifier: "481b1aec-aa3b-454b-b81b-48187e28f205".to_string(),
            region: Region::Us,
            request_timeout: Duration::from_secs(30),
            page_size: 100,
            partitions: vec!["847".to_string()],
            detail_concurrency: 5,
            retry: RetryPolicy::default(),
            lookback_years: 2,
            source: ConfigSource::Embedded,
        }
    }
}

impl SyncConfig {
    /// Load from `path` if given, else the data-dir override, else defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let override_path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => default_config_path(),
        };

        if let Some(path) = override_path.filter(|p| p.exists()) {
            let content = fs::read_to_string(&path)
                .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
            let mut config = parse_config(&content)?;
            config.source = ConfigSource::File(path);
            return Ok(config);
        }

        parse_config(DEFAULT_CONFIG)
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("clubstat").join("config").join("clubstat.toml"))
}

/// Opaque upstream credentials
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub id_token: String,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, id_token: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            id_token: id_token.into(),
        }
    }

    /// Read both values from the environment
    pub fn from_env() -> Result<Self> {
        let read = |name: &str| {
            std::env::var(name)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::Config(format!("{} is not set", name)))
        };
        Ok(Self::new(read(CLIENT_ID_ENV)?, read(ID_TOKEN_ENV)?))
    }
}

// Keep tokens out of logs
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("id_token", &"<redacted>")
            .finish()
    }
}

/// Raw config structure for TOML parsing
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    upstream: Option<RawUpstream>,
    orders: Option<RawOrders>,
    retry: Option<RawRetry>,
    sync: Option<RawSync>,
}

#[derive(Debug, Deserialize)]
struct RawUpstream {
    endpoint: Option<String>,
    client_identifier: Option<String>,
    region: Option<String>,
    request_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawOrders {
    page_size: Option<u32>,
    partitions: Option<Vec<String>>,
    detail_concurrency: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RawRetry {
    max_attempts: Option<u32>,
    initial_delay_ms: Option<u64>,
    multiplier: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RawSync {
    lookback_years: Option<u32>,
}

/// Parse config from TOML content; missing keys keep their defaults
fn parse_config(content: &str) -> Result<SyncConfig> {
    let raw: RawConfig = toml::from_str(content)?;
    let mut config = SyncConfig::default();

    if let Some(upstream) = raw.upstream {
        if let Some(endpoint) = upstream.endpoint {
            config.endpoint = endpoint;
        }
        if let Some(id) = upstream.client_identifier {
            config.client_identifier = id;
        }
        if let Some(region) = upstream.region {
            config.region = region.parse()?;
        }
        if let Some(secs) = upstream.request_timeout_secs {
            config.request_timeout = Duration::from_secs(secs);
        }
    }

    if let Some(orders) = raw.orders {
        if let Some(size) = orders.page_size {
            config.page_size = size;
        }
        if let Some(partitions) = orders.partitions {
            config.partitions = partitions
                .into_iter()
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect();
        }
        if let Some(concurrency) = orders.detail_concurrency {
            config.detail_concurrency = concurrency;
        }
    }

    if let Some(retry) = raw.retry {
        if let Some(attempts) = retry.max_attempts {
            config.retry.max_attempts = attempts;
        }
        if let Some(ms) = retry.initial_delay_ms {
            config.retry.initial_delay = Duration::from_millis(ms);
        }
        if let Some(multiplier) = retry.multiplier {
            config.retry.multiplier = multiplier;
        }
    }

    if let Some(sync) = raw.sync {
        if let Some(years) = sync.lookback_years {
            config.lookback_years = years;
        }
    }

    validate(&config)?;
    Ok(config)
}

fn validate(config: &SyncConfig) -> Result<()> {
    if config.page_size == 0 {
        return Err(Error::Config("orders.page_size must be at least 1".into()));
    }
    if config.partitions.is_empty() {
        return Err(Error::Config("orders.partitions must not be empty".into()));
    }
    if config.detail_concurrency == 0 {
        return Err(Error::Config(
            "orders.detail_concurrency must be at least 1".into(),
        ));
    }
    if config.retry.max_attempts == 0 {
        return Err(Error::Config("retry.max_attempts must be at least 1".into()));
    }
    if config.lookback_years == 0 {
        return Err(Error::Config("sync.lookback_years must be at least 1".into()));
    }
    Ok(())
}
