//! Error types for clubstat

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failure talking to the upstream GraphQL endpoint.
///
/// Classification is carried as data so retry decisions never depend on
/// message text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    /// HTTP 503: the endpoint is overloaded. Retryable.
    #[error("service unavailable (503): {body}")]
    Unavailable { body: String },

    /// Any other non-200 status (400 and friends). Never retried.
    #[error("request rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Connection reset, DNS failure, timeout...
    #[error("transport failure: {0}")]
    Transport(String),

    /// 200 response without a `data` envelope, or an undecodable body.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl UpstreamError {
    /// Build the error for a non-200 status.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        if status == 503 {
            Self::Unavailable { body }
        } else {
            Self::Rejected { status, body }
        }
    }

    /// HTTP status code, when the failure came with one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unavailable { .. } => Some(503),
            Self::Rejected { status, .. } => Some(*status),
            Self::Transport(_) | Self::Malformed(_) => None,
        }
    }

    /// Only upstream overload is worth waiting out.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    pub fn kind(&self) -> FetchErrorKind {
        match self {
            Self::Unavailable { .. } => FetchErrorKind::Unavailable,
            Self::Rejected { .. } => FetchErrorKind::Rejected,
            Self::Transport(_) => FetchErrorKind::Transport,
            Self::Malformed(_) => FetchErrorKind::Malformed,
        }
    }

    /// Short reason for a failed sync ("timed out", "rejected", ...).
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Unavailable { .. } => "upstream temporarily unavailable",
            Self::Rejected { status, .. } if *status == 401 || *status == 403 => {
                "rejected (not signed in or membership not verified)"
            }
            Self::Rejected { .. } => "rejected by upstream",
            Self::Transport(msg) if msg.contains("timed out") => "timed out",
            Self::Transport(_) => "network error",
            Self::Malformed(_) => "unexpected response from upstream",
        }
    }
}

/// Category of a recorded per-order failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchErrorKind {
    Unavailable,
    Rejected,
    Transport,
    Malformed,
}

impl FetchErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unavailable => "unavailable",
            Self::Rejected => "rejected",
            Self::Transport => "transport",
            Self::Malformed => "malformed",
        }
    }
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_classification() {
        let unavailable = UpstreamError::from_status(503, "busy");
        assert!(unavailable.is_retryable());
        assert_eq!(unavailable.status(), Some(503));

        let rejected = UpstreamError::from_status(400, "bad");
        assert!(!rejected.is_retryable());
        assert_eq!(rejected.status(), Some(400));
        assert_eq!(rejected.kind(), FetchErrorKind::Rejected);
    }

    #[test]
    fn test_transport_is_not_retryable() {
        let err = UpstreamError::Transport("connection reset".into());
        assert!(!err.is_retryable());
        assert_eq!(err.status(), None);
        assert_eq!(err.reason(), "network error");
    }

    #[test]
    fn test_reason_for_timeout() {
        let err = UpstreamError::Transport("operation timed out".into());
        assert_eq!(err.reason(), "timed out");
    }
}
