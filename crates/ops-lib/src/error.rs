//! Error types for evidence queries and reporting

use crate::models::QueryStatus;

/// Errors raised while gathering evidence from the logs and metrics backends
#[derive(Debug, thiserror::Error)]
pub enum OpsError {
    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("logs backend returned {status}: {body}")]
    BackendStatus { status: u16, body: String },

    #[error("metrics backend returned {status}: {body}")]
    MetricsStatus { status: u16, body: String },

    #[error("invalid backend URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("failed to decode backend response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("query for '{service}' finished with status {status}")]
    QueryNotComplete { service: String, status: QueryStatus },

    #[error("query {query_id} still running after {waited_secs}s")]
    QueryTimeout { query_id: String, waited_secs: u64 },

    #[error("field '{field}' is not a count: '{value}'")]
    InvalidCount { field: String, value: String },

    #[error("invalid service name '{0}'")]
    InvalidServiceName(String),

    #[error("metric period must be at least 1 second")]
    InvalidPeriod,

    #[error("no metrics backend configured")]
    MetricsNotConfigured,
}

impl OpsError {
    /// False for requests rejected before any backend was contacted
    pub fn is_backend_failure(&self) -> bool {
        !matches!(
            self,
            OpsError::InvalidServiceName(_) | OpsError::InvalidPeriod | OpsError::MetricsNotConfigured
        )
    }
}

pub type Result<T> = std::result::Result<T, OpsError>;
