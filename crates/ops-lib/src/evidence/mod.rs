//! Evidence queries against the log-analytics backend
//!
//! A query is submitted for a lookback window and then polled at a fixed
//! cadence until the backend reports a terminal status.

mod http;
pub mod queries;

pub use http::HttpLogsBackend;

use crate::error::{OpsError, Result};
use crate::models::{QueryResult, TimeWindow};
use crate::observability::OpsMetrics;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Log-analytics backend seam
#[async_trait]
pub trait LogsBackend: Send + Sync {
    /// Start a query over `[start, end]` (epoch seconds), returning its id
    async fn submit(&self, query: &str, start_epoch_secs: i64, end_epoch_secs: i64)
        -> Result<String>;

    /// Fetch the current status and rows of a submitted query
    async fn poll(&self, query_id: &str) -> Result<QueryResult>;
}

/// Polling behaviour for the evidence client
#[derive(Debug, Clone)]
pub struct EvidenceConfig {
    /// Delay between polls (default: 1 second)
    pub poll_interval: Duration,
    /// Give up on a query still running after this long (default: never)
    pub timeout: Option<Duration>,
}

impl Default for EvidenceConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            timeout: None,
        }
    }
}

/// Runs time-windowed queries and blocks until they finish
#[derive(Clone)]
pub struct EvidenceClient {
    backend: Arc<dyn LogsBackend>,
    config: EvidenceConfig,
    metrics: OpsMetrics,
}

impl EvidenceClient {
    pub fn new(backend: Arc<dyn LogsBackend>, config: EvidenceConfig) -> Self {
        Self {
            backend,
            config,
            metrics: OpsMetrics::new(),
        }
    }

    /// Run `query` over the last `lookback_minutes` and wait for a terminal status
    ///
    /// Transport failures are returned to the caller unchanged. A `Failed` or
    /// `Cancelled` query is still a terminal result, not an error.
    pub async fn run_query(&self, query: &str, lookback_minutes: u32) -> Result<QueryResult> {
        let window = TimeWindow::lookback(lookback_minutes);
        let started = Instant::now();

        let result = self.submit_and_wait(query, &window, started).await;

        match &result {
            Ok(res) => {
                self.metrics
                    .observe_query_latency(started.elapsed().as_secs_f64());
                debug!(
                    status = %res.status,
                    rows = res.rows.len(),
                    elapsed_ms = started.elapsed().as_millis(),
                    "Query finished"
                );
            }
            Err(e) => {
                self.metrics.inc_query_failures();
                warn!(error = %e, lookback_minutes, "Query failed");
            }
        }

        result
    }

    async fn submit_and_wait(
        &self,
        query: &str,
        window: &TimeWindow,
        started: Instant,
    ) -> Result<QueryResult> {
        let query_id = self
            .backend
            .submit(query, window.start_epoch_secs(), window.end_epoch_secs())
            .await?;
        debug!(query_id = %query_id, "Query submitted");

        loop {
            let result = self.backend.poll(&query_id).await?;
            if result.status.is_terminal() {
                return Ok(result);
            }

            if let Some(timeout) = self.config.timeout {
                if started.elapsed() >= timeout {
                    return Err(OpsError::QueryTimeout {
                        query_id,
                        waited_secs: started.elapsed().as_secs(),
                    });
                }
            }

            tokio::time::sleep(self.config.poll_interval).await;
        }
    }
}
