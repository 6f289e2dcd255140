//! Container metric statistics from the monitoring backend
//!
//! Only per-pod CPU utilisation is read. The backend returns one averaged
//! datapoint per period over the requested window.

mod http;

pub use http::HttpMetricsBackend;

use crate::error::Result;
use crate::models::{CpuDatapoint, TimeWindow};
use async_trait::async_trait;
use serde::Serialize;

/// Metric namespace the cluster's container metrics are published under
pub const CONTAINER_METRICS_NAMESPACE: &str = "ContainerInsights";
pub const POD_CPU_UTILIZATION: &str = "pod_cpu_utilization";

/// Name/value pair selecting one metric series
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dimension {
    pub name: String,
    pub value: String,
}

impl Dimension {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Averaged statistics for one metric series over a window
#[derive(Debug, Clone, PartialEq)]
pub struct MetricQuery {
    pub metric: String,
    pub dimensions: Vec<Dimension>,
    pub window: TimeWindow,
    pub period_seconds: u32,
}

/// Monitoring backend seam
#[async_trait]
pub trait MetricsBackend: Send + Sync {
    /// Average per period; datapoints may come back in any order
    async fn average(&self, query: &MetricQuery) -> Result<Vec<CpuDatapoint>>;
}
