//! HTTP client for the monitoring gateway
//!
//! `POST /statistics` takes a metric, its dimensions, a window and a period
//! and answers with `{timestamp, average}` datapoints.

use super::{Dimension, MetricQuery, MetricsBackend, CONTAINER_METRICS_NAMESPACE};
use crate::error::{OpsError, Result};
use crate::models::CpuDatapoint;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

#[derive(Debug, Serialize)]
struct StatisticsRequest<'a> {
    namespace: &'a str,
    metric_name: &'a str,
    dimensions: &'a [Dimension],
    start_time: i64,
    end_time: i64,
    period: u32,
    statistic: &'a str,
}

#[derive(Debug, Deserialize)]
struct StatisticsResponse {
    #[serde(default)]
    datapoints: Vec<GatewayDatapoint>,
}

#[derive(Debug, Deserialize)]
struct GatewayDatapoint {
    timestamp: DateTime<Utc>,
    average: f64,
}

/// Monitoring backend reached over HTTP
pub struct HttpMetricsBackend {
    client: Client,
    base_url: Url,
}

impl HttpMetricsBackend {
    pub fn new(endpoint: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        let base_url = if endpoint.ends_with('/') {
            Url::parse(endpoint)?
        } else {
            Url::parse(&format!("{}/", endpoint))?
        };

        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl MetricsBackend for HttpMetricsBackend {
    async fn average(&self, query: &MetricQuery) -> Result<Vec<CpuDatapoint>> {
        let url = self.base_url.join("statistics")?;
        let request = StatisticsRequest {
            namespace: CONTAINER_METRICS_NAMESPACE,
            metric_name: &query.metric,
            dimensions: &query.dimensions,
            start_time: query.window.start_epoch_secs(),
            end_time: query.window.end_epoch_secs(),
            period: query.period_seconds,
            statistic: "Average",
        };

        let response = self.client.post(url).json(&request).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(OpsError::MetricsStatus {
                status: status.as_u16(),
                body,
            });
        }

        let stats: StatisticsResponse = serde_json::from_str(&body)?;
        Ok(stats
            .datapoints
            .into_iter()
            .map(|p| CpuDatapoint {
                timestamp: p.timestamp,
                avg: p.average,
            })
            .collect())
    }
}
