//! HTTP client for the log-analytics gateway
//!
//! The gateway fronts the cluster's log group with a submit/poll API:
//! `POST /queries` starts a query and `GET /queries/{id}` returns its status
//! and result records as lists of `{field, value}` pairs.

use super::LogsBackend;
use crate::error::{OpsError, Result};
use crate::models::{QueryResult, QueryStatus, Row};
use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use url::Url;

#[derive(Debug, Serialize)]
struct StartQueryRequest<'a> {
    log_group: &'a str,
    query_string: &'a str,
    start_time: i64,
    end_time: i64,
}

#[derive(Debug, Deserialize)]
struct StartQueryResponse {
    query_id: String,
}

#[derive(Debug, Deserialize)]
struct QueryResultsResponse {
    status: QueryStatus,
    #[serde(default)]
    results: Vec<Vec<ResultField>>,
}

#[derive(Debug, Deserialize)]
struct ResultField {
    field: String,
    value: String,
}

/// Logs backend reached over HTTP
pub struct HttpLogsBackend {
    client: Client,
    base_url: Url,
    log_group: String,
}

impl HttpLogsBackend {
    pub fn new(endpoint: &str, log_group: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        // Url::join drops the last path segment unless it ends with '/'
        let base_url = if endpoint.ends_with('/') {
            Url::parse(endpoint)?
        } else {
            Url::parse(&format!("{}/", endpoint))?
        };

        Ok(Self {
            client,
            base_url,
            log_group: log_group.into(),
        })
    }

    pub fn log_group(&self) -> &str {
        &self.log_group
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(OpsError::BackendStatus {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl LogsBackend for HttpLogsBackend {
    async fn submit(
        &self,
        query: &str,
        start_epoch_secs: i64,
        end_epoch_secs: i64,
    ) -> Result<String> {
        let url = self.base_url.join("queries")?;
        let request = StartQueryRequest {
            log_group: &self.log_group,
            query_string: query,
            start_time: start_epoch_secs,
            end_time: end_epoch_secs,
        };

        let response = self.client.post(url).json(&request).send().await?;
        let started: StartQueryResponse = Self::read_json(response).await?;

        Ok(started.query_id)
    }

    async fn poll(&self, query_id: &str) -> Result<QueryResult> {
        let url = self.base_url.join(&format!("queries/{}", query_id))?;

        let response = self.client.get(url).send().await?;
        let results: QueryResultsResponse = Self::read_json(response).await?;

        Ok(QueryResult {
            status: results.status,
            rows: project_rows(results.results),
        })
    }
}

/// Turn each `{field, value}` record into a column -> value row
fn project_rows(records: Vec<Vec<ResultField>>) -> Vec<Row> {
    records
        .into_iter()
        .map(|fields| fields.into_iter().map(|f| (f.field, f.value)).collect())
        .collect()
}
