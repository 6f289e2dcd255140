//! Read-only reports and the per-service error aggregator
//!
//! The error summary is the evidence primitive shared by the reporting
//! endpoints, the chat assistant and the self-heal engine.

use crate::container_metrics::{Dimension, MetricQuery, MetricsBackend, POD_CPU_UTILIZATION};
use crate::error::{OpsError, Result};
use crate::evidence::{queries, EvidenceClient};
use crate::executor::{ActionRequest, ControlPlane};
use crate::models::{
    CpuUtilization, ErrorEvents, ErrorSummary, EndpointHits, PodReadiness, PodStatusReport,
    QueryStatus, Row, ServiceErrors, TimeWindow, TopEndpoints,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Answers reporting questions from the logs backend and the control plane
#[derive(Clone)]
pub struct Reporter {
    evidence: EvidenceClient,
    control_plane: Arc<dyn ControlPlane>,
    services: Vec<String>,
    metrics: Option<ContainerMetrics>,
}

#[derive(Clone)]
struct ContainerMetrics {
    backend: Arc<dyn MetricsBackend>,
    cluster_name: String,
}

impl Reporter {
    pub fn new(
        evidence: EvidenceClient,
        control_plane: Arc<dyn ControlPlane>,
        services: Vec<String>,
    ) -> Self {
        Self {
            evidence,
            control_plane,
            services,
            metrics: None,
        }
    }

    /// Read container metrics for pods of `cluster_name`
    pub fn with_metrics(
        mut self,
        backend: Arc<dyn MetricsBackend>,
        cluster_name: impl Into<String>,
    ) -> Self {
        self.metrics = Some(ContainerMetrics {
            backend,
            cluster_name: cluster_name.into(),
        });
        self
    }

    /// Known services, in name-matching priority order
    pub fn services(&self) -> &[String] {
        &self.services
    }

    pub fn control_plane(&self) -> &Arc<dyn ControlPlane> {
        &self.control_plane
    }

    /// Error count per known service over the last `minutes`
    ///
    /// All-or-nothing: if any service's query fails or does not complete, the
    /// whole summary fails rather than reporting a partial map.
    pub async fn error_summary(&self, minutes: u32) -> Result<ErrorSummary> {
        let mut summary = BTreeMap::new();

        for service in &self.services {
            let result = self
                .evidence
                .run_query(&queries::error_count(service), minutes)
                .await?;

            if result.status != QueryStatus::Complete {
                return Err(OpsError::QueryNotComplete {
                    service: service.clone(),
                    status: result.status,
                });
            }

            let errors = match result.rows.first() {
                Some(row) => parse_count(row, "errors")?,
                None => 0,
            };
            debug!(service = %service, errors, minutes, "Counted service errors");
            summary.insert(service.clone(), errors);
        }

        Ok(ErrorSummary {
            lookback_minutes: minutes,
            summary,
        })
    }

    /// Most recent error lines across all services
    pub async fn recent_errors(&self, minutes: u32, limit: u32) -> Result<ErrorEvents> {
        let result = self
            .evidence
            .run_query(&queries::recent_errors(limit), minutes)
            .await?;

        Ok(ErrorEvents {
            lookback_minutes: minutes,
            count: result.rows.len(),
            results: result.rows,
        })
    }

    /// Most recent error lines for one service; any service name is accepted
    pub async fn service_errors(
        &self,
        service: &str,
        minutes: u32,
        limit: u32,
    ) -> Result<ServiceErrors> {
        validate_service_name(service)?;

        let result = self
            .evidence
            .run_query(&queries::service_errors(service, limit), minutes)
            .await?;

        Ok(ServiceErrors {
            lookback_minutes: minutes,
            service: service.to_string(),
            status: result.status,
            results: result.rows,
        })
    }

    /// Endpoints ranked by hit count
    pub async fn top_endpoints(&self, minutes: u32, limit: u32) -> Result<TopEndpoints> {
        let result = self
            .evidence
            .run_query(&queries::top_endpoints(limit), minutes)
            .await?;

        let endpoints = result
            .rows
            .iter()
            .map(|row| {
                Ok(EndpointHits {
                    endpoint: row
                        .get("requestURI")
                        .cloned()
                        .unwrap_or_else(|| "unknown".to_string()),
                    hits: parse_count(row, "hits")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(TopEndpoints {
            lookback_minutes: minutes,
            endpoints,
        })
    }

    /// Average CPU utilisation of a deployment's pods, oldest datapoint first
    pub async fn cpu_utilization(
        &self,
        deployment: &str,
        namespace: &str,
        minutes: u32,
        period_seconds: u32,
    ) -> Result<CpuUtilization> {
        let metrics = self.metrics.as_ref().ok_or(OpsError::MetricsNotConfigured)?;
        if period_seconds == 0 {
            return Err(OpsError::InvalidPeriod);
        }

        let query = MetricQuery {
            metric: POD_CPU_UTILIZATION.to_string(),
            dimensions: vec![
                Dimension::new("ClusterName", metrics.cluster_name.as_str()),
                Dimension::new("Namespace", namespace),
                Dimension::new("PodName", deployment),
            ],
            window: TimeWindow::lookback(minutes),
            period_seconds,
        };

        let mut datapoints = metrics.backend.average(&query).await?;
        datapoints.sort_by_key(|p| p.timestamp);
        debug!(deployment, namespace, points = datapoints.len(), "Read CPU utilization");

        Ok(CpuUtilization {
            metric: POD_CPU_UTILIZATION.to_string(),
            namespace: namespace.to_string(),
            deployment: deployment.to_string(),
            lookback_minutes: minutes,
            period_seconds,
            datapoints,
        })
    }

    /// List pods in `namespace` and work out which are not ready
    pub async fn pod_status(&self, namespace: &str) -> PodStatusReport {
        let outcome = self
            .control_plane
            .execute(ActionRequest::GetPods {
                namespace: namespace.to_string(),
            })
            .await;

        let (pods, parse_error) = if outcome.stdout.is_empty() {
            (Vec::new(), None)
        } else {
            match parse_pod_list(&outcome.stdout) {
                Ok(pods) => (pods, None),
                Err(e) => (Vec::new(), Some(format!("Failed to decode pod list: {}", e))),
            }
        };

        PodStatusReport {
            namespace: namespace.to_string(),
            outcome,
            pods,
            parse_error,
        }
    }
}

/// Missing fields count as zero; present but non-numeric fields are an error
fn parse_count(row: &Row, field: &str) -> Result<u64> {
    match row.get(field) {
        None => Ok(0),
        Some(value) => value.trim().parse().map_err(|_| OpsError::InvalidCount {
            field: field.to_string(),
            value: value.clone(),
        }),
    }
}

/// Service names are interpolated into query text
fn validate_service_name(service: &str) -> Result<()> {
    let valid = !service.is_empty()
        && service
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(())
    } else {
        Err(OpsError::InvalidServiceName(service.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct PodList {
    #[serde(default)]
    items: Vec<PodItem>,
}

#[derive(Debug, Deserialize)]
struct PodItem {
    #[serde(default)]
    metadata: PodMetadata,
    #[serde(default)]
    status: PodStatusFields,
}

#[derive(Debug, Default, Deserialize)]
struct PodMetadata {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PodStatusFields {
    phase: Option<String>,
    conditions: Option<Vec<PodCondition>>,
}

#[derive(Debug, Deserialize)]
struct PodCondition {
    #[serde(rename = "type")]
    kind: String,
    status: String,
}

fn parse_pod_list(stdout: &str) -> serde_json::Result<Vec<PodReadiness>> {
    let list: PodList = serde_json::from_str(stdout)?;

    Ok(list
        .items
        .into_iter()
        .map(|pod| {
            let ready = pod
                .status
                .conditions
                .unwrap_or_default()
                .iter()
                .any(|c| c.kind == "Ready" && c.status == "True");

            PodReadiness {
                name: pod.metadata.name.unwrap_or_else(|| "unknown".to_string()),
                phase: pod.status.phase.unwrap_or_else(|| "Unknown".to_string()),
                ready,
            }
        })
        .collect())
}
