//! Core data models for the AI-Ops assistant

use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lookback window `[end - minutes, end]` over which evidence is gathered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Window ending now
    pub fn lookback(minutes: u32) -> Self {
        Self::ending_at(Utc::now(), minutes)
    }

    pub fn ending_at(end: DateTime<Utc>, minutes: u32) -> Self {
        Self {
            start: end - Duration::minutes(i64::from(minutes)),
            end,
        }
    }

    pub fn start_epoch_secs(&self) -> i64 {
        self.start.timestamp()
    }

    pub fn end_epoch_secs(&self) -> i64 {
        self.end.timestamp()
    }
}

/// Status of a log-analytics query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryStatus {
    Running,
    Complete,
    Failed,
    Cancelled,
}

impl QueryStatus {
    /// Returns true once the backend will no longer change the result
    pub fn is_terminal(&self) -> bool {
        !matches!(self, QueryStatus::Running)
    }
}

impl std::fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryStatus::Running => write!(f, "Running"),
            QueryStatus::Complete => write!(f, "Complete"),
            QueryStatus::Failed => write!(f, "Failed"),
            QueryStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// One result record, column name -> value in the order the query projected them
pub type Row = IndexMap<String, String>;

/// Terminal result of a log-analytics query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub status: QueryStatus,
    pub rows: Vec<Row>,
}

/// Error count per known service over a lookback window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorSummary {
    pub lookback_minutes: u32,
    pub summary: BTreeMap<String, u64>,
}

impl ErrorSummary {
    pub fn errors_for(&self, service: &str) -> Option<u64> {
        self.summary.get(service).copied()
    }

    pub fn total(&self) -> u64 {
        self.summary.values().sum()
    }
}

/// Recent raw error log lines across all services
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEvents {
    pub lookback_minutes: u32,
    pub count: usize,
    pub results: Vec<Row>,
}

/// Recent error log lines for a single service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceErrors {
    pub lookback_minutes: u32,
    pub service: String,
    pub status: QueryStatus,
    pub results: Vec<Row>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointHits {
    pub endpoint: String,
    pub hits: u64,
}

/// Endpoints ranked by request count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopEndpoints {
    pub lookback_minutes: u32,
    pub endpoints: Vec<EndpointHits>,
}

/// Captured result of a control-plane command
///
/// Either the command ran (`exit_code` is set, possibly non-zero) or it could
/// not be invoked at all (`error` is set).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionOutcome {
    pub fn completed(
        command: impl Into<String>,
        exit_code: i32,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) -> Self {
        Self {
            command: command.into(),
            exit_code: Some(exit_code),
            stdout: stdout.into(),
            stderr: stderr.into(),
            error: None,
        }
    }

    pub fn invocation_failed(command: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            error: Some(error.into()),
        }
    }

    /// Ran and exited zero
    pub fn succeeded(&self) -> bool {
        self.error.is_none() && self.exit_code == Some(0)
    }
}

/// Readiness of a single pod
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodReadiness {
    pub name: String,
    pub phase: String,
    pub ready: bool,
}

impl PodReadiness {
    pub fn is_healthy(&self) -> bool {
        self.phase == "Running" && self.ready
    }
}

/// Pod listing for a namespace
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodStatusReport {
    pub namespace: String,
    pub outcome: ActionOutcome,
    pub pods: Vec<PodReadiness>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
}

impl PodStatusReport {
    pub fn not_ready(&self) -> impl Iterator<Item = &PodReadiness> {
        self.pods.iter().filter(|p| !p.is_healthy())
    }
}

/// Terminal status of a self-heal run
/// One averaged CPU sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CpuDatapoint {
    pub timestamp: DateTime<Utc>,
    pub avg: f64,
}

/// CPU utilisation series for one deployment, oldest sample first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuUtilization {
    pub metric: String,
    pub namespace: String,
    pub deployment: String,
    pub lookback_minutes: u32,
    pub period_seconds: u32,
    pub datapoints: Vec<CpuDatapoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationStatus {
    NoActionNeeded,
    Completed,
    CompletedWithErrorsStillPresent,
}

impl ReconciliationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconciliationStatus::NoActionNeeded => "no_action_needed",
            ReconciliationStatus::Completed => "completed",
            ReconciliationStatus::CompletedWithErrorsStillPresent => {
                "completed_with_errors_still_present"
            }
        }
    }
}

impl std::fmt::Display for ReconciliationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named step of a self-heal run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    PreCheck,
    Restart,
    RolloutWait,
    PostCheck,
}

/// What a phase produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PhaseOutcome {
    Evidence { summary: ErrorSummary },
    EvidenceUnavailable { reason: String },
    Action { outcome: ActionOutcome },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseRecord {
    pub phase: Phase,
    pub outcome: PhaseOutcome,
}

/// Audit record of one self-heal invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationRecord {
    pub status: ReconciliationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub service: String,
    pub deployment: String,
    pub namespace: String,
    pub lookback_minutes: u32,
    pub errors_before: Option<u64>,
    pub errors_after: Option<u64>,
    pub phases: Vec<PhaseRecord>,
}

impl ReconciliationRecord {
    /// Control-plane actions taken, in order
    pub fn actions(&self) -> impl Iterator<Item = (Phase, &ActionOutcome)> {
        self.phases.iter().filter_map(|p| match &p.outcome {
            PhaseOutcome::Action { outcome } => Some((p.phase, outcome)),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_time_window_lookback() {
        let end = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let window = TimeWindow::ending_at(end, 45);

        assert_eq!(window.end_epoch_secs() - window.start_epoch_secs(), 45 * 60);
        assert_eq!(window.end, end);
    }

    #[test]
    fn test_query_status_terminal() {
        assert!(!QueryStatus::Running.is_terminal());
        assert!(QueryStatus::Complete.is_terminal());
        assert!(QueryStatus::Failed.is_terminal());
        assert!(QueryStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_action_outcome_serialization_omits_absent_fields() {
        let ran = ActionOutcome::completed("kubectl get pods", 1, "", "boom");
        let json = serde_json::to_value(&ran).unwrap();
        assert_eq!(json["exit_code"], 1);
        assert!(json.get("error").is_none());
        assert!(!ran.succeeded());

        let failed = ActionOutcome::invocation_failed("kubectl get pods", "not found");
        let json = serde_json::to_value(&failed).unwrap();
        assert!(json.get("exit_code").is_none());
        assert_eq!(json["error"], "not found");
    }

    #[test]
    fn test_reconciliation_status_names() {
        let json = serde_json::to_value(ReconciliationStatus::CompletedWithErrorsStillPresent)
            .unwrap();
        assert_eq!(json, "completed_with_errors_still_present");
        assert_eq!(
            ReconciliationStatus::NoActionNeeded.to_string(),
            "no_action_needed"
        );
    }

    #[test]
    fn test_pod_readiness_requires_running_and_ready() {
        let pod = |phase: &str, ready| PodReadiness {
            name: "p".to_string(),
            phase: phase.to_string(),
            ready,
        };
        assert!(pod("Running", true).is_healthy());
        assert!(!pod("Running", false).is_healthy());
        assert!(!pod("Pending", true).is_healthy());
    }
}
