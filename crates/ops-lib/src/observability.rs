//! Observability infrastructure for the AI-Ops assistant
//!
//! Provides:
//! - Prometheus metrics (query latency, query failures, actions, reconciliations, intents)
//! - Structured JSON logging with tracing

use crate::models::{ActionOutcome, ReconciliationRecord};
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Histogram, IntCounter,
    IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for log query latency (in seconds); queries poll at 1s
const QUERY_LATENCY_BUCKETS: &[f64] = &[0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<OpsMetricsInner> = OnceLock::new();

struct OpsMetricsInner {
    query_latency_seconds: Histogram,
    query_failures: IntCounter,
    actions: IntCounterVec,
    reconciliations: IntCounterVec,
    intents: IntCounterVec,
}

impl OpsMetricsInner {
    fn new() -> Self {
        Self {
            query_latency_seconds: register_histogram!(
                "aiops_query_latency_seconds",
                "Time from query submission to terminal status",
                QUERY_LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register query_latency_seconds"),

            query_failures: register_int_counter!(
                "aiops_query_failures_total",
                "Log queries that could not be completed"
            )
            .expect("Failed to register query_failures"),

            actions: register_int_counter_vec!(
                "aiops_actions_total",
                "Control-plane actions executed",
                &["verb", "result"]
            )
            .expect("Failed to register actions"),

            reconciliations: register_int_counter_vec!(
                "aiops_reconciliations_total",
                "Self-heal runs by final status",
                &["status"]
            )
            .expect("Failed to register reconciliations"),

            intents: register_int_counter_vec!(
                "aiops_intents_total",
                "Chat questions routed by intent",
                &["intent"]
            )
            .expect("Failed to register intents"),
        }
    }
}

/// Handle to the process-wide metrics; clones share the same series
#[derive(Clone)]
pub struct OpsMetrics {
    _private: (),
}

impl Default for OpsMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl OpsMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(OpsMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &OpsMetricsInner {
        GLOBAL_METRICS.get_or_init(OpsMetricsInner::new)
    }

    pub fn observe_query_latency(&self, duration_secs: f64) {
        self.inner().query_latency_seconds.observe(duration_secs);
    }

    pub fn inc_query_failures(&self) {
        self.inner().query_failures.inc();
    }

    pub fn inc_actions(&self, verb: &str, succeeded: bool) {
        let result = if succeeded { "success" } else { "failure" };
        self.inner()
            .actions
            .with_label_values(&[verb, result])
            .inc();
    }

    pub fn inc_reconciliations(&self, status: &str) {
        self.inner()
            .reconciliations
            .with_label_values(&[status])
            .inc();
    }

    pub fn inc_intents(&self, intent: &str) {
        self.inner().intents.with_label_values(&[intent]).inc();
    }
}

/// Structured logger for assistant events
#[derive(Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn log_startup(&self, version: &str, namespace: &str, log_group: &str) {
        info!(
            event = "bot_started",
            service = %self.service,
            version = %version,
            namespace = %namespace,
            log_group = %log_group,
            "AI-Ops bot started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "bot_shutdown",
            service = %self.service,
            reason = %reason,
            "AI-Ops bot shutting down"
        );
    }

    /// Log a control-plane action; failures are warnings
    pub fn log_action(&self, verb: &str, namespace: &str, outcome: &ActionOutcome) {
        if outcome.succeeded() {
            info!(
                event = "action_executed",
                service = %self.service,
                verb = %verb,
                namespace = %namespace,
                command = %outcome.command,
                exit_code = ?outcome.exit_code,
                "Control-plane action succeeded"
            );
        } else {
            warn!(
                event = "action_executed",
                service = %self.service,
                verb = %verb,
                namespace = %namespace,
                command = %outcome.command,
                exit_code = ?outcome.exit_code,
                error = ?outcome.error,
                stderr = %outcome.stderr,
                "Control-plane action failed"
            );
        }
    }

    pub fn log_reconciliation(&self, record: &ReconciliationRecord) {
        info!(
            event = "reconciliation_finished",
            service = %self.service,
            target_service = %record.service,
            deployment = %record.deployment,
            namespace = %record.namespace,
            status = %record.status,
            errors_before = ?record.errors_before,
            errors_after = ?record.errors_after,
            phases = record.phases.len(),
            "Self-heal finished"
        );
    }

    pub fn log_evidence_unavailable(&self, context: &str, reason: &str) {
        warn!(
            event = "evidence_unavailable",
            service = %self.service,
            context = %context,
            reason = %reason,
            "Error evidence unavailable"
        );
    }

    pub fn log_intent(&self, intent: &str, question: &str) {
        info!(
            event = "intent_routed",
            service = %self.service,
            intent = %intent,
            question_chars = question.chars().count(),
            "Routed chat question"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ops_metrics_recording() {
        let metrics = OpsMetrics::new();

        metrics.observe_query_latency(1.5);
        metrics.inc_query_failures();
        metrics.inc_actions("restart", true);
        metrics.inc_reconciliations("completed");
        metrics.inc_intents("error_summary");

        let families = prometheus::gather();
        let names: Vec<&str> = families.iter().map(|f| f.get_name()).collect();
        assert!(names.contains(&"aiops_query_latency_seconds"));
        assert!(names.contains(&"aiops_actions_total"));
        assert!(names.contains(&"aiops_intents_total"));
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("aiops-bot");
        assert_eq!(logger.service, "aiops-bot");
    }
}
