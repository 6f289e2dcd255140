//! Self-heal reconciliation engine
//!
//! One run is a fixed sequence against a single deployment:
//!
//! 1. pre-check: count the service's errors over the lookback window
//! 2. decide: exactly zero errors ends the run with no action
//! 3. restart the deployment
//! 4. wait for the rollout, bounded by the caller's timeout
//! 5. post-check: count errors again
//!
//! Unavailable evidence before the restart is treated as a possible problem
//! (the run proceeds); unavailable evidence afterwards is reported as
//! `Completed`. Nothing is retried and nothing is rolled back. Every phase
//! is kept in the returned record whether it succeeded or not.

use crate::executor::ActionRequest;
use crate::models::{
    Phase, PhaseOutcome, PhaseRecord, ReconciliationRecord, ReconciliationStatus,
};
use crate::observability::{OpsMetrics, StructuredLogger};
use crate::reporting::Reporter;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Target and window of a self-heal run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelfHealRequest {
    /// Service whose error count is the evidence
    pub service: String,
    pub deployment: String,
    pub namespace: String,
    /// Lookback window for both evidence checks
    pub minutes: u32,
    /// Rollout wait bound
    pub timeout_seconds: u64,
}

/// Runs self-heal, one run at a time per (deployment, namespace)
#[derive(Clone)]
pub struct SelfHealEngine {
    reporter: Reporter,
    locks: Arc<DashMap<(String, String), Arc<Mutex<()>>>>,
    metrics: OpsMetrics,
    logger: StructuredLogger,
}

impl SelfHealEngine {
    pub fn new(reporter: Reporter, logger: StructuredLogger) -> Self {
        Self {
            reporter,
            locks: Arc::new(DashMap::new()),
            metrics: OpsMetrics::new(),
            logger,
        }
    }

    /// Run once and return the full record
    ///
    /// Overlapping calls for the same target wait for each other so two
    /// restarts never interleave; other targets are not blocked.
    pub async fn run(&self, request: SelfHealRequest) -> ReconciliationRecord {
        let key = (request.deployment.clone(), request.namespace.clone());
        let lock = self.target_lock(&key);
        let guard = lock.lock().await;

        info!(
            service = %request.service,
            deployment = %request.deployment,
            namespace = %request.namespace,
            minutes = request.minutes,
            "Starting self-heal"
        );

        let record = self.reconcile(&request).await;

        drop(guard);
        drop(lock);
        self.release_target_lock(&key);

        self.metrics.inc_reconciliations(record.status.as_str());
        self.logger.log_reconciliation(&record);

        record
    }

    fn target_lock(&self, key: &(String, String)) -> Arc<Mutex<()>> {
        self.locks.entry(key.clone()).or_default().clone()
    }

    /// Forget a target's lock once no run holds or waits on it
    fn release_target_lock(&self, key: &(String, String)) {
        self.locks
            .remove_if(key, |_, lock| Arc::strong_count(lock) == 1);
    }

    async fn reconcile(&self, request: &SelfHealRequest) -> ReconciliationRecord {
        let mut phases = Vec::with_capacity(4);

        let (errors_before, pre_check) = self.check_evidence(request, Phase::PreCheck).await;
        phases.push(pre_check);

        if errors_before == Some(0) {
            return ReconciliationRecord {
                status: ReconciliationStatus::NoActionNeeded,
                reason: Some(format!(
                    "{} has 0 errors in the last {} minutes",
                    request.service, request.minutes
                )),
                service: request.service.clone(),
                deployment: request.deployment.clone(),
                namespace: request.namespace.clone(),
                lookback_minutes: request.minutes,
                errors_before,
                errors_after: errors_before,
                phases,
            };
        }

        let control_plane = self.reporter.control_plane();

        let restart = control_plane
            .execute(ActionRequest::Restart {
                deployment: request.deployment.clone(),
                namespace: request.namespace.clone(),
            })
            .await;
        phases.push(PhaseRecord {
            phase: Phase::Restart,
            outcome: PhaseOutcome::Action { outcome: restart },
        });

        // The wait's own exit code is informational; the post-check decides
        let rollout = control_plane
            .execute(ActionRequest::RolloutStatus {
                deployment: request.deployment.clone(),
                namespace: request.namespace.clone(),
                timeout_seconds: request.timeout_seconds,
            })
            .await;
        phases.push(PhaseRecord {
            phase: Phase::RolloutWait,
            outcome: PhaseOutcome::Action { outcome: rollout },
        });

        let (errors_after, post_check) = self.check_evidence(request, Phase::PostCheck).await;
        phases.push(post_check);

        let status = match errors_after {
            Some(n) if n > 0 => ReconciliationStatus::CompletedWithErrorsStillPresent,
            _ => ReconciliationStatus::Completed,
        };

        let reason = match (errors_before, errors_after) {
            (None, _) => Some("pre-check evidence unavailable, restarted anyway".to_string()),
            (_, None) => Some("post-check evidence unavailable".to_string()),
            _ => None,
        };

        ReconciliationRecord {
            status,
            reason,
            service: request.service.clone(),
            deployment: request.deployment.clone(),
            namespace: request.namespace.clone(),
            lookback_minutes: request.minutes,
            errors_before,
            errors_after,
            phases,
        }
    }

    /// Error count for the target service, or `None` when it cannot be known
    async fn check_evidence(
        &self,
        request: &SelfHealRequest,
        phase: Phase,
    ) -> (Option<u64>, PhaseRecord) {
        let context = match phase {
            Phase::PreCheck => "pre_check",
            _ => "post_check",
        };

        let (errors, outcome) = match self.reporter.error_summary(request.minutes).await {
            Ok(summary) => match summary.errors_for(&request.service) {
                Some(n) => (Some(n), PhaseOutcome::Evidence { summary }),
                None => (
                    None,
                    PhaseOutcome::EvidenceUnavailable {
                        reason: format!("service '{}' is not in the error summary", request.service),
                    },
                ),
            },
            Err(e) => (
                None,
                PhaseOutcome::EvidenceUnavailable {
                    reason: e.to_string(),
                },
            ),
        };

        if let PhaseOutcome::EvidenceUnavailable { reason } = &outcome {
            self.logger.log_evidence_unavailable(context, reason);
        }

        (errors, PhaseRecord { phase, outcome })
    }
}
