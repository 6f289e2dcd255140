//! Natural-language front end
//!
//! Routes a free-text question to one operation, runs it and renders a
//! friendly answer next to the structured data it was built from. Failures
//! to reach the logs backend become an answer, never an error.

pub mod intent;
mod render;

pub use intent::{Intent, IntentParams};
pub use render::HELP_TEXT;

use crate::executor::ActionRequest;
use crate::health::HealthRegistry;
use crate::observability::{OpsMetrics, StructuredLogger};
use crate::reconcile::{SelfHealEngine, SelfHealRequest};
use crate::reporting::Reporter;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Defaults applied to routed questions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantConfig {
    pub namespace: String,
    /// Result limit for service errors and top endpoints
    pub result_limit: u32,
    pub rollout_timeout_secs: u64,
    pub self_heal_service: String,
    pub self_heal_minutes: u32,
    pub self_heal_timeout_secs: u64,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            namespace: "cloudshop".to_string(),
            result_limit: 5,
            rollout_timeout_secs: 120,
            self_heal_service: "orders".to_string(),
            self_heal_minutes: 30,
            self_heal_timeout_secs: 120,
        }
    }
}

impl AssistantConfig {
    pub fn self_heal_deployment(&self) -> String {
        format!("{}-deployment", self.self_heal_service)
    }
}

/// Answer to a chat question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub question: String,
    pub intent: Intent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    pub answer: String,
    pub data: Value,
}

impl ChatResponse {
    fn new(question: &str, intent: Intent, reply: Reply) -> Self {
        Self {
            question: question.to_string(),
            intent,
            minutes: None,
            service: None,
            deployment: None,
            replicas: None,
            endpoint: intent.endpoint().map(str::to_string),
            answer: reply.answer,
            data: reply.data,
        }
    }
}

/// Rendered answer plus the data behind it
#[derive(Debug, Clone)]
pub(crate) struct Reply {
    pub answer: String,
    pub data: Value,
    /// Evidence could not be gathered or the request was refused
    pub failed: bool,
}

impl Reply {
    fn ok(answer: String, data: Value) -> Self {
        Self {
            answer,
            data,
            failed: false,
        }
    }

    fn rejected(value: &str, parameter: &str) -> Self {
        let answer = render::oversized_number(value, parameter);
        Self {
            data: json!({ "error": answer }),
            answer,
            failed: true,
        }
    }

    fn evidence_unavailable(minutes: u32, error: String) -> Self {
        Self {
            answer: render::evidence_unavailable(minutes, &error),
            data: json!({ "error": error }),
            failed: true,
        }
    }
}

fn to_data<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| json!({ "error": e.to_string() }))
}

/// Question router over the reporter and the self-heal engine
#[derive(Clone)]
pub struct Assistant {
    reporter: Reporter,
    engine: SelfHealEngine,
    config: AssistantConfig,
    health: Option<HealthRegistry>,
    metrics: OpsMetrics,
    logger: StructuredLogger,
}

impl Assistant {
    pub fn new(
        reporter: Reporter,
        engine: SelfHealEngine,
        config: AssistantConfig,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            reporter,
            engine,
            config,
            health: None,
            metrics: OpsMetrics::new(),
            logger,
        }
    }

    /// Report logs backend reachability to `health`
    pub fn with_health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    pub fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    pub fn engine(&self) -> &SelfHealEngine {
        &self.engine
    }

    /// Answer a free-text question
    pub async fn route(&self, question: &str) -> ChatResponse {
        let (intent, params) = intent::classify(
            question,
            self.reporter.services(),
            &self.config.self_heal_service,
        );

        self.metrics.inc_intents(intent.as_str());
        self.logger.log_intent(intent.as_str(), question);

        let namespace = self.config.namespace.clone();
        let limit = self.config.result_limit;

        if let Some(value) = &params.oversized {
            let parameter = match intent {
                Intent::ErrorSummary | Intent::ServiceErrors | Intent::TopEndpoints => {
                    Some("a lookback in minutes")
                }
                Intent::ScaleDeployment => Some("a replica count"),
                _ => None,
            };
            if let Some(parameter) = parameter {
                return ChatResponse::new(question, intent, Reply::rejected(value, parameter));
            }
        }

        match intent {
            Intent::ErrorSummary => {
                let reply = self.error_summary(params.minutes).await;
                ChatResponse {
                    minutes: Some(params.minutes),
                    ..ChatResponse::new(question, intent, reply)
                }
            }
            Intent::ServiceErrors => {
                let service = params.service.clone().unwrap_or_default();
                let reply = self.service_errors(&service, params.minutes, limit).await;
                ChatResponse {
                    minutes: Some(params.minutes),
                    service: Some(service),
                    ..ChatResponse::new(question, intent, reply)
                }
            }
            Intent::TopEndpoints => {
                let reply = self.top_endpoints(params.minutes, limit).await;
                ChatResponse {
                    minutes: Some(params.minutes),
                    ..ChatResponse::new(question, intent, reply)
                }
            }
            Intent::PodStatus => {
                let reply = self.pod_status(&namespace).await;
                ChatResponse::new(question, intent, reply)
            }
            Intent::RestartDeployment => {
                let reply = self.restart(&params.deployment, &namespace).await;
                ChatResponse {
                    deployment: Some(params.deployment),
                    ..ChatResponse::new(question, intent, reply)
                }
            }
            Intent::ScaleDeployment => {
                let reply = self
                    .scale(&params.deployment, &namespace, params.replicas)
                    .await;
                ChatResponse {
                    deployment: Some(params.deployment),
                    replicas: Some(params.replicas),
                    ..ChatResponse::new(question, intent, reply)
                }
            }
            Intent::RolloutStatus => {
                let reply = self
                    .rollout_status(
                        &params.deployment,
                        &namespace,
                        self.config.rollout_timeout_secs,
                    )
                    .await;
                ChatResponse {
                    deployment: Some(params.deployment),
                    ..ChatResponse::new(question, intent, reply)
                }
            }
            Intent::SelfHeal => {
                let request = self.default_self_heal();
                let reply = self.self_heal(request.clone()).await;
                ChatResponse {
                    minutes: Some(request.minutes),
                    service: Some(request.service),
                    deployment: Some(request.deployment),
                    ..ChatResponse::new(question, intent, reply)
                }
            }
            Intent::Unknown => ChatResponse::new(
                question,
                intent,
                Reply::ok(HELP_TEXT.to_string(), json!({})),
            ),
        }
    }

    /// Self-heal request built from the configured defaults
    pub fn default_self_heal(&self) -> SelfHealRequest {
        SelfHealRequest {
            service: self.config.self_heal_service.clone(),
            deployment: self.config.self_heal_deployment(),
            namespace: self.config.namespace.clone(),
            minutes: self.config.self_heal_minutes,
            timeout_seconds: self.config.self_heal_timeout_secs,
        }
    }

    async fn record_evidence<T>(&self, result: &crate::Result<T>) {
        if let Some(health) = &self.health {
            health.record_evidence(result).await;
        }
    }

    pub(crate) async fn error_summary(&self, minutes: u32) -> Reply {
        let result = self.reporter.error_summary(minutes).await;
        self.record_evidence(&result).await;
        match result {
            Ok(summary) => Reply::ok(render::error_summary(&summary), to_data(&summary)),
            Err(e) => Reply::evidence_unavailable(minutes, e.to_string()),
        }
    }

    pub(crate) async fn service_errors(&self, service: &str, minutes: u32, limit: u32) -> Reply {
        let result = self.reporter.service_errors(service, minutes, limit).await;
        self.record_evidence(&result).await;
        match result {
            Ok(errors) => Reply::ok(render::service_errors(&errors), to_data(&errors)),
            Err(e) => Reply::evidence_unavailable(minutes, e.to_string()),
        }
    }

    pub(crate) async fn top_endpoints(&self, minutes: u32, limit: u32) -> Reply {
        let result = self.reporter.top_endpoints(minutes, limit).await;
        self.record_evidence(&result).await;
        match result {
            Ok(top) => Reply::ok(render::top_endpoints(&top), to_data(&top)),
            Err(e) => Reply::evidence_unavailable(minutes, e.to_string()),
        }
    }

    pub(crate) async fn pod_status(&self, namespace: &str) -> Reply {
        let report = self.reporter.pod_status(namespace).await;
        Reply::ok(render::pod_status(&report), to_data(&report))
    }

    pub(crate) async fn restart(&self, deployment: &str, namespace: &str) -> Reply {
        let outcome = self
            .reporter
            .control_plane()
            .execute(ActionRequest::Restart {
                deployment: deployment.to_string(),
                namespace: namespace.to_string(),
            })
            .await;
        Reply::ok(
            render::restart(deployment, namespace, &outcome),
            to_data(&outcome),
        )
    }

    pub(crate) async fn scale(&self, deployment: &str, namespace: &str, replicas: u32) -> Reply {
        let outcome = self
            .reporter
            .control_plane()
            .execute(ActionRequest::Scale {
                deployment: deployment.to_string(),
                namespace: namespace.to_string(),
                replicas,
            })
            .await;
        Reply::ok(
            render::scale(deployment, namespace, replicas, &outcome),
            to_data(&outcome),
        )
    }

    pub(crate) async fn rollout_status(
        &self,
        deployment: &str,
        namespace: &str,
        timeout_seconds: u64,
    ) -> Reply {
        let outcome = self
            .reporter
            .control_plane()
            .execute(ActionRequest::RolloutStatus {
                deployment: deployment.to_string(),
                namespace: namespace.to_string(),
                timeout_seconds,
            })
            .await;
        Reply::ok(
            render::rollout_status(deployment, namespace, &outcome),
            to_data(&outcome),
        )
    }

    pub(crate) async fn self_heal(&self, request: SelfHealRequest) -> Reply {
        let record = self.engine.run(request).await;
        Reply::ok(render::self_heal(&record), to_data(&record))
    }
}
