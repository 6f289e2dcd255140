//! Tool-call adapter for agent clients
//!
//! Each operation is exposed as a named tool taking JSON arguments. A call
//! runs the same code path as the chat router and returns the same
//! structured data, so an agent and a human see identical results.

use crate::assistant::intent::DEFAULT_MINUTES;
use crate::assistant::{Assistant, Reply};
use crate::reconcile::SelfHealRequest;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const DEFAULT_TOP_LIMIT: u32 = 5;
const DEFAULT_SERVICE_ERRORS_LIMIT: u32 = 50;
const DEFAULT_ROLLOUT_TIMEOUT_SECS: u64 = 60;

/// A tool invocation, `{"name": ..., "arguments": {...}}`
///
/// Omitted optional arguments take the assistant's configured defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "arguments", rename_all = "snake_case")]
pub enum ToolCall {
    ErrorSummary {
        minutes: Option<u32>,
    },
    TopEndpoints {
        minutes: Option<u32>,
        limit: Option<u32>,
    },
    ServiceErrors {
        service: String,
        minutes: Option<u32>,
        limit: Option<u32>,
    },
    PodStatus {
        namespace: Option<String>,
    },
    RestartDeployment {
        deployment: String,
        namespace: Option<String>,
    },
    ScaleDeployment {
        deployment: String,
        replicas: u32,
        namespace: Option<String>,
    },
    RolloutStatus {
        deployment: String,
        namespace: Option<String>,
        timeout_seconds: Option<u64>,
    },
    SelfHeal {
        service: Option<String>,
        deployment: Option<String>,
        namespace: Option<String>,
        minutes: Option<u32>,
        timeout_seconds: Option<u64>,
    },
}

impl ToolCall {
    /// Parse a call from its name and raw arguments
    pub fn parse(name: &str, arguments: Value) -> serde_json::Result<Self> {
        let arguments = if arguments.is_null() {
            json!({})
        } else {
            arguments
        };
        serde_json::from_value(json!({ "name": name, "arguments": arguments }))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolContent {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

/// Result of a tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    pub is_error: bool,
    pub content: Vec<ToolContent>,
    #[serde(default)]
    pub structured_content: Value,
}

impl ToolResponse {
    fn from_reply(reply: Reply) -> Self {
        Self {
            is_error: reply.failed,
            content: vec![ToolContent {
                kind: "text".to_string(),
                text: reply.answer,
            }],
            structured_content: reply.data,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            is_error: true,
            content: vec![ToolContent {
                kind: "text".to_string(),
                text: message.clone(),
            }],
            structured_content: json!({ "error": message }),
        }
    }
}

/// Tool descriptors with JSON-schema arguments
pub fn tool_definitions() -> Value {
    json!({
        "tools": [
            {
                "name": "error_summary",
                "description": "Get error counts per service for the last N minutes.",
                "inputSchema": {
                    "type": "object",
                    "properties": { "minutes": { "type": "integer", "minimum": 0 } }
                }
            },
            {
                "name": "top_endpoints",
                "description": "Get top endpoints by traffic for the last N minutes.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "minutes": { "type": "integer", "minimum": 0 },
                        "limit": { "type": "integer", "minimum": 1 }
                    }
                }
            },
            {
                "name": "service_errors",
                "description": "Get error events for a specific service over the last N minutes.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "service": { "type": "string" },
                        "minutes": { "type": "integer", "minimum": 0 },
                        "limit": { "type": "integer", "minimum": 1 }
                    },
                    "required": ["service"]
                }
            },
            {
                "name": "pod_status",
                "description": "Get status of all pods in a namespace.",
                "inputSchema": {
                    "type": "object",
                    "properties": { "namespace": { "type": "string" } }
                }
            },
            {
                "name": "restart_deployment",
                "description": "Restart a Kubernetes deployment in the given namespace.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "deployment": { "type": "string" },
                        "namespace": { "type": "string" }
                    },
                    "required": ["deployment"]
                }
            },
            {
                "name": "scale_deployment",
                "description": "Scale a Kubernetes deployment to the desired number of replicas.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "deployment": { "type": "string" },
                        "replicas": { "type": "integer", "minimum": 0 },
                        "namespace": { "type": "string" }
                    },
                    "required": ["deployment", "replicas"]
                }
            },
            {
                "name": "rollout_status",
                "description": "Get rollout status for a deployment.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "deployment": { "type": "string" },
                        "namespace": { "type": "string" },
                        "timeout_seconds": { "type": "integer", "minimum": 1 }
                    },
                    "required": ["deployment"]
                }
            },
            {
                "name": "self_heal",
                "description": "Check errors, restart the deployment, wait for the rollout and re-check errors.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "service": { "type": "string" },
                        "deployment": { "type": "string" },
                        "namespace": { "type": "string" },
                        "minutes": { "type": "integer", "minimum": 0 },
                        "timeout_seconds": { "type": "integer", "minimum": 1 }
                    }
                }
            }
        ]
    })
}

impl Assistant {
    /// Run a tool by name; unknown tools and bad arguments are `is_error`
    pub async fn call_tool(&self, name: &str, arguments: Value) -> ToolResponse {
        match ToolCall::parse(name, arguments) {
            Ok(call) => self.dispatch(call).await,
            Err(e) => ToolResponse::error(format!("invalid call to tool '{}': {}", name, e)),
        }
    }

    pub async fn dispatch(&self, call: ToolCall) -> ToolResponse {
        let config = self.config();
        let namespace = |ns: Option<String>| ns.unwrap_or_else(|| config.namespace.clone());

        let reply = match call {
            ToolCall::ErrorSummary { minutes } => {
                self.error_summary(minutes.unwrap_or(DEFAULT_MINUTES)).await
            }
            ToolCall::TopEndpoints { minutes, limit } => {
                self.top_endpoints(
                    minutes.unwrap_or(DEFAULT_MINUTES),
                    limit.unwrap_or(DEFAULT_TOP_LIMIT),
                )
                .await
            }
            ToolCall::ServiceErrors {
                service,
                minutes,
                limit,
            } => {
                self.service_errors(
                    &service,
                    minutes.unwrap_or(DEFAULT_MINUTES),
                    limit.unwrap_or(DEFAULT_SERVICE_ERRORS_LIMIT),
                )
                .await
            }
            ToolCall::PodStatus { namespace: ns } => self.pod_status(&namespace(ns)).await,
            ToolCall::RestartDeployment {
                deployment,
                namespace: ns,
            } => self.restart(&deployment, &namespace(ns)).await,
            ToolCall::ScaleDeployment {
                deployment,
                replicas,
                namespace: ns,
            } => self.scale(&deployment, &namespace(ns), replicas).await,
            ToolCall::RolloutStatus {
                deployment,
                namespace: ns,
                timeout_seconds,
            } => {
                self.rollout_status(
                    &deployment,
                    &namespace(ns),
                    timeout_seconds.unwrap_or(DEFAULT_ROLLOUT_TIMEOUT_SECS),
                )
                .await
            }
            ToolCall::SelfHeal {
                service,
                deployment,
                namespace: ns,
                minutes,
                timeout_seconds,
            } => {
                let defaults = self.default_self_heal();
                let service = service.unwrap_or(defaults.service);
                let deployment = deployment.unwrap_or_else(|| format!("{}-deployment", service));
                self.self_heal(SelfHealRequest {
                    service,
                    deployment,
                    namespace: ns.unwrap_or(defaults.namespace),
                    minutes: minutes.unwrap_or(defaults.minutes),
                    timeout_seconds: timeout_seconds.unwrap_or(defaults.timeout_seconds),
                })
                .await
            }
        };

        ToolResponse::from_reply(reply)
    }
}
