//! Operations library for the CloudShop AI-Ops assistant
//!
//! This crate provides the core functionality for:
//! - Evidence queries against the log-analytics backend
//! - Control-plane actions (restart, scale, rollout status, pod listing)
//! - Per-service error summaries and read-only reports
//! - Pod CPU utilisation from the monitoring backend
//! - The self-heal reconciliation engine
//! - Rule-based intent routing for natural-language questions
//! - A tool-call adapter for agent clients
//! - Health checks and observability

pub mod assistant;
pub mod container_metrics;
pub mod error;
pub mod evidence;
pub mod executor;
pub mod health;
pub mod models;
pub mod observability;
pub mod reconcile;
pub mod reporting;
pub mod tools;

pub use assistant::{Assistant, AssistantConfig, ChatResponse, Intent, IntentParams};
pub use container_metrics::{HttpMetricsBackend, MetricsBackend};
pub use error::{OpsError, Result};
pub use evidence::{EvidenceClient, EvidenceConfig, HttpLogsBackend, LogsBackend};
pub use executor::{ActionRequest, ActionVerb, ControlPlane, KubectlExecutor};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
    ServiceInfo,
};
pub use models::*;
pub use observability::{OpsMetrics, StructuredLogger};
pub use reconcile::{SelfHealEngine, SelfHealRequest};
pub use reporting::Reporter;
pub use tools::{tool_definitions, ToolCall, ToolContent, ToolResponse};
