//! HTTP API: reporting, actions, chat, tools, health and metrics
//!
//! `/metrics` is the bot's own Prometheus scrape; `/metrics/cpu` reads pod
//! CPU from the monitoring backend.
//!
//! Every route is also served under `/ai`.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use ops_lib::{
    health::{ComponentStatus, HealthRegistry},
    tool_definitions, ActionRequest, Assistant, OpsError, SelfHealRequest,
};
use prometheus::{Encoder, TextEncoder};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub assistant: Assistant,
    pub health_registry: HealthRegistry,
}

impl AppState {
    pub fn new(assistant: Assistant, health_registry: HealthRegistry) -> Self {
        Self {
            assistant,
            health_registry,
        }
    }

    fn namespace(&self, namespace: Option<String>) -> String {
        namespace.unwrap_or_else(|| self.assistant.config().namespace.clone())
    }
}

/// Evidence failure on a direct reporting route
pub struct ApiError(OpsError);

impl From<OpsError> for ApiError {
    fn from(e: OpsError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            OpsError::InvalidServiceName(_) | OpsError::InvalidPeriod => {
                StatusCode::BAD_REQUEST
            }
            OpsError::MetricsNotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::BAD_GATEWAY,
        };
        warn!(error = %self.0, status = status.as_u16(), "Reporting request failed");
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Service summary; always 200
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.health_registry.health().await)
}

/// Liveness - 200 unless a dependency is unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still answering
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness - 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
struct WindowParams {
    minutes: Option<u32>,
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ServiceErrorsParams {
    service: String,
    minutes: Option<u32>,
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct CpuParams {
    deployment: Option<String>,
    namespace: Option<String>,
    period: Option<u32>,
    minutes: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct NamespaceParams {
    namespace: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeploymentParams {
    deployment: String,
    namespace: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ScaleParams {
    deployment: String,
    replicas: u32,
    namespace: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RolloutParams {
    deployment: String,
    namespace: Option<String>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SelfHealParams {
    service: Option<String>,
    deployment: Option<String>,
    namespace: Option<String>,
    minutes: Option<u32>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub question: String,
}

#[derive(Debug, Deserialize)]
pub struct ToolCallRequest {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

async fn recent_errors(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WindowParams>,
) -> ApiResult<ops_lib::ErrorEvents> {
    let result = state
        .assistant
        .reporter()
        .recent_errors(params.minutes.unwrap_or(15), params.limit.unwrap_or(50))
        .await;
    state.health_registry.record_evidence(&result).await;
    Ok(Json(result?))
}

async fn error_summary(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WindowParams>,
) -> ApiResult<ops_lib::ErrorSummary> {
    let result = state
        .assistant
        .reporter()
        .error_summary(params.minutes.unwrap_or(30))
        .await;
    state.health_registry.record_evidence(&result).await;
    Ok(Json(result?))
}

async fn service_errors(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ServiceErrorsParams>,
) -> ApiResult<ops_lib::ServiceErrors> {
    let result = state
        .assistant
        .reporter()
        .service_errors(
            &params.service,
            params.minutes.unwrap_or(30),
            params.limit.unwrap_or(50),
        )
        .await;
    state.health_registry.record_evidence(&result).await;
    Ok(Json(result?))
}

async fn top_endpoints(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WindowParams>,
) -> ApiResult<ops_lib::TopEndpoints> {
    let result = state
        .assistant
        .reporter()
        .top_endpoints(params.minutes.unwrap_or(30), params.limit.unwrap_or(10))
        .await;
    state.health_registry.record_evidence(&result).await;
    Ok(Json(result?))
}

async fn cpu_utilization(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CpuParams>,
) -> ApiResult<ops_lib::CpuUtilization> {
    let deployment = params
        .deployment
        .unwrap_or_else(|| state.assistant.config().self_heal_deployment());
    let namespace = state.namespace(params.namespace);
    let cpu = state
        .assistant
        .reporter()
        .cpu_utilization(
            &deployment,
            &namespace,
            params.minutes.unwrap_or(15),
            params.period.unwrap_or(60),
        )
        .await?;
    Ok(Json(cpu))
}

async fn pod_status(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NamespaceParams>,
) -> Json<ops_lib::PodStatusReport> {
    let namespace = state.namespace(params.namespace);
    Json(state.assistant.reporter().pod_status(&namespace).await)
}

async fn execute(state: &AppState, request: ActionRequest) -> Json<ops_lib::ActionOutcome> {
    info!(verb = %request.verb(), namespace = %request.namespace(), "Executing action");
    Json(
        state
            .assistant
            .reporter()
            .control_plane()
            .execute(request)
            .await,
    )
}

async fn restart_deployment(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DeploymentParams>,
) -> Json<ops_lib::ActionOutcome> {
    let request = ActionRequest::Restart {
        deployment: params.deployment,
        namespace: state.namespace(params.namespace),
    };
    execute(&state, request).await
}

async fn scale_deployment(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ScaleParams>,
) -> Json<ops_lib::ActionOutcome> {
    let request = ActionRequest::Scale {
        deployment: params.deployment,
        namespace: state.namespace(params.namespace),
        replicas: params.replicas,
    };
    execute(&state, request).await
}

async fn rollout_status(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RolloutParams>,
) -> Json<ops_lib::ActionOutcome> {
    let request = ActionRequest::RolloutStatus {
        deployment: params.deployment,
        namespace: state.namespace(params.namespace),
        timeout_seconds: params
            .timeout_seconds
            .unwrap_or(state.assistant.config().rollout_timeout_secs),
    };
    execute(&state, request).await
}

async fn self_heal(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SelfHealParams>,
) -> Json<ops_lib::ReconciliationRecord> {
    let defaults = state.assistant.default_self_heal();
    let service = params.service.unwrap_or(defaults.service);
    let deployment = params
        .deployment
        .unwrap_or_else(|| format!("{}-deployment", service));

    let request = SelfHealRequest {
        service,
        deployment,
        namespace: params.namespace.unwrap_or(defaults.namespace),
        minutes: params.minutes.unwrap_or(defaults.minutes),
        timeout_seconds: params.timeout_seconds.unwrap_or(defaults.timeout_seconds),
    };

    Json(state.assistant.engine().run(request).await)
}

async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Json<ops_lib::ChatResponse> {
    Json(state.assistant.route(&request.question).await)
}

async fn list_tools() -> Json<Value> {
    Json(tool_definitions())
}

async fn call_tool(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ToolCallRequest>,
) -> Json<ops_lib::ToolResponse> {
    Json(
        state
            .assistant
            .call_tool(&request.name, request.arguments)
            .await,
    )
}

fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/metrics/cpu", get(cpu_utilization))
        .route("/logs/errors", get(recent_errors))
        .route("/logs/error_summary", get(error_summary))
        .route("/logs/service_errors", get(service_errors))
        .route("/logs/top_endpoints", get(top_endpoints))
        .route("/k8s/pod_status", get(pod_status))
        .route("/k8s/restart_deployment", post(restart_deployment))
        .route("/k8s/scale_deployment", post(scale_deployment))
        .route("/k8s/rollout_status", get(rollout_status))
        .route("/k8s/self_heal", post(self_heal))
        .route("/tools", get(list_tools))
        .route("/tools/call", post(call_tool))
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(routes())
        .nest("/ai", routes())
        .route("/ai/chat", post(chat))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
