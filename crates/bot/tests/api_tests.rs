//! Integration tests for the bot API endpoints

use aiops_bot::api::{create_router, AppState};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use ops_lib::{
    container_metrics::MetricQuery,
    health::{components, HealthRegistry, ServiceInfo},
    ActionOutcome, ActionRequest, Assistant, AssistantConfig, ControlPlane, CpuDatapoint,
    EvidenceClient, EvidenceConfig, LogsBackend, MetricsBackend, OpsError, QueryResult,
    QueryStatus, Reporter, Row, SelfHealEngine, StructuredLogger,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

const PODS_JSON: &str = r#"{"items":[
  {"metadata":{"name":"orders-7d9f"},"status":{"phase":"Running","conditions":[{"type":"Ready","status":"True"}]}},
  {"metadata":{"name":"catalog-5c1a"},"status":{"phase":"Pending","conditions":[{"type":"Ready","status":"False"}]}}
]}"#;

/// Every error-count query answers `errors`; endpoint queries answer two rows
struct FakeLogs {
    errors: Mutex<u64>,
    down: AtomicBool,
}

impl FakeLogs {
    fn new(errors: u64) -> Self {
        Self {
            errors: Mutex::new(errors),
            down: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl LogsBackend for FakeLogs {
    async fn submit(&self, query: &str, _start: i64, _end: i64) -> ops_lib::Result<String> {
        if self.down.load(Ordering::SeqCst) {
            return Err(OpsError::BackendStatus {
                status: 503,
                body: "gateway unavailable".to_string(),
            });
        }
        if query.contains("requestURI") {
            Ok("endpoints".to_string())
        } else if query.contains("stats count() as errors") {
            Ok("count".to_string())
        } else {
            Ok("lines".to_string())
        }
    }

    async fn poll(&self, query_id: &str) -> ops_lib::Result<QueryResult> {
        let row = |pairs: &[(&str, String)]| -> Row {
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect()
        };

        let rows = match query_id {
            "count" => vec![row(&[("errors", self.errors.lock().unwrap().to_string())])],
            "endpoints" => vec![
                row(&[("requestURI", "/orders".to_string()), ("hits", "12".to_string())]),
                row(&[("requestURI", "/catalog".to_string()), ("hits", "4".to_string())]),
            ],
            _ => vec![row(&[
                ("@timestamp", "2024-05-01 12:00:00".to_string()),
                ("@message", "ERROR payment declined".to_string()),
            ])],
        };

        Ok(QueryResult {
            status: QueryStatus::Complete,
            rows,
        })
    }
}

#[derive(Default)]
struct FakeKubectl {
    requests: Mutex<Vec<ActionRequest>>,
}

#[async_trait]
impl ControlPlane for FakeKubectl {
    async fn execute(&self, request: ActionRequest) -> ActionOutcome {
        let command = format!("kubectl {}", request.kubectl_args().join(" "));
        let stdout = match request {
            ActionRequest::GetPods { .. } => PODS_JSON,
            _ => "",
        };
        self.requests.lock().unwrap().push(request);
        ActionOutcome::completed(command, 0, stdout, "")
    }
}

/// Answers CPU queries newest-first and remembers their dimensions
#[derive(Default)]
struct FakeMetrics {
    queries: Mutex<Vec<MetricQuery>>,
}

#[async_trait]
impl MetricsBackend for FakeMetrics {
    async fn average(&self, query: &MetricQuery) -> ops_lib::Result<Vec<CpuDatapoint>> {
        self.queries.lock().unwrap().push(query.clone());
        let points = json!([
            {"timestamp": "2024-05-01T12:02:00Z", "avg": 55.0},
            {"timestamp": "2024-05-01T12:00:00Z", "avg": 20.5},
            {"timestamp": "2024-05-01T12:01:00Z", "avg": 31.0}
        ]);
        Ok(serde_json::from_value(points).unwrap())
    }
}

struct TestApp {
    router: Router,
    state: Arc<AppState>,
    logs: Arc<FakeLogs>,
    kubectl: Arc<FakeKubectl>,
    metrics: Arc<FakeMetrics>,
}

fn setup_test_app(errors: u64) -> TestApp {
    let logs = Arc::new(FakeLogs::new(errors));
    let kubectl = Arc::new(FakeKubectl::default());
    let metrics = Arc::new(FakeMetrics::default());

    let evidence = EvidenceClient::new(
        logs.clone(),
        EvidenceConfig {
            poll_interval: Duration::from_millis(1),
            timeout: None,
        },
    );
    let reporter = Reporter::new(
        evidence,
        kubectl.clone(),
        vec!["orders".into(), "catalog".into(), "users".into()],
    )
    .with_metrics(metrics.clone(), "cloudshop-lite");
    let logger = StructuredLogger::new("aiops-bot-test");
    let engine = SelfHealEngine::new(reporter.clone(), logger.clone());

    let health_registry = HealthRegistry::new(ServiceInfo {
        service: "aiops-bot".to_string(),
        namespace: "cloudshop".to_string(),
        log_group: "/aws/eks/cloudshop-lite/cluster".to_string(),
    });
    let assistant = Assistant::new(reporter, engine, AssistantConfig::default(), logger)
        .with_health(health_registry.clone());

    let state = Arc::new(AppState::new(assistant, health_registry));
    TestApp {
        router: create_router(state.clone()),
        state,
        logs,
        kubectl,
        metrics,
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    send(
        router,
        Request::builder().uri(uri).body(Body::empty()).unwrap(),
    )
    .await
}

async fn post_json(router: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(
        router,
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

async fn post_empty(router: &Router, uri: &str) -> (StatusCode, Value) {
    send(
        router,
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
}

#[tokio::test]
async fn test_health_reports_service_info() {
    let app = setup_test_app(0);

    let (status, health) = get(&app.router, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["service"], "aiops-bot");
    assert_eq!(health["log_group"], "/aws/eks/cloudshop-lite/cluster");
}

#[tokio::test]
async fn test_healthz_returns_503_when_control_plane_unhealthy() {
    let app = setup_test_app(0);
    app.state
        .health_registry
        .set_unhealthy(components::CONTROL_PLANE, "kubectl not found")
        .await;

    let (status, health) = get(&app.router, "/healthz").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(health["status"], "unhealthy");
}

#[tokio::test]
async fn test_readyz_follows_ready_flag() {
    let app = setup_test_app(0);

    let (status, readiness) = get(&app.router, "/readyz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(readiness["ready"], false);

    app.state.health_registry.set_ready(true).await;
    let (status, readiness) = get(&app.router, "/readyz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(readiness["ready"], true);
}

#[tokio::test]
async fn test_metrics_endpoint_serves_text() {
    let app = setup_test_app(0);
    // Touch a metric so the family is registered
    get(&app.router, "/logs/error_summary").await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("aiops_query_latency_seconds"));
}

#[tokio::test]
async fn test_error_summary_has_one_entry_per_service() {
    let app = setup_test_app(3);

    let (status, body) = get(&app.router, "/logs/error_summary?minutes=10").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lookback_minutes"], 10);
    let summary = body["summary"].as_object().unwrap();
    assert_eq!(summary.len(), 3);
    assert!(summary.values().all(|v| v == 3));
}

#[tokio::test]
async fn test_reporting_routes_are_mirrored_under_ai() {
    let app = setup_test_app(0);

    let (status, body) = get(&app.router, "/ai/logs/top_endpoints?limit=2").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["endpoints"][0]["endpoint"], "/orders");
    assert_eq!(body["endpoints"][0]["hits"], 12);

    let (status, _) = get(&app.router, "/ai/health").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_logs_backend_failure_is_bad_gateway_and_degrades() {
    let app = setup_test_app(0);
    app.logs.down.store(true, Ordering::SeqCst);

    let (status, body) = get(&app.router, "/logs/service_errors?service=orders").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("503"));

    let (_, health) = get(&app.router, "/health").await;
    assert_eq!(health["status"], "degraded");

    app.logs.down.store(false, Ordering::SeqCst);
    let (status, _) = get(&app.router, "/logs/errors").await;
    assert_eq!(status, StatusCode::OK);
    let (_, health) = get(&app.router, "/health").await;
    assert_eq!(health["status"], "healthy");
}

#[tokio::test]
async fn test_invalid_service_name_is_bad_request() {
    let app = setup_test_app(0);

    let (status, _) = get(&app.router, "/logs/service_errors?service=orders%2F.*").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, health) = get(&app.router, "/health").await;
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["components"]["logs_backend"]["status"], "healthy");
}

#[tokio::test]
async fn test_cpu_route_defaults_and_sorts_datapoints() {
    let app = setup_test_app(0);

    let (status, body) = get(&app.router, "/metrics/cpu").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["metric"], "pod_cpu_utilization");
    assert_eq!(body["deployment"], "orders-deployment");
    assert_eq!(body["namespace"], "cloudshop");
    let averages: Vec<f64> = body["datapoints"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["avg"].as_f64().unwrap())
        .collect();
    assert_eq!(averages, vec![20.5, 31.0, 55.0]);

    let queries = app.metrics.queries.lock().unwrap();
    assert_eq!(queries[0].period_seconds, 60);
    assert_eq!(queries[0].dimensions[0].value, "cloudshop-lite");
}

#[tokio::test]
async fn test_cpu_route_is_mirrored_under_ai() {
    let app = setup_test_app(0);

    let (status, body) = get(
        &app.router,
        "/ai/metrics/cpu?deployment=catalog-deployment&namespace=staging&period=300&minutes=60",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deployment"], "catalog-deployment");
    assert_eq!(body["namespace"], "staging");
    assert_eq!(body["period_seconds"], 300);
    assert_eq!(body["lookback_minutes"], 60);
}

#[tokio::test]
async fn test_cpu_route_rejects_zero_period() {
    let app = setup_test_app(0);

    let (status, body) = get(&app.router, "/metrics/cpu?period=0").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("period"));
    assert!(app.metrics.queries.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_pod_status_parses_pods() {
    let app = setup_test_app(0);

    let (status, body) = get(&app.router, "/k8s/pod_status").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["namespace"], "cloudshop");
    assert_eq!(body["pods"].as_array().unwrap().len(), 2);
    assert_eq!(body["pods"][1]["ready"], false);
}

#[tokio::test]
async fn test_scale_route_builds_command() {
    let app = setup_test_app(0);

    let (status, body) = post_empty(
        &app.router,
        "/k8s/scale_deployment?deployment=catalog-deployment&replicas=4&namespace=staging",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["command"],
        "kubectl scale deployment/catalog-deployment --replicas=4 -n staging"
    );
    assert_eq!(body["exit_code"], 0);
}

#[tokio::test]
async fn test_self_heal_route_restarts_when_errors_present() {
    let app = setup_test_app(6);

    let (status, record) = post_empty(&app.router, "/k8s/self_heal?minutes=15").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["status"], "completed_with_errors_still_present");
    assert_eq!(record["errors_before"], 6);
    assert_eq!(record["deployment"], "orders-deployment");
    assert_eq!(record["lookback_minutes"], 15);

    let requests = app.kubectl.requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert!(matches!(requests[0], ActionRequest::Restart { .. }));
    assert!(matches!(
        requests[1],
        ActionRequest::RolloutStatus {
            timeout_seconds: 120,
            ..
        }
    ));
}

#[tokio::test]
async fn test_chat_routes_question() {
    let app = setup_test_app(0);

    let (status, body) = post_json(
        &app.router,
        "/ai/chat",
        json!({ "question": "Show error summary for last 45 minutes" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["intent"], "error_summary");
    assert_eq!(body["minutes"], 45);
    assert!(body["answer"].as_str().unwrap().contains("orders: 0 errors ✅"));
}

#[tokio::test]
async fn test_chat_unknown_question_is_help_not_error() {
    let app = setup_test_app(0);

    let (status, body) = post_json(
        &app.router,
        "/ai/chat",
        json!({ "question": "what's the weather" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["intent"], "unknown");
    assert!(body["answer"].as_str().unwrap().contains("Try questions like"));
    assert!(app.kubectl.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_chat_with_backend_down_still_answers() {
    let app = setup_test_app(0);
    app.logs.down.store(true, Ordering::SeqCst);

    let (status, body) = post_json(
        &app.router,
        "/ai/chat",
        json!({ "question": "overall error summary" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["error"].is_string());
}

#[tokio::test]
async fn test_tool_listing_and_call() {
    let app = setup_test_app(2);

    let (status, tools) = get(&app.router, "/tools").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tools["tools"].as_array().unwrap().len(), 8);

    let (status, response) = post_json(
        &app.router,
        "/tools/call",
        json!({ "name": "error_summary", "arguments": { "minutes": 5 } }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["isError"], false);
    assert_eq!(response["structuredContent"]["summary"]["users"], 2);
    assert_eq!(response["structuredContent"]["lookback_minutes"], 5);
}

#[tokio::test]
async fn test_unknown_tool_is_error_response() {
    let app = setup_test_app(0);

    let (status, response) = post_json(
        &app.router,
        "/ai/tools/call",
        json!({ "name": "drop_database", "arguments": {} }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["isError"], true);
    assert!(app.kubectl.requests.lock().unwrap().is_empty());
}
