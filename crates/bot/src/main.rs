//! AI-Ops bot - answers questions about the CloudShop fleet and repairs it
//!
//! This binary runs as a Deployment next to the services it watches, reading
//! evidence from the logs gateway and acting through kubectl.

use aiops_bot::{api, config::BotConfig};
use anyhow::{Context, Result};
use ops_lib::{
    health::{components, HealthRegistry},
    Assistant, EvidenceClient, HttpLogsBackend, HttpMetricsBackend, KubectlExecutor, Reporter,
    SelfHealEngine, StructuredLogger,
};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const BOT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting aiops-bot");

    let config = BotConfig::load()?;
    info!(
        namespace = %config.namespace,
        logs_endpoint = %config.logs_endpoint,
        metrics_endpoint = %config.metrics_endpoint,
        services = ?config.services,
        "Bot configured"
    );

    let health_registry = HealthRegistry::new(config.service_info());

    let logger = StructuredLogger::new("aiops-bot");
    logger.log_startup(BOT_VERSION, &config.namespace, &config.log_group);

    let backend = HttpLogsBackend::new(&config.logs_endpoint, config.log_group.clone())
        .context("Failed to create logs backend client")?;
    let evidence = EvidenceClient::new(Arc::new(backend), config.evidence_config());

    let executor = KubectlExecutor::new(config.kubectl_path.clone(), logger.clone());

    // kubectl must at least start; the cluster itself may come and go
    let check = executor.check_client().await;
    if check.succeeded() {
        info!(command = %check.command, "Control plane client available");
    } else {
        let reason = check
            .error
            .clone()
            .unwrap_or_else(|| check.stderr.clone());
        warn!(command = %check.command, reason = %reason, "Control plane client unavailable");
        health_registry
            .set_unhealthy(components::CONTROL_PLANE, reason)
            .await;
    }

    let metrics_backend = HttpMetricsBackend::new(&config.metrics_endpoint)
        .context("Failed to create metrics backend client")?;

    let reporter = Reporter::new(evidence, Arc::new(executor), config.services.clone())
        .with_metrics(Arc::new(metrics_backend), config.cluster_name.clone());
    let engine = SelfHealEngine::new(reporter.clone(), logger.clone());
    let assistant = Assistant::new(reporter, engine, config.assistant_config(), logger.clone())
        .with_health(health_registry.clone());

    let app_state = Arc::new(api::AppState::new(assistant, health_registry.clone()));

    health_registry.set_ready(true).await;

    let api_handle = tokio::spawn(api::serve(config.port, app_state));

    tokio::select! {
        result = api_handle => {
            match result {
                Ok(Ok(())) => warn!("API server exited"),
                Ok(Err(e)) => error!(error = %e, "API server failed"),
                Err(e) => error!(error = %e, "API server task panicked"),
            }
            logger.log_shutdown("API server stopped");
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for shutdown signal")?;
            logger.log_shutdown("SIGINT received");
        }
    }

    info!("Shutting down");

    Ok(())
}
