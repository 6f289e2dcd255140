//! Bot configuration

use anyhow::{Context, Result};
use ops_lib::{AssistantConfig, EvidenceConfig, ServiceInfo};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Polling faster than this would hammer the logs backend
const MIN_POLL_INTERVAL_MS: u64 = 1000;

/// Bot configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// HTTP listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Namespace the assistant operates on
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Base URL of the logs gateway
    #[serde(default = "default_logs_endpoint")]
    pub logs_endpoint: String,

    #[serde(default = "default_log_group")]
    pub log_group: String,

    /// Base URL of the monitoring gateway serving container metrics
    #[serde(default = "default_metrics_endpoint")]
    pub metrics_endpoint: String,

    /// Cluster dimension on container metrics
    #[serde(default = "default_cluster_name")]
    pub cluster_name: String,

    /// Known services, in name-matching priority order
    #[serde(default = "default_services")]
    pub services: Vec<String>,

    #[serde(default = "default_kubectl_path")]
    pub kubectl_path: String,

    /// Delay between query polls in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Abandon queries still running after this many seconds; unset waits forever
    #[serde(default)]
    pub query_timeout_secs: Option<u64>,

    #[serde(default = "default_rollout_timeout_secs")]
    pub rollout_timeout_secs: u64,

    /// Limit used by chat answers for service errors and top endpoints
    #[serde(default = "default_result_limit")]
    pub result_limit: u32,

    #[serde(default = "default_self_heal_service")]
    pub self_heal_service: String,

    #[serde(default = "default_self_heal_minutes")]
    pub self_heal_minutes: u32,

    #[serde(default = "default_self_heal_timeout_secs")]
    pub self_heal_timeout_secs: u64,
}

fn default_port() -> u16 {
    8080
}

fn default_namespace() -> String {
    "cloudshop".to_string()
}

fn default_logs_endpoint() -> String {
    "http://logs-gateway:9000".to_string()
}

fn default_log_group() -> String {
    "/aws/eks/cloudshop-lite/cluster".to_string()
}

fn default_metrics_endpoint() -> String {
    "http://metrics-gateway:9000".to_string()
}

fn default_cluster_name() -> String {
    "cloudshop-lite".to_string()
}

fn default_services() -> Vec<String> {
    vec![
        "orders".to_string(),
        "catalog".to_string(),
        "users".to_string(),
    ]
}

fn default_kubectl_path() -> String {
    "kubectl".to_string()
}

fn default_poll_interval_ms() -> u64 {
    MIN_POLL_INTERVAL_MS
}

fn default_rollout_timeout_secs() -> u64 {
    120
}

fn default_result_limit() -> u32 {
    5
}

fn default_self_heal_service() -> String {
    "orders".to_string()
}

fn default_self_heal_minutes() -> u32 {
    30
}

fn default_self_heal_timeout_secs() -> u64 {
    120
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            namespace: default_namespace(),
            logs_endpoint: default_logs_endpoint(),
            log_group: default_log_group(),
            metrics_endpoint: default_metrics_endpoint(),
            cluster_name: default_cluster_name(),
            services: default_services(),
            kubectl_path: default_kubectl_path(),
            poll_interval_ms: default_poll_interval_ms(),
            query_timeout_secs: None,
            rollout_timeout_secs: default_rollout_timeout_secs(),
            result_limit: default_result_limit(),
            self_heal_service: default_self_heal_service(),
            self_heal_minutes: default_self_heal_minutes(),
            self_heal_timeout_secs: default_self_heal_timeout_secs(),
        }
    }
}

impl BotConfig {
    /// Load from `AIOPS_*` environment variables and the file named by `AIOPS_CONFIG`
    pub fn load() -> Result<Self> {
        let file = std::env::var_os("AIOPS_CONFIG").map(PathBuf::from);
        Self::load_from(file.as_deref())
    }

    /// Load with an optional config file; environment variables take precedence
    pub fn load_from(file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("AIOPS")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("services")
                .try_parsing(true),
        );

        let config: BotConfig = builder
            .build()
            .context("Failed to read bot configuration")?
            .try_deserialize()
            .context("Invalid bot configuration")?;

        if config.services.is_empty() {
            anyhow::bail!("At least one service must be configured");
        }

        Ok(config)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(MIN_POLL_INTERVAL_MS))
    }

    pub fn evidence_config(&self) -> EvidenceConfig {
        EvidenceConfig {
            poll_interval: self.poll_interval(),
            timeout: self.query_timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn assistant_config(&self) -> AssistantConfig {
        AssistantConfig {
            namespace: self.namespace.clone(),
            result_limit: self.result_limit,
            rollout_timeout_secs: self.rollout_timeout_secs,
            self_heal_service: self.self_heal_service.clone(),
            self_heal_minutes: self.self_heal_minutes,
            self_heal_timeout_secs: self.self_heal_timeout_secs,
        }
    }

    pub fn service_info(&self) -> ServiceInfo {
        ServiceInfo {
            service: "aiops-bot".to_string(),
            namespace: self.namespace.clone(),
            log_group: self.log_group.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = BotConfig::default();

        assert_eq!(config.port, 8080);
        assert_eq!(config.services, vec!["orders", "catalog", "users"]);
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert!(config.evidence_config().timeout.is_none());
        assert_eq!(config.assistant_config().self_heal_deployment(), "orders-deployment");
        assert_eq!(config.cluster_name, "cloudshop-lite");
    }

    #[test]
    fn test_poll_interval_is_clamped() {
        let config = BotConfig {
            poll_interval_ms: 10,
            ..BotConfig::default()
        };
        assert_eq!(config.poll_interval(), Duration::from_millis(1000));

        let config = BotConfig {
            poll_interval_ms: 2500,
            ..BotConfig::default()
        };
        assert_eq!(config.poll_interval(), Duration::from_millis(2500));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            r#"
namespace = "shop-staging"
services = ["payments", "orders"]
query_timeout_secs = 90
self_heal_service = "payments"
cluster_name = "cloudshop-staging"
"#
        )
        .unwrap();

        let config = BotConfig::load_from(Some(file.path())).unwrap();

        assert_eq!(config.namespace, "shop-staging");
        assert_eq!(config.services, vec!["payments", "orders"]);
        assert_eq!(
            config.evidence_config().timeout,
            Some(Duration::from_secs(90))
        );
        assert_eq!(config.service_info().namespace, "shop-staging");
        assert_eq!(config.port, 8080);
        assert_eq!(config.cluster_name, "cloudshop-staging");
        assert_eq!(config.metrics_endpoint, "http://metrics-gateway:9000");
    }

    #[test]
    fn test_empty_service_list_is_rejected() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(file, "services = []").unwrap();

        assert!(BotConfig::load_from(Some(file.path())).is_err());
    }
}
