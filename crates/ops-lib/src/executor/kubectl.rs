//! kubectl-backed control-plane executor

use super::{ActionRequest, ControlPlane};
use crate::models::ActionOutcome;
use crate::observability::{OpsMetrics, StructuredLogger};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Upper bound for actions that do not carry their own timeout
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

/// Extra time granted past an action's own timeout before the child is killed
const KILL_GRACE: Duration = Duration::from_secs(30);

/// Runs control-plane actions through the kubectl binary
#[derive(Clone)]
pub struct KubectlExecutor {
    binary: String,
    command_timeout: Duration,
    metrics: OpsMetrics,
    logger: StructuredLogger,
}

impl KubectlExecutor {
    pub fn new(binary: impl Into<String>, logger: StructuredLogger) -> Self {
        Self {
            binary: binary.into(),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            metrics: OpsMetrics::new(),
            logger,
        }
    }

    /// Override the bound for actions without their own timeout
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Check that the binary can be invoked at all
    pub async fn check_client(&self) -> ActionOutcome {
        let args = vec!["version".to_string(), "--client".to_string()];
        self.run(&args, self.command_timeout).await
    }

    async fn run(&self, args: &[String], limit: Duration) -> ActionOutcome {
        let command = format!("{} {}", self.binary, args.join(" "));
        debug!(command = %command, "Running control-plane command");

        let mut cmd = Command::new(&self.binary);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        match tokio::time::timeout(limit, cmd.output()).await {
            Ok(Ok(output)) => ActionOutcome::completed(
                command,
                // Terminated by signal
                output.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&output.stdout).trim(),
                String::from_utf8_lossy(&output.stderr).trim(),
            ),
            Ok(Err(e)) => ActionOutcome::invocation_failed(command, e.to_string()),
            Err(_) => ActionOutcome::invocation_failed(
                command,
                format!("command did not exit within {}s and was killed", limit.as_secs()),
            ),
        }
    }
}

#[async_trait]
impl ControlPlane for KubectlExecutor {
    async fn execute(&self, request: ActionRequest) -> ActionOutcome {
        let limit = request
            .own_timeout()
            .map(|t| t.saturating_add(KILL_GRACE))
            .unwrap_or(self.command_timeout);

        let outcome = self.run(&request.kubectl_args(), limit).await;

        self.metrics
            .inc_actions(request.verb().as_str(), outcome.succeeded());
        self.logger
            .log_action(request.verb().as_str(), request.namespace(), &outcome);

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executor(binary: &str) -> KubectlExecutor {
        KubectlExecutor::new(binary, StructuredLogger::new("test"))
    }

    #[tokio::test]
    async fn test_captures_stdout_and_exit_code() {
        // echo stands in for kubectl and prints the arguments it received
        let outcome = executor("echo")
            .execute(ActionRequest::Restart {
                deployment: "orders-deployment".to_string(),
                namespace: "cloudshop".to_string(),
            })
            .await;

        assert_eq!(outcome.exit_code, Some(0));
        assert_eq!(
            outcome.stdout,
            "rollout restart deployment/orders-deployment -n cloudshop"
        );
        assert_eq!(
            outcome.command,
            "echo rollout restart deployment/orders-deployment -n cloudshop"
        );
        assert!(outcome.succeeded());
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_an_outcome() {
        let outcome = executor("false")
            .execute(ActionRequest::GetPods {
                namespace: "cloudshop".to_string(),
            })
            .await;

        assert_eq!(outcome.exit_code, Some(1));
        assert!(outcome.error.is_none());
        assert!(!outcome.succeeded());
    }

    #[tokio::test]
    async fn test_missing_binary_is_an_invocation_failure() {
        let outcome = executor("/nonexistent/kubectl")
            .execute(ActionRequest::Scale {
                deployment: "orders-deployment".to_string(),
                namespace: "cloudshop".to_string(),
                replicas: 2,
            })
            .await;

        assert!(outcome.exit_code.is_none());
        assert!(outcome.error.is_some());
        assert!(outcome.command.ends_with("--replicas=2 -n cloudshop"));
    }

    #[tokio::test]
    async fn test_hung_command_is_killed() {
        let exec = executor("sleep").with_command_timeout(Duration::from_millis(50));
        let outcome = exec.run(&["5".to_string()], exec.command_timeout).await;

        assert!(outcome.exit_code.is_none());
        assert!(outcome.error.unwrap().contains("did not exit"));
    }

    #[tokio::test]
    async fn test_unbounded_rollout_timeout_still_runs() {
        let outcome = executor("echo")
            .execute(ActionRequest::RolloutStatus {
                deployment: "orders-deployment".to_string(),
                namespace: "cloudshop".to_string(),
                timeout_seconds: u64::MAX,
            })
            .await;

        assert_eq!(outcome.exit_code, Some(0));
        assert!(outcome
            .stdout
            .ends_with(&format!("--timeout={}s", u64::MAX)));
    }

    #[tokio::test]
    async fn test_client_check_runs_version() {
        let outcome = executor("echo").check_client().await;
        assert_eq!(outcome.stdout, "version --client");
    }
}
