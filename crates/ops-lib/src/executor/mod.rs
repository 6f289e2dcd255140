//! Control-plane actions against deployments and pods
//!
//! Every action produces an [`ActionOutcome`]; a command that runs and exits
//! non-zero is an outcome, not an error.

mod kubectl;

pub use kubectl::KubectlExecutor;

use crate::models::ActionOutcome;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Control-plane action verbs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionVerb {
    Restart,
    Scale,
    RolloutStatus,
    GetPods,
}

impl ActionVerb {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionVerb::Restart => "restart",
            ActionVerb::Scale => "scale",
            ActionVerb::RolloutStatus => "rollout-status",
            ActionVerb::GetPods => "get-pods",
        }
    }
}

impl std::fmt::Display for ActionVerb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single control-plane action with its target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionRequest {
    Restart {
        deployment: String,
        namespace: String,
    },
    Scale {
        deployment: String,
        namespace: String,
        replicas: u32,
    },
    RolloutStatus {
        deployment: String,
        namespace: String,
        timeout_seconds: u64,
    },
    GetPods {
        namespace: String,
    },
}

impl ActionRequest {
    pub fn verb(&self) -> ActionVerb {
        match self {
            ActionRequest::Restart { .. } => ActionVerb::Restart,
            ActionRequest::Scale { .. } => ActionVerb::Scale,
            ActionRequest::RolloutStatus { .. } => ActionVerb::RolloutStatus,
            ActionRequest::GetPods { .. } => ActionVerb::GetPods,
        }
    }

    pub fn namespace(&self) -> &str {
        match self {
            ActionRequest::Restart { namespace, .. }
            | ActionRequest::Scale { namespace, .. }
            | ActionRequest::RolloutStatus { namespace, .. }
            | ActionRequest::GetPods { namespace } => namespace,
        }
    }

    /// kubectl arguments for this action
    pub fn kubectl_args(&self) -> Vec<String> {
        match self {
            ActionRequest::Restart {
                deployment,
                namespace,
            } => vec![
                "rollout".to_string(),
                "restart".to_string(),
                format!("deployment/{}", deployment),
                "-n".to_string(),
                namespace.clone(),
            ],
            ActionRequest::Scale {
                deployment,
                namespace,
                replicas,
            } => vec![
                "scale".to_string(),
                format!("deployment/{}", deployment),
                format!("--replicas={}", replicas),
                "-n".to_string(),
                namespace.clone(),
            ],
            ActionRequest::RolloutStatus {
                deployment,
                namespace,
                timeout_seconds,
            } => vec![
                "rollout".to_string(),
                "status".to_string(),
                format!("deployment/{}", deployment),
                "-n".to_string(),
                namespace.clone(),
                format!("--timeout={}s", timeout_seconds),
            ],
            ActionRequest::GetPods { namespace } => vec![
                "get".to_string(),
                "pods".to_string(),
                "-n".to_string(),
                namespace.clone(),
                "-o".to_string(),
                "json".to_string(),
            ],
        }
    }

    /// How long the action itself is allowed to block, if it says so
    pub fn own_timeout(&self) -> Option<Duration> {
        match self {
            ActionRequest::RolloutStatus {
                timeout_seconds, ..
            } => Some(Duration::from_secs(*timeout_seconds)),
            _ => None,
        }
    }
}

/// Control-plane executor seam
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Run an action and capture its outcome; never fails for a non-zero exit
    async fn execute(&self, request: ActionRequest) -> ActionOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restart_args() {
        let req = ActionRequest::Restart {
            deployment: "orders-deployment".to_string(),
            namespace: "cloudshop".to_string(),
        };
        assert_eq!(
            req.kubectl_args().join(" "),
            "rollout restart deployment/orders-deployment -n cloudshop"
        );
        assert_eq!(req.verb(), ActionVerb::Restart);
        assert!(req.own_timeout().is_none());
    }

    #[test]
    fn test_scale_args() {
        let req = ActionRequest::Scale {
            deployment: "catalog-deployment".to_string(),
            namespace: "cloudshop".to_string(),
            replicas: 3,
        };
        assert_eq!(
            req.kubectl_args().join(" "),
            "scale deployment/catalog-deployment --replicas=3 -n cloudshop"
        );
    }

    #[test]
    fn test_rollout_status_args_carry_timeout() {
        let req = ActionRequest::RolloutStatus {
            deployment: "orders-deployment".to_string(),
            namespace: "cloudshop".to_string(),
            timeout_seconds: 120,
        };
        assert_eq!(
            req.kubectl_args().join(" "),
            "rollout status deployment/orders-deployment -n cloudshop --timeout=120s"
        );
        assert_eq!(req.own_timeout(), Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_get_pods_args() {
        let req = ActionRequest::GetPods {
            namespace: "cloudshop".to_string(),
        };
        assert_eq!(req.kubectl_args().join(" "), "get pods -n cloudshop -o json");
        assert_eq!(req.namespace(), "cloudshop");
        assert_eq!(req.verb().to_string(), "get-pods");
    }
}
