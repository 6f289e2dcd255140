//! Rule-based intent classification
//!
//! Questions are lowercased and matched against an ordered rule table; the
//! first rule whose predicate holds decides the intent. Parameters (lookback,
//! service, replica count, deployment) are extracted once up front.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

pub const DEFAULT_MINUTES: u32 = 30;
pub const DEFAULT_REPLICAS: u32 = 2;

/// Operation a question was routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    ErrorSummary,
    ServiceErrors,
    TopEndpoints,
    PodStatus,
    RestartDeployment,
    ScaleDeployment,
    RolloutStatus,
    SelfHeal,
    Unknown,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::ErrorSummary => "error_summary",
            Intent::ServiceErrors => "service_errors",
            Intent::TopEndpoints => "top_endpoints",
            Intent::PodStatus => "pod_status",
            Intent::RestartDeployment => "restart_deployment",
            Intent::ScaleDeployment => "scale_deployment",
            Intent::RolloutStatus => "rollout_status",
            Intent::SelfHeal => "self_heal",
            Intent::Unknown => "unknown",
        }
    }

    /// HTTP route serving the same operation
    pub fn endpoint(&self) -> Option<&'static str> {
        match self {
            Intent::ErrorSummary => Some("/ai/logs/error_summary"),
            Intent::ServiceErrors => Some("/ai/logs/service_errors"),
            Intent::TopEndpoints => Some("/ai/logs/top_endpoints"),
            Intent::PodStatus => Some("/ai/k8s/pod_status"),
            Intent::RestartDeployment => Some("/ai/k8s/restart_deployment"),
            Intent::ScaleDeployment => Some("/ai/k8s/scale_deployment"),
            Intent::RolloutStatus => Some("/ai/k8s/rollout_status"),
            Intent::SelfHeal => Some("/ai/k8s/self_heal"),
            Intent::Unknown => None,
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters pulled out of a question
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentParams {
    pub minutes: u32,
    pub service: Option<String>,
    pub replicas: u32,
    /// Best guess at the deployment the question is about
    pub deployment: String,
    /// Number in the question that fits neither minutes nor replicas
    pub oversized: Option<String>,
}

/// Lowercased question plus what was resolved from it
struct Question<'a> {
    text: String,
    service: Option<&'a str>,
    self_heal_service: &'a str,
}

impl Question<'_> {
    fn has(&self, needle: &str) -> bool {
        self.text.contains(needle)
    }

    fn has_any(&self, needles: &[&str]) -> bool {
        needles.iter().any(|n| self.text.contains(n))
    }
}

type Rule = (Intent, fn(&Question<'_>) -> bool);

/// Checked top to bottom; anything unmatched is `Unknown`
static RULES: [Rule; 8] = [
    (Intent::ErrorSummary, asks_error_summary),
    (Intent::ServiceErrors, asks_service_errors),
    (Intent::TopEndpoints, asks_top_endpoints),
    (Intent::PodStatus, asks_pod_status),
    (Intent::RestartDeployment, asks_restart),
    (Intent::ScaleDeployment, asks_scale),
    (Intent::RolloutStatus, asks_rollout_status),
    (Intent::SelfHeal, asks_self_heal),
];

fn asks_error_summary(q: &Question<'_>) -> bool {
    q.has("error") && q.has_any(&["summary", "overall", "system"])
}

fn asks_service_errors(q: &Question<'_>) -> bool {
    q.has("error") && q.service.is_some()
}

fn asks_top_endpoints(q: &Question<'_>) -> bool {
    q.has("top") && q.has_any(&["endpoint", "traffic", "requests"])
}

fn asks_pod_status(q: &Question<'_>) -> bool {
    q.has_any(&["pod", "kubernetes", "k8s"]) && q.has_any(&["status", "health", "ready"])
}

fn asks_restart(q: &Question<'_>) -> bool {
    q.has("restart") && q.has_any(&["deployment", "service"])
}

fn asks_scale(q: &Question<'_>) -> bool {
    q.has("scale") && q.has_any(&["deployment", "service"])
}

fn asks_rollout_status(q: &Question<'_>) -> bool {
    q.has_any(&["rollout status", "deployment status"])
}

fn asks_self_heal(q: &Question<'_>) -> bool {
    q.has_any(&["self heal", "self-heal"])
        || q.has(&format!("fix {}", q.self_heal_service))
        || q.has(&format!("restart {}", q.self_heal_service))
}

fn minutes_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(\d+)\s*(min|mins|minute|minutes)?").expect("valid minutes pattern")
    })
}

fn replicas_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(\d+)\s*(replica|replicas)?").expect("valid replicas pattern")
    })
}

/// An integer in the question too large for the parameter it sets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutOfRange(pub String);

fn first_number(pattern: &Regex, text: &str) -> Option<Result<u32, OutOfRange>> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().parse().map_err(|_| OutOfRange(m.as_str().to_string())))
}

/// Lookback in minutes; the first number in the text, the default only when there is none
pub fn extract_minutes(text: &str) -> Result<u32, OutOfRange> {
    first_number(minutes_pattern(), text).unwrap_or(Ok(DEFAULT_MINUTES))
}

/// Replica count; the first number in the text, the default only when there is none
pub fn extract_replicas(text: &str) -> Result<u32, OutOfRange> {
    first_number(replicas_pattern(), text).unwrap_or(Ok(DEFAULT_REPLICAS))
}

/// First known service named in the text, checked in configured order
///
/// A service also matches through its singular form followed by "service",
/// so "user service" finds `users`.
pub fn extract_service<'a>(text: &str, services: &'a [String]) -> Option<&'a str> {
    services
        .iter()
        .find(|name| {
            text.contains(name.as_str())
                || name
                    .strip_suffix('s')
                    .map(|singular| text.contains(&format!("{} service", singular)))
                    .unwrap_or(false)
        })
        .map(String::as_str)
}

/// `<service>-deployment`, falling back to the first configured service
pub fn guess_deployment(service: Option<&str>, services: &[String]) -> String {
    let target = service
        .or_else(|| services.first().map(String::as_str))
        .unwrap_or("orders");
    format!("{}-deployment", target)
}

/// Route a question to an intent and pull out its parameters
pub fn classify(question: &str, services: &[String], self_heal_service: &str) -> (Intent, IntentParams) {
    let text = question.trim().to_lowercase();
    let service = extract_service(&text, services);

    let minutes = extract_minutes(&text);
    let replicas = extract_replicas(&text);
    let oversized = minutes
        .as_ref()
        .err()
        .or(replicas.as_ref().err())
        .map(|OutOfRange(n)| n.clone());

    let params = IntentParams {
        minutes: minutes.unwrap_or(DEFAULT_MINUTES),
        service: service.map(str::to_string),
        replicas: replicas.unwrap_or(DEFAULT_REPLICAS),
        deployment: guess_deployment(service, services),
        oversized,
    };

    let q = Question {
        text,
        service,
        self_heal_service,
    };

    let intent = RULES
        .iter()
        .find(|(_, matches)| matches(&q))
        .map(|(intent, _)| *intent)
        .unwrap_or(Intent::Unknown);

    (intent, params)
}
