//! Human-readable answers for each operation

use crate::models::{
    ActionOutcome, ErrorSummary, PodStatusReport, ReconciliationRecord, ReconciliationStatus,
    ServiceErrors, TopEndpoints,
};

const MAX_ERROR_LINES: usize = 3;
const MAX_MESSAGE_CHARS: usize = 120;

pub fn error_summary(summary: &ErrorSummary) -> String {
    let minutes = summary.lookback_minutes;

    if summary.summary.is_empty() {
        return format!(
            "I checked the logs for the last {} minutes, but no services are configured to summarise.",
            minutes
        );
    }

    let lines: Vec<String> = summary
        .summary
        .iter()
        .map(|(service, count)| match count {
            0 => format!("- {}: 0 errors ✅", service),
            n => format!("- {}: {} errors ⚠️", service, n),
        })
        .collect();

    format!(
        "Here's the error summary for the last {} minutes:\n\n{}\n\nThis lets you quickly see which service is noisy.",
        minutes,
        lines.join("\n")
    )
}

pub fn service_errors(errors: &ServiceErrors) -> String {
    let service = &errors.service;
    let minutes = errors.lookback_minutes;

    if errors.results.is_empty() {
        return format!(
            "I checked the logs for **{}** over the last {} minutes and didn't see any matching error entries. Looks clean ✅",
            service, minutes
        );
    }

    let mut lines = vec![
        format!(
            "I inspected recent errors for **{}** in the last {} minutes.",
            service, minutes
        ),
        format!(
            "I found **{}** recent error log entries. Here are the most recent ones:",
            errors.results.len()
        ),
        String::new(),
    ];

    for (i, row) in errors.results.iter().take(MAX_ERROR_LINES).enumerate() {
        let timestamp = row
            .get("@timestamp")
            .map(String::as_str)
            .unwrap_or("unknown time");
        let message = row.get("@message").map(|m| m.trim()).unwrap_or("");
        lines.push(format!("{}. [{}] {}", i + 1, timestamp, truncate(message)));
    }

    lines.push("\nYou can dig deeper by looking at the full log entries.".to_string());
    lines.join("\n")
}

fn truncate(message: &str) -> String {
    if message.chars().count() > MAX_MESSAGE_CHARS {
        let head: String = message.chars().take(MAX_MESSAGE_CHARS).collect();
        format!("{}...", head)
    } else {
        message.to_string()
    }
}

pub fn top_endpoints(top: &TopEndpoints) -> String {
    if top.endpoints.is_empty() {
        return format!(
            "In the last {} minutes I didn't see any HTTP traffic in the logs.",
            top.lookback_minutes
        );
    }

    let lines: Vec<String> = top
        .endpoints
        .iter()
        .map(|e| format!("- `{}` → {} hits", e.endpoint, e.hits))
        .collect();

    format!(
        "Here are the **top {} endpoints by traffic** in the last {} minutes:\n\n{}\n\nThis helps you see which parts of CloudShop are getting the most load.",
        top.endpoints.len(),
        top.lookback_minutes,
        lines.join("\n")
    )
}

pub fn pod_status(report: &PodStatusReport) -> String {
    let header = format!(
        "I checked the Kubernetes pods in the **{}** namespace.\n\n",
        report.namespace
    );

    if !report.outcome.succeeded() {
        return format!(
            "{}I couldn't list the pods.\n\n{}",
            header,
            command_lines(&report.outcome)
        );
    }

    if let Some(parse_error) = &report.parse_error {
        return format!("{}{}", header, parse_error);
    }

    let not_ready: Vec<String> = report
        .not_ready()
        .map(|p| format!("- {} (phase = {})", p.name, p.phase))
        .collect();

    if not_ready.is_empty() {
        format!("{}✅ All pods appear to be Running and Ready.", header)
    } else {
        format!(
            "{}Some pods are **not Ready**:\n{}\n\nYou may want to investigate these pods further.",
            header,
            not_ready.join("\n")
        )
    }
}

fn exit_line(outcome: &ActionOutcome) -> String {
    match (outcome.exit_code, &outcome.error) {
        (Some(code), _) => format!("- Exit code: {}\n", code),
        (None, Some(error)) => format!("- Error: {}\n", error),
        (None, None) => "- Exit code: unknown\n".to_string(),
    }
}

/// Command, exit code and stderr; invocation failures show the error instead
fn command_lines(outcome: &ActionOutcome) -> String {
    let mut text = format!("- Command: `{}`\n{}", outcome.command, exit_line(outcome));
    if !outcome.stderr.is_empty() {
        text.push_str(&format!("- stderr: {}\n", outcome.stderr));
    }
    text
}

pub fn restart(deployment: &str, namespace: &str, outcome: &ActionOutcome) -> String {
    format!(
        "I triggered a rollout restart for the **{}** deployment in the `{}` namespace.\n\n{}",
        deployment,
        namespace,
        command_lines(outcome)
    )
}

pub fn scale(deployment: &str, namespace: &str, replicas: u32, outcome: &ActionOutcome) -> String {
    format!(
        "I scaled the **{}** deployment in `{}` to **{}** replicas.\n\n{}",
        deployment,
        namespace,
        replicas,
        command_lines(outcome)
    )
}

pub fn rollout_status(deployment: &str, namespace: &str, outcome: &ActionOutcome) -> String {
    let mut text = format!(
        "I checked the rollout status for **{}** in `{}`.\n\n- Command: `{}`\n{}",
        deployment,
        namespace,
        outcome.command,
        exit_line(outcome)
    );
    if !outcome.stdout.is_empty() {
        text.push_str(&format!("- Output:\n{}\n", outcome.stdout));
    }
    if !outcome.stderr.is_empty() {
        text.push_str(&format!("\n- stderr:\n{}\n", outcome.stderr));
    }
    text
}

fn count_or_unavailable(count: Option<u64>) -> String {
    count
        .map(|n| n.to_string())
        .unwrap_or_else(|| "unavailable".to_string())
}

pub fn self_heal(record: &ReconciliationRecord) -> String {
    let service = &record.service;
    let closing = match record.status {
        ReconciliationStatus::NoActionNeeded => format!(
            "{} had no errors in the last {} minutes, so nothing was restarted.",
            service, record.lookback_minutes
        ),
        _ => format!(
            "Behind the scenes, this restarted the {} deployment, waited for the rollout, and then re-checked the error summary.",
            record.deployment
        ),
    };

    format!(
        "I ran the **self-heal playbook** for the {} service:\n\n- Initial {} error count: {}\n- Final {} error count: {}\n- Overall self-heal status: **{}**\n\n{}",
        service,
        service,
        count_or_unavailable(record.errors_before),
        service,
        count_or_unavailable(record.errors_after),
        record.status,
        closing
    )
}

pub fn evidence_unavailable(minutes: u32, error: &str) -> String {
    format!(
        "I couldn't reach the logs backend for the last {} minutes, so I can't answer that right now.\n\n- Error: {}",
        minutes, error
    )
}

pub fn oversized_number(value: &str, parameter: &str) -> String {
    format!(
        "{} is too large to use as {}, so I didn't run anything.",
        value, parameter
    )
}

pub const HELP_TEXT: &str = "I didn't quite understand that request yet.

Here are the AI-Ops tools I support:

- error_summary: Get error counts per service for the last N minutes.
  (wraps GET /logs/error_summary?minutes=...)
- top_endpoints: Get top endpoints by traffic for the last N minutes.
  (wraps GET /logs/top_endpoints?minutes=&limit=)
- service_errors: Get error events for a specific service.
  (wraps GET /logs/service_errors?service=&minutes=)
- restart_deployment: Restart a Kubernetes deployment.
  (kubectl rollout restart deployment/<deployment> -n <namespace>)
- scale_deployment: Scale a deployment to N replicas.
  (kubectl scale deployment/<deployment> --replicas=<replicas> -n <namespace>)
- rollout_status: Get rollout status for a deployment.
  (kubectl rollout status deployment/<deployment> -n <namespace> --timeout=<seconds>s)
- pod_status: Get status of all pods in a namespace.
  (kubectl get pods -n <namespace> -o json)
- self_heal: Automatic self-heal for the default service.
  (check errors → restart → wait for rollout → re-check errors)

Try questions like:
- \"Show error summary for last 30 minutes\"
- \"Show orders service errors\"
- \"What are the top endpoints?\"
- \"Check pod status\"
- \"Restart orders deployment\"
- \"Scale orders deployment to 3 replicas\"
- \"Check rollout status of orders deployment\"
- \"Self heal orders\"
";
