//! Deployment action commands

use anyhow::Result;
use colored::Colorize;
use ops_lib::{
    ActionOutcome, Phase, PhaseOutcome, PodStatusReport, ReconciliationRecord,
    ReconciliationStatus,
};
use serde_json::json;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{
    color_status, format_optional_count, print_error, print_info, print_json, print_success,
    print_table, print_warning, OutputFormat,
};

#[derive(Tabled)]
struct PodRow {
    #[tabled(rename = "Pod")]
    name: String,
    #[tabled(rename = "Phase")]
    phase: String,
    #[tabled(rename = "Ready")]
    ready: String,
}

#[derive(Tabled)]
struct PhaseRow {
    #[tabled(rename = "Phase")]
    phase: String,
    #[tabled(rename = "Result")]
    result: String,
}

/// Self-heal overrides; unset fields take the bot's defaults
pub struct SelfHealArgs {
    pub service: Option<String>,
    pub deployment: Option<String>,
    pub namespace: Option<String>,
    pub minutes: Option<u32>,
    pub timeout: Option<u64>,
}

/// Show pod readiness in a namespace
pub async fn show_pods(
    client: &ApiClient,
    namespace: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let report: PodStatusReport = client
        .get("k8s/pod_status", &[("namespace", namespace)])
        .await?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            println!("{}", format!("Pods in {}", report.namespace).bold());
            if !report.outcome.succeeded() {
                print_outcome(&report.outcome);
                return Ok(());
            }
            if let Some(err) = &report.parse_error {
                print_warning(&format!("Could not parse pod list: {}", err));
                return Ok(());
            }

            let rows = report
                .pods
                .iter()
                .map(|p| PodRow {
                    name: p.name.clone(),
                    phase: color_status(&p.phase),
                    ready: if p.ready {
                        "yes".green().to_string()
                    } else {
                        "no".red().to_string()
                    },
                })
                .collect();
            print_table(rows, "No pods found");

            let not_ready = report.not_ready().count();
            if not_ready > 0 {
                print_warning(&format!("{} pod(s) not ready", not_ready));
            }
        }
    }

    Ok(())
}

/// Restart a deployment
pub async fn restart(
    client: &ApiClient,
    deployment: &str,
    namespace: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let outcome: ActionOutcome = client
        .post(
            "k8s/restart_deployment",
            &[
                ("deployment", Some(deployment.to_string())),
                ("namespace", namespace),
            ],
            &json!({}),
        )
        .await?;

    show_outcome(&outcome, format)
}

/// Scale a deployment
pub async fn scale(
    client: &ApiClient,
    deployment: &str,
    replicas: u32,
    namespace: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let outcome: ActionOutcome = client
        .post(
            "k8s/scale_deployment",
            &[
                ("deployment", Some(deployment.to_string())),
                ("replicas", Some(replicas.to_string())),
                ("namespace", namespace),
            ],
            &json!({}),
        )
        .await?;

    show_outcome(&outcome, format)
}

/// Wait for a rollout to finish
pub async fn rollout(
    client: &ApiClient,
    deployment: &str,
    namespace: Option<String>,
    timeout: Option<u64>,
    format: OutputFormat,
) -> Result<()> {
    let outcome: ActionOutcome = client
        .get(
            "k8s/rollout_status",
            &[
                ("deployment", Some(deployment.to_string())),
                ("namespace", namespace),
                ("timeout_seconds", timeout.map(|t| t.to_string())),
            ],
        )
        .await?;

    show_outcome(&outcome, format)
}

/// Run the self-heal loop and show each phase
pub async fn self_heal(client: &ApiClient, args: SelfHealArgs, format: OutputFormat) -> Result<()> {
    print_info("Running self-heal, this waits for the rollout...");

    let record: ReconciliationRecord = client
        .post(
            "k8s/self_heal",
            &[
                ("service", args.service),
                ("deployment", args.deployment),
                ("namespace", args.namespace),
                ("minutes", args.minutes.map(|m| m.to_string())),
                ("timeout_seconds", args.timeout.map(|t| t.to_string())),
            ],
            &json!({}),
        )
        .await?;

    match format {
        OutputFormat::Json => print_json(&record)?,
        OutputFormat::Table => {
            println!("{}", "Self-heal".bold());
            println!("{}", "=".repeat(60));
            println!("Service:    {}", record.service.cyan());
            println!(
                "Deployment: {} ({})",
                record.deployment.cyan(),
                record.namespace
            );
            println!("Window:     last {} minutes", record.lookback_minutes);
            println!("Status:     {}", color_status(record.status.as_str()));
            println!(
                "Errors:     {} before, {} after",
                format_optional_count(record.errors_before),
                format_optional_count(record.errors_after)
            );
            if let Some(reason) = &record.reason {
                println!("Reason:     {}", reason);
            }
            println!();

            let rows = record
                .phases
                .iter()
                .map(|p| PhaseRow {
                    phase: phase_name(p.phase).to_string(),
                    result: phase_result(&record.service, &p.outcome),
                })
                .collect();
            print_table(rows, "No phases recorded");

            match record.status {
                ReconciliationStatus::NoActionNeeded => print_success("Nothing to fix"),
                ReconciliationStatus::Completed => print_success("Deployment restarted"),
                ReconciliationStatus::CompletedWithErrorsStillPresent => {
                    print_warning("Restarted, but errors are still being logged")
                }
            }
        }
    }

    Ok(())
}

fn show_outcome(outcome: &ActionOutcome, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(outcome)?,
        OutputFormat::Table => print_outcome(outcome),
    }
    Ok(())
}

fn print_outcome(outcome: &ActionOutcome) {
    println!("{} {}", "$".dimmed(), outcome.command);
    if let Some(err) = &outcome.error {
        print_error(&format!("Could not run command: {}", err));
        return;
    }
    if !outcome.stdout.trim().is_empty() {
        println!("{}", outcome.stdout.trim_end());
    }
    if !outcome.stderr.trim().is_empty() {
        eprintln!("{}", outcome.stderr.trim_end().yellow());
    }
    match outcome.exit_code {
        Some(0) => print_success("Done"),
        Some(code) => print_error(&format!("Exited with code {}", code)),
        None => print_error("No exit code reported"),
    }
}

fn phase_name(phase: Phase) -> &'static str {
    match phase {
        Phase::PreCheck => "pre-check",
        Phase::Restart => "restart",
        Phase::RolloutWait => "rollout wait",
        Phase::PostCheck => "post-check",
    }
}

fn phase_result(service: &str, outcome: &PhaseOutcome) -> String {
    match outcome {
        PhaseOutcome::Evidence { summary } => {
            format_optional_count(summary.errors_for(service)) + " errors"
        }
        PhaseOutcome::EvidenceUnavailable { reason } => {
            format!("{} ({})", "unavailable".yellow(), reason)
        }
        PhaseOutcome::Action { outcome } => match (outcome.exit_code, &outcome.error) {
            (_, Some(err)) => format!("{} {}", "failed:".red(), err),
            (Some(0), None) => "exit 0".green().to_string(),
            (Some(code), None) => format!("exit {}", code).red().to_string(),
            (None, None) => "no exit code".yellow().to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ops_lib::ErrorSummary;
    use std::collections::BTreeMap;

    #[test]
    fn test_phase_result_formats() {
        colored::control::set_override(false);

        let mut counts = BTreeMap::new();
        counts.insert("orders".to_string(), 4);
        let evidence = PhaseOutcome::Evidence {
            summary: ErrorSummary {
                lookback_minutes: 30,
                summary: counts,
            },
        };
        assert_eq!(phase_result("orders", &evidence), "4 errors");

        let failed = PhaseOutcome::Action {
            outcome: ActionOutcome::completed("kubectl rollout status", 1, "", "timed out"),
        };
        assert_eq!(phase_result("orders", &failed), "exit 1");

        let unavailable = PhaseOutcome::EvidenceUnavailable {
            reason: "logs backend down".to_string(),
        };
        assert_eq!(
            phase_result("orders", &unavailable),
            "unavailable (logs backend down)"
        );
    }
}
