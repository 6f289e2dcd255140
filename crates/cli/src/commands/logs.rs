//! Error report commands

use anyhow::Result;
use colored::Colorize;
use ops_lib::{ErrorSummary, ServiceErrors, TopEndpoints};
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{color_count, print_json, print_table, truncate, OutputFormat};

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Service")]
    service: String,
    #[tabled(rename = "Errors")]
    errors: String,
}

#[derive(Tabled)]
struct ErrorLineRow {
    #[tabled(rename = "Timestamp")]
    timestamp: String,
    #[tabled(rename = "Message")]
    message: String,
}

#[derive(Tabled)]
struct EndpointRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "Endpoint")]
    endpoint: String,
    #[tabled(rename = "Hits")]
    hits: u64,
}

/// Show error counts per service
pub async fn show_summary(client: &ApiClient, minutes: u32, format: OutputFormat) -> Result<()> {
    let summary: ErrorSummary = client
        .get("logs/error_summary", &[("minutes", Some(minutes.to_string()))])
        .await?;

    match format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Table => {
            println!(
                "{}",
                format!("Error summary (last {} minutes)", summary.lookback_minutes).bold()
            );
            let rows = summary
                .summary
                .iter()
                .map(|(service, errors)| SummaryRow {
                    service: service.cyan().to_string(),
                    errors: color_count(*errors),
                })
                .collect();
            print_table(rows, "No services configured");
            println!("\nTotal: {} errors", summary.total());
        }
    }

    Ok(())
}

/// Show recent error lines for one service
pub async fn show_service_errors(
    client: &ApiClient,
    service: &str,
    minutes: u32,
    limit: u32,
    format: OutputFormat,
) -> Result<()> {
    let errors: ServiceErrors = client
        .get(
            "logs/service_errors",
            &[
                ("service", Some(service.to_string())),
                ("minutes", Some(minutes.to_string())),
                ("limit", Some(limit.to_string())),
            ],
        )
        .await?;

    match format {
        OutputFormat::Json => print_json(&errors)?,
        OutputFormat::Table => {
            println!(
                "{}",
                format!(
                    "Errors for {} (last {} minutes, query {})",
                    errors.service, errors.lookback_minutes, errors.status
                )
                .bold()
            );
            let rows = errors
                .results
                .iter()
                .map(|row| ErrorLineRow {
                    timestamp: row.get("@timestamp").cloned().unwrap_or_default(),
                    message: truncate(row.get("@message").map(String::as_str).unwrap_or(""), 120),
                })
                .collect();
            print_table(rows, "No errors found");
        }
    }

    Ok(())
}

/// Show the busiest endpoints
pub async fn show_top_endpoints(
    client: &ApiClient,
    minutes: u32,
    limit: u32,
    format: OutputFormat,
) -> Result<()> {
    let top: TopEndpoints = client
        .get(
            "logs/top_endpoints",
            &[
                ("minutes", Some(minutes.to_string())),
                ("limit", Some(limit.to_string())),
            ],
        )
        .await?;

    match format {
        OutputFormat::Json => print_json(&top)?,
        OutputFormat::Table => {
            println!(
                "{}",
                format!("Top endpoints (last {} minutes)", top.lookback_minutes).bold()
            );
            let rows = top
                .endpoints
                .iter()
                .enumerate()
                .map(|(i, e)| EndpointRow {
                    rank: i + 1,
                    endpoint: e.endpoint.clone(),
                    hits: e.hits,
                })
                .collect();
            print_table(rows, "No endpoint traffic found");
        }
    }

    Ok(())
}
