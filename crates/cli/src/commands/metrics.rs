//! Container metric commands

use anyhow::Result;
use colored::Colorize;
use ops_lib::CpuUtilization;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{print_json, print_table, OutputFormat};

#[derive(Tabled)]
struct CpuRow {
    #[tabled(rename = "Timestamp")]
    timestamp: String,
    #[tabled(rename = "Avg CPU %")]
    avg: String,
}

fn color_utilization(avg: f64) -> String {
    let text = format!("{:.2}", avg);
    if avg >= 80.0 {
        text.red().to_string()
    } else if avg >= 50.0 {
        text.yellow().to_string()
    } else {
        text.green().to_string()
    }
}

/// Show average pod CPU for a deployment
pub async fn show_cpu(
    client: &ApiClient,
    deployment: Option<String>,
    namespace: Option<String>,
    minutes: u32,
    period: u32,
    format: OutputFormat,
) -> Result<()> {
    let cpu: CpuUtilization = client
        .get(
            "metrics/cpu",
            &[
                ("deployment", deployment),
                ("namespace", namespace),
                ("minutes", Some(minutes.to_string())),
                ("period", Some(period.to_string())),
            ],
        )
        .await?;

    match format {
        OutputFormat::Json => print_json(&cpu)?,
        OutputFormat::Table => {
            println!(
                "{}",
                format!(
                    "CPU for {}/{} (last {} minutes, {}s periods)",
                    cpu.namespace, cpu.deployment, cpu.lookback_minutes, cpu.period_seconds
                )
                .bold()
            );
            let rows = cpu
                .datapoints
                .iter()
                .map(|p| CpuRow {
                    timestamp: p.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                    avg: color_utilization(p.avg),
                })
                .collect();
            print_table(rows, "No datapoints in this window");
        }
    }

    Ok(())
}
