//! Question answering and bot health

use anyhow::Result;
use colored::Colorize;
use ops_lib::{ChatResponse, ComponentStatus, HealthResponse, Intent};
use serde_json::json;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{color_status, print_json, print_table, print_warning, OutputFormat};

#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
}

/// Ask the bot a plain-English question
pub async fn ask(client: &ApiClient, question: &str, format: OutputFormat) -> Result<()> {
    let response: ChatResponse = client
        .post("ai/chat", &[], &json!({ "question": question }))
        .await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => {
            if response.intent == Intent::Unknown {
                print_warning("I did not recognise that question.");
            } else {
                println!(
                    "{} {}",
                    "intent:".dimmed(),
                    response.intent.to_string().cyan()
                );
            }
            println!("{}", response.answer);
        }
    }

    Ok(())
}

/// Show the bot's health and its components
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health: HealthResponse = client.get("health", &[]).await?;

    match format {
        OutputFormat::Json => print_json(&health)?,
        OutputFormat::Table => {
            println!("{}", "AI-Ops bot".bold());
            println!("{}", "=".repeat(40));
            println!("Status:    {}", color_status(status_str(health.status)));
            println!("Service:   {}", health.info.service.cyan());
            println!("Namespace: {}", health.info.namespace);
            println!("Log group: {}", health.info.log_group);
            println!();

            let mut components: Vec<_> = health.components.into_iter().collect();
            components.sort_by(|a, b| a.0.cmp(&b.0));
            let rows = components
                .into_iter()
                .map(|(name, c)| ComponentRow {
                    name,
                    status: color_status(status_str(c.status)),
                    message: c.message.unwrap_or_default(),
                })
                .collect();
            print_table(rows, "No components registered");
        }
    }

    Ok(())
}

fn status_str(status: ComponentStatus) -> &'static str {
    match status {
        ComponentStatus::Healthy => "healthy",
        ComponentStatus::Degraded => "degraded",
        ComponentStatus::Unhealthy => "unhealthy",
    }
}
