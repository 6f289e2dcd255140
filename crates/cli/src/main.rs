//! CloudShop AI-Ops CLI
//!
//! A command-line tool for asking the AI-Ops bot questions, reading error
//! reports and running deployment actions.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{chat, k8s, logs, metrics};

const DEFAULT_API_URL: &str = "http://localhost:8080";

/// CloudShop AI-Ops CLI
#[derive(Parser)]
#[command(name = "aiops")]
#[command(author, version, about = "CLI for the CloudShop AI-Ops assistant", long_about = None)]
pub struct Cli {
    /// Bot URL (can also be set via AIOPS_API_URL env var or the config file)
    #[arg(long, env = "AIOPS_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ask a question in plain English
    Ask {
        /// The question, e.g. "show error summary for last 30 minutes"
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },

    /// Show error counts per service
    Summary {
        /// Lookback window in minutes
        #[arg(long, short, default_value_t = 30)]
        minutes: u32,
    },

    /// Show recent errors for one service
    Errors {
        /// Service name (orders, catalog, users, ...)
        service: String,

        /// Lookback window in minutes
        #[arg(long, short, default_value_t = 30)]
        minutes: u32,

        /// Maximum number of log lines
        #[arg(long, short, default_value_t = 50)]
        limit: u32,
    },

    /// Show the busiest endpoints
    Top {
        /// Lookback window in minutes
        #[arg(long, short, default_value_t = 30)]
        minutes: u32,

        /// Number of endpoints
        #[arg(long, short, default_value_t = 10)]
        limit: u32,
    },

    /// Show average pod CPU utilisation for a deployment
    Cpu {
        /// Deployment name (defaults to the bot's self-heal deployment)
        deployment: Option<String>,

        /// Namespace (defaults to the bot's namespace)
        #[arg(long, short)]
        namespace: Option<String>,

        /// Lookback window in minutes
        #[arg(long, short, default_value_t = 15)]
        minutes: u32,

        /// Seconds per datapoint
        #[arg(long, short, default_value_t = 60)]
        period: u32,
    },

    /// Show pod readiness in a namespace
    Pods {
        /// Namespace (defaults to the bot's namespace)
        #[arg(long, short)]
        namespace: Option<String>,
    },

    /// Restart a deployment
    Restart {
        /// Deployment name
        deployment: String,

        /// Namespace (defaults to the bot's namespace)
        #[arg(long, short)]
        namespace: Option<String>,
    },

    /// Scale a deployment
    Scale {
        /// Deployment name
        deployment: String,

        /// Desired replica count
        #[arg(long, short)]
        replicas: u32,

        /// Namespace (defaults to the bot's namespace)
        #[arg(long, short)]
        namespace: Option<String>,
    },

    /// Wait for a deployment rollout to finish
    Rollout {
        /// Deployment name
        deployment: String,

        /// Namespace (defaults to the bot's namespace)
        #[arg(long, short)]
        namespace: Option<String>,

        /// Seconds to wait before giving up
        #[arg(long, short)]
        timeout: Option<u64>,
    },

    /// Check errors, restart if needed, and re-check
    SelfHeal {
        /// Service whose errors decide whether to restart
        #[arg(long, short)]
        service: Option<String>,

        /// Deployment to restart (defaults to <service>-deployment)
        #[arg(long, short)]
        deployment: Option<String>,

        /// Namespace (defaults to the bot's namespace)
        #[arg(long, short)]
        namespace: Option<String>,

        /// Lookback window in minutes
        #[arg(long, short)]
        minutes: Option<u32>,

        /// Seconds to wait for the rollout
        #[arg(long, short)]
        timeout: Option<u64>,
    },

    /// Show the bot's health
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::Config::load()?;

    let api_url = cli
        .api_url
        .or_else(|| config.api_url.clone())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());
    let client = client::ApiClient::new(&api_url)?;

    let namespace = |ns: Option<String>| ns.or_else(|| config.default_namespace.clone());

    match cli.command {
        Commands::Ask { question } => {
            chat::ask(&client, &question.join(" "), cli.format).await?;
        }
        Commands::Summary { minutes } => {
            logs::show_summary(&client, minutes, cli.format).await?;
        }
        Commands::Errors {
            service,
            minutes,
            limit,
        } => {
            logs::show_service_errors(&client, &service, minutes, limit, cli.format).await?;
        }
        Commands::Top { minutes, limit } => {
            logs::show_top_endpoints(&client, minutes, limit, cli.format).await?;
        }
        Commands::Cpu {
            deployment,
            namespace: ns,
            minutes,
            period,
        } => {
            metrics::show_cpu(&client, deployment, namespace(ns), minutes, period, cli.format)
                .await?;
        }
        Commands::Pods { namespace: ns } => {
            k8s::show_pods(&client, namespace(ns), cli.format).await?;
        }
        Commands::Restart {
            deployment,
            namespace: ns,
        } => {
            k8s::restart(&client, &deployment, namespace(ns), cli.format).await?;
        }
        Commands::Scale {
            deployment,
            replicas,
            namespace: ns,
        } => {
            k8s::scale(&client, &deployment, replicas, namespace(ns), cli.format).await?;
        }
        Commands::Rollout {
            deployment,
            namespace: ns,
            timeout,
        } => {
            k8s::rollout(&client, &deployment, namespace(ns), timeout, cli.format).await?;
        }
        Commands::SelfHeal {
            service,
            deployment,
            namespace: ns,
            minutes,
            timeout,
        } => {
            let request = k8s::SelfHealArgs {
                service,
                deployment,
                namespace: namespace(ns),
                minutes,
                timeout,
            };
            k8s::self_heal(&client, request, cli.format).await?;
        }
        Commands::Health => {
            chat::show_health(&client, cli.format).await?;
        }
    }

    Ok(())
}
