use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use beacon::config::{self, AppConfig};
use beacon::{gateway, orchestrator};

#[derive(Parser)]
#[command(name = "beacon")]
#[command(version, about = "Webhook gateway and architecture request orchestrator")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the configuration document (default: beacon.yml, or $BEACON_CONFIG)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the webhook security & routing gateway
    Gateway {
        /// Port to serve on
        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// Enable dev mode (bind all interfaces, permissive CORS)
        #[arg(long)]
        dev: bool,
    },
    /// Run the architecture request orchestrator
    Orchestrator {
        /// Port to serve on
        #[arg(short, long, default_value = "8085")]
        port: u16,

        /// Enable dev mode (bind all interfaces, permissive CORS)
        #[arg(long)]
        dev: bool,
    },
    /// Validate the configuration document and report warnings
    Validate,
}

fn config_path(cli: &Cli) -> PathBuf {
    cli.config
        .clone()
        .or_else(|| std::env::var(config::CONFIG_PATH_ENV).ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("beacon.yml"))
}

fn load(cli: &Cli) -> Result<AppConfig> {
    let path = config_path(cli);
    config::load_config(&path)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match &cli.command {
        Commands::Gateway { port, dev } => {
            let config = load(&cli)?;
            config
                .validate()
                .context("Invalid configuration")?
                .iter()
                .for_each(|warning| tracing::warn!("{warning}"));
            gateway::server::start_gateway(
                config,
                gateway::server::ServerConfig {
                    port: *port,
                    dev_mode: *dev,
                },
            )
            .await?;
        }
        Commands::Orchestrator { port, dev } => {
            let config = load(&cli)?;
            config
                .validate()
                .context("Invalid configuration")?
                .iter()
                .for_each(|warning| tracing::warn!("{warning}"));
            orchestrator::server::start_orchestrator(
                config,
                orchestrator::server::ServerConfig {
                    port: *port,
                    dev_mode: *dev,
                },
            )
            .await?;
        }
        Commands::Validate => {
            let path = config_path(&cli);
            let config = config::load_config(&path)?;
            let warnings = config.validate().context("Invalid configuration")?;
            for warning in &warnings {
                println!("warning: {warning}");
            }
            println!(
                "Configuration OK: {} endpoint(s), {} channel(s){}",
                config.gateway.endpoints.len(),
                config.channels.len(),
                if warnings.is_empty() {
                    String::new()
                } else {
                    format!(", {} warning(s)", warnings.len())
                }
            );
        }
    }

    Ok(())
}
