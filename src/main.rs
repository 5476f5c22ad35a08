//! Lambda simulator CLI entry point.
//!
//! Runs an HTTP gateway in front of a simulated function deployment of the
//! demo application.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lambda_sim_common::ConfigFile;
use lambda_sim_server::{GatewayServer, ServerConfig, demo};

/// Simulate serverless concurrency limits, cold starts and instance recycling.
#[derive(Debug, Parser)]
#[command(name = "lambda-sim", version, about)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, env = "LAMBDA_SIM_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind the gateway (e.g., '0.0.0.0:8080').
    #[arg(long, env = "BIND_ADDR")]
    bind: Option<SocketAddr>,

    /// Maximum concurrent in-flight requests.
    #[arg(long)]
    max_concurrency: Option<usize>,

    /// Cold start delay in milliseconds.
    #[arg(long)]
    cold_start_ms: Option<u64>,

    /// Simulated execution duration in milliseconds.
    #[arg(long)]
    execution_ms: Option<u64>,

    /// Maximum instance lifetime in milliseconds.
    #[arg(long)]
    lifetime_ms: Option<u64>,

    /// Emit logs as JSON.
    #[arg(long)]
    json: bool,
}

impl Cli {
    /// Merge defaults, the config file and command line overrides.
    fn load_config(&self) -> anyhow::Result<ConfigFile> {
        let mut config = match &self.config {
            Some(path) => ConfigFile::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => ConfigFile::default(),
        };

        let simulator = &mut config.simulator;
        if let Some(value) = self.max_concurrency {
            simulator.max_concurrency = value;
        }
        if let Some(value) = self.cold_start_ms {
            simulator.cold_start_delay_ms = value;
        }
        if let Some(value) = self.execution_ms {
            simulator.execution_duration_ms = value;
        }
        if let Some(value) = self.lifetime_ms {
            simulator.max_instance_lifetime_ms = value;
        }
        if let Some(bind) = self.bind {
            config.server.bind_addr = bind.to_string();
        }

        Ok(config)
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,lambda_sim=debug".into());

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json);

    info!("Starting Lambda Simulator");

    let config = cli.load_config()?;
    let server_config =
        ServerConfig::try_from(&config.server).context("Invalid server configuration")?;

    info!(
        bind_addr = %server_config.bind_addr,
        max_concurrency = config.simulator.max_concurrency,
        cold_start_delay_ms = config.simulator.cold_start_delay_ms,
        execution_duration_ms = config.simulator.execution_duration_ms,
        max_instance_lifetime_ms = config.simulator.max_instance_lifetime_ms,
        "Configuration loaded"
    );

    let server = GatewayServer::new(demo::hello_world_app, config.simulator, server_config)
        .context("Failed to create gateway")?;

    info!("Gateway initialized. Available endpoints:");
    info!("  GET  /_sim/health        - Health check");
    info!("  GET  /_sim/stats         - Pool statistics");
    info!("  ANY  /*                  - Forwarded to a simulated instance");

    server.run().await?;

    Ok(())
}
