//! Phone OS server - simulated phone state over WebSocket
//!
//! Pushes status and notifications to connected clients and applies their
//! commands to one shared device state.

use anyhow::Result;
use clap::{Parser, Subcommand};
use phone_os::core::config::{ServerConfig, UnknownTypePolicy};
use phone_os::server::{self, ServerState};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "phoneos-server", about = "Simulated phone OS WebSocket server")]
struct Cli {
    /// Config file (defaults to the per-user config.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address
    #[arg(long)]
    listen: Option<String>,

    /// Status push interval in milliseconds
    #[arg(long)]
    status_interval_ms: Option<u64>,

    /// What to do with unrecognised message types
    #[arg(long, value_enum)]
    unknown_types: Option<UnknownTypePolicy>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the effective configuration as TOML and exit
    PrintConfig,
}

impl Cli {
    /// CLI flags take precedence over the config file
    fn resolve_config(&self) -> Result<ServerConfig> {
        let mut config = ServerConfig::load(self.config.as_deref())?;
        if let Some(listen) = &self.listen {
            config.listen = listen.clone();
        }
        if let Some(interval) = self.status_interval_ms {
            config.status_interval_ms = interval;
        }
        if let Some(policy) = self.unknown_types {
            config.unknown_type_policy = policy;
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = cli.resolve_config()?;

    if let Some(Commands::PrintConfig) = cli.command {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    info!("Starting Phone OS server on {}", config.listen);
    let listener = server::bind(&config.listen).await?;
    let state = Arc::new(ServerState::new(&config));

    // Wait for shutdown
    tokio::select! {
        result = server::serve(listener, state) => {
            if let Err(e) = &result {
                error!("{:#}", e);
            }
            result
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
            Ok(())
        }
    }
}
