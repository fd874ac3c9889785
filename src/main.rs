//! SlotVault API Server Binary

use clap::Parser;
use slotvault::{
    api::{handlers::AppState, middleware::create_rate_limiter, ApiServer},
    config::SlotVaultConfig,
    factory::SlotVaultFactory,
    logging::init_tracing,
};
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "slotvault")]
#[command(about = "SlotVault wallet and slot machine API server", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<String>,

    /// API server host
    #[arg(long)]
    host: Option<String>,

    /// API server port
    #[arg(long)]
    port: Option<u16>,

    /// Database directory
    #[arg(long)]
    db_path: Option<String>,

    /// Log filter directive, e.g. info or slotvault=debug
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SlotVaultConfig::from_file(path)?,
        None => SlotVaultConfig::default(),
    };
    config.apply_env()?;

    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(db_path) = args.db_path {
        config.storage.data_directory = db_path;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    init_tracing(&config.logging);
    config.validate()?;

    info!(path = %config.storage.data_directory, "opening database");
    let app = SlotVaultFactory::create(&config)?;

    let state = Arc::new(AppState::new(&app, create_rate_limiter(&config.rate_limit)));
    ApiServer::new(config.server.clone(), state).run().await
}
