// ABOUTME: Server binary for the Fleet Auth Broker
// ABOUTME: Loads configuration, initializes logging and resources, then serves HTTP until shutdown
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Fleet Auth Broker Server Binary
//!
//! Starts the `OAuth` token broker and vehicle data API. Partner domain
//! registration runs in the background and never blocks startup.

use std::env;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use fleet_auth_broker::{
    config::ServerConfig,
    logging::LoggingConfig,
    resources::ServerResources,
    server,
};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "fleet-auth-broker")]
#[command(about = "Fleet Auth Broker - OAuth token lifecycle and vehicle data API for the Tesla Fleet API")]
pub struct Args {
    /// Override HTTP port
    #[arg(long)]
    http_port: Option<u16>,

    /// Serve sample vehicle data instead of calling the Fleet API
    #[arg(long, conflicts_with = "no_mock")]
    mock: bool,

    /// Call the real Fleet API even in development
    #[arg(long)]
    no_mock: bool,

    /// Do not register the partner domain at startup
    #[arg(long)]
    skip_partner_registration: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ServerConfig::from_env()?;
    if let Some(http_port) = args.http_port {
        config.http_port = http_port;
    }
    if args.mock {
        config.tesla.use_mock = true;
    } else if args.no_mock {
        config.tesla.use_mock = false;
    }
    if args.skip_partner_registration {
        config.tesla.register_on_startup = false;
    }

    let mut logging = LoggingConfig::from_env();
    if env::var("RUST_LOG").is_err() {
        logging.level = config.log_level.to_string();
    }
    logging.environment = config.environment.to_string();
    logging.init()?;

    info!("Starting Fleet Auth Broker");
    info!("{}", config.summary());

    let port = config.http_port;
    let resources = Arc::new(ServerResources::from_config(config).await?);
    info!(
        backend = resources.database.backend_name(),
        sessions = resources.token_manager.session_store().backend_name(),
        provider = resources.vehicle_provider.name(),
        "Server resources initialized"
    );

    if resources.config.tesla.register_on_startup {
        let registrar = Arc::clone(&resources.registrar);
        let domain = resources.config.tesla.developer_domain.clone();
        tokio::spawn(async move {
            registrar.register_on_startup(&domain).await;
        });
    } else {
        info!("Startup partner registration disabled");
    }

    if let Err(e) = server::serve(resources, port).await {
        error!("Server error: {e:#}");
        return Err(e);
    }

    Ok(())
}
