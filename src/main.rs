//! Resource server.
//!
//! An HTTP API whose protected endpoints only answer requests carrying a
//! bearer token signed by the configured issuer for the configured audience.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ security headers ─▶ catch-panic ─▶ request id ─▶ trace
//!                       ─▶ metrics ─▶ timeout ─▶ CORS ─▶ authorization gate
//!                                                             │
//!                              ┌──────────────────────────────┤
//!                              ▼                              ▼
//!                     token validator ◀── key cache ◀── issuer (JWKS)
//!                                                             │
//!     Client Response                                         ▼
//!     ◀───────────────────────────────────────────────── message handlers
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use resource_server::config::load_config;
use resource_server::lifecycle::{trigger_on_signal, Shutdown};
use resource_server::observability::{init_logging, init_metrics};
use resource_server::HttpServer;

#[derive(Parser)]
#[command(name = "resource-server")]
#[command(about = "Bearer-token protected message API", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "RESOURCE_SERVER_CONFIG")]
    config: Option<PathBuf>,

    /// Validate the configuration and exit
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(2);
        }
    };

    if cli.check_config {
        println!("Configuration OK");
        return Ok(());
    }

    init_logging(&config.observability)?;
    tracing::info!("resource-server v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.listener.request_timeout_secs,
        issuer = %config.auth.issuer,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config)?;
    let mut serving = tokio::spawn(server.run(listener, shutdown.subscribe()));

    tokio::select! {
        result = &mut serving => result??,
        _ = trigger_on_signal(&shutdown) => serving.await??,
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
