//! Hostname-routing HTTP service (v1)
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────────┐
//!                     │                    VHOST SERVICE                      │
//!                     │                                                       │
//!   Client Request    │  ┌─────────┐    ┌──────────┐    ┌──────────────────┐  │
//!   ──────────────────┼─▶│  http   │───▶│ dispatch │───▶│ vhosts registry  │  │
//!                     │  │ server  │    │          │◀───│ (RwLock, index)  │  │
//!                     │  └─────────┘    └────┬─────┘    └────────┬─────────┘  │
//!                     │                      │                   │            │
//!   Client Response   │                      ▼                   ▼            │
//!   ◀─────────────────┼──────────── handler / error handler   data file       │
//!                     │                                       (save / load /  │
//!                     │                                        watch)         │
//!                     │  ┌─────────────────────────────────────────────────┐  │
//!                     │  │ config · observability · lifecycle              │  │
//!                     │  └─────────────────────────────────────────────────┘  │
//!                     └──────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use vhost_registry::config::{load_config, ServiceConfig};
use vhost_registry::http::HttpServer;
use vhost_registry::lifecycle::{bootstrap_registry, signals, Shutdown};
use vhost_registry::observability::{logging, metrics};
use vhost_registry::vhosts::VhostFileWatcher;

#[derive(Parser)]
#[command(name = "vhost-registry")]
#[command(about = "Route HTTP requests to handlers by hostname", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };

    logging::init_logging(&config.observability)?;

    tracing::info!("vhost-registry v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        data_file = ?config.registry.data_file,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let vhosts = bootstrap_registry(&config)?;

    // Kept alive for the lifetime of the process.
    let _watcher = match (&config.registry.data_file, config.registry.watch) {
        (Some(path), true) => match VhostFileWatcher::new(path, vhosts.clone()).run() {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                tracing::warn!(error = %e, "Vhost data file watcher disabled");
                None
            }
        },
        _ => None,
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        "Listening for connections"
    );

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config.clone(), vhosts.clone());
    let server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    signals::wait_for_shutdown().await;
    shutdown.trigger();
    server_task.await??;

    if config.registry.save_on_shutdown {
        if let Some(path) = &config.registry.data_file {
            vhosts.save(path)?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
