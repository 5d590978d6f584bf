//! Feed / image proxy gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────────────┐
//!                      │                      FEED GATEWAY                        │
//!                      │                                                          │
//!   Client Request     │  ┌─────────┐   ┌──────────┐   ┌──────────────────┐       │
//!   ───────────────────┼─▶│  cors   │──▶│   auth   │──▶│     handlers     │       │
//!                      │  │ + req id│   │  (bearer)│   └───┬──────────┬───┘       │
//!                      │  └─────────┘   └──────────┘       │          │           │
//!                      │                                   ▼          ▼           │
//!                      │                       ┌────────────────┐ ┌────────────┐  │
//!                      │                       │ mirrors (rsshub│ │   image    │  │
//!                      │                       │ :// resolution)│ │  streamer  │◀─┼── Image CDN
//!                      │                       └───────┬────────┘ │ (≤5 hops)  │  │
//!                      │                               ▼          └────────────┘  │
//!                      │                       ┌────────────────┐                 │
//!                      │                       │  feed fetcher  │◀────────────────┼── Publisher /
//!                      │                       │  + rewriter    │                 │   Mirror
//!                      │                       └────────────────┘                 │
//!                      │                                                          │
//!                      │   Cross-cutting: config · observability · lifecycle      │
//!                      └──────────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;

use feed_gateway::config::{load_config, loader::set_port};
use feed_gateway::lifecycle::signals::spawn_signal_listener;
use feed_gateway::observability::{logging, metrics};
use feed_gateway::{HttpServer, Shutdown};

/// Feed and image proxy gateway.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides PORT).
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        set_port(&mut config, port);
    }

    logging::init_logging(&config.observability);

    tracing::info!("feed-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        server_url = %config.server_url,
        mirrors = config.mirrors.instances.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    spawn_signal_listener(&shutdown);

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
