//! Request tap.
//!
//! Serves a few static assets and mirrors every other request to live
//! observers connected over WebSocket, for watching webhook deliveries as
//! they arrive.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────┐
//!                 │                   REQUEST TAP                    │
//!   HTTP client   │  ┌──────────┐   ┌──────────┐   ┌─────────────┐  │
//!   ──────────────┼─▶│ primary  │──▶│ dispatch │──▶│ asset cache │  │
//!                 │  │ listener │   │          │   └─────────────┘  │
//!                 │  └──────────┘   │          │   ┌─────────────┐  │
//!                 │                 │          │──▶│ body        │  │
//!                 │                 └────┬─────┘   │ collector   │  │
//!                 │                      │         └─────────────┘  │
//!                 │                      ▼                          │
//!                 │               ┌─────────────┐                   │
//!                 │               │ broadcaster │                   │
//!                 │               └──────┬──────┘                   │
//!                 │                      ▼                          │
//!   Observers     │  ┌──────────┐   ┌──────────┐                    │
//!   ◀─────────────┼──│ observer │◀──│ registry │                    │
//!   (WebSocket)   │  │ listener │   └──────────┘                    │
//!                 │  └──────────┘                                   │
//!                 └──────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use request_tap::config::schema::default_assets;
use request_tap::config::validation::validate_config;
use request_tap::config::{load_config, ConfigError, TapConfig};
use request_tap::lifecycle::{self, signals, Shutdown};
use request_tap::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "request-tap")]
#[command(about = "Capture HTTP requests and stream them to live observers", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Primary port; observers connect on port + 1
    #[arg(short, long)]
    port: Option<u16>,

    /// Request body ceiling in bytes
    #[arg(long)]
    max_body_bytes: Option<usize>,
}

impl Cli {
    fn apply(&self, config: &mut TapConfig) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(port) = self.port {
            let mut addr: SocketAddr = config.listener.bind_address.parse()?;
            addr.set_port(port);
            config.listener.bind_address = addr.to_string();
        }
        if let Some(max) = self.max_body_bytes {
            config.body.max_bytes = max;
        }
        if config.assets.is_empty() {
            config.assets = default_assets();
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => TapConfig::default(),
    };
    cli.apply(&mut config)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init(&config.observability.log_filter);
    tracing::info!("request-tap v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        max_body_bytes = config.body.max_bytes,
        assets = config.assets.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let server = lifecycle::start(&config).await?;
    tracing::info!(
        "Send requests to http://{} and watch them at ws://{}",
        server.primary_addr()?,
        server.observer_addr()?
    );

    let shutdown = Arc::new(Shutdown::new());
    let trigger = Arc::clone(&shutdown);
    tokio::spawn(async move {
        signals::wait_for_signal().await;
        trigger.trigger();
    });

    server.run(&shutdown).await;

    tracing::info!("Shutdown complete");
    Ok(())
}
