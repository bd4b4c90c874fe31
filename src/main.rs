//! Rule-based reverse proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request                ┌──────────────────────────────────────────────┐
//!     ──────────────────────────────▶│  http::server (axum, request id, timeout)    │
//!                                   │        │                                     │
//!                                   │        ▼                                     │
//!                                   │  routing::Router ── first matching Rule      │
//!                                   │        │            (host + segment prefix)  │
//!                                   │        ▼                                     │
//!                                   │  Rule::destination_url                       │
//!                                   │        │                                     │
//!     Client Response               │        ▼                                     │
//!     ◀──────────────────────────────│  hyper client (http / https) ───────────────┼──▶ Destination
//!                                   │                                              │
//!                                   │  config (load, validate, watch) → ArcSwap    │
//!                                   │  observability (tracing, prometheus)         │
//!                                   │  lifecycle (signals, graceful shutdown)      │
//!                                   └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use rule_proxy::config::{load_config, ConfigWatcher, ProxyConfig};
use rule_proxy::lifecycle::{spawn_signal_handler, Shutdown};
use rule_proxy::observability::{logging, metrics};
use rule_proxy::HttpServer;

#[derive(Parser, Debug)]
#[command(name = "rule-proxy", version, about = "Rule-based reverse proxy", long_about = None)]
struct Args {
    /// TOML or JSON configuration file. Built-in defaults (no rules) when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reload the rules whenever the configuration file changes.
    #[arg(long, requires = "config")]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };

    logging::init_logging(&config.observability);

    tracing::info!("rule-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        rules = config.rules.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );
    if config.rules.is_empty() {
        tracing::warn!("No forwarding rules configured; every request will get 404");
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    // The watcher handle must outlive the server.
    let (_watcher, config_updates) = match (&args.config, args.watch) {
        (Some(path), true) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        _ => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let server = HttpServer::new(config)?;
    server
        .run(listener, config_updates, shutdown.subscribe())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
