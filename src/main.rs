//! pokedex-edge
//!
//! Edge service in front of a Pokémon reference site.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────────┐
//!                      │                    POKEDEX-EDGE                      │
//!   Client Request     │  ┌──────────┐   ┌────────────┐   ┌───────────────┐   │
//!   ───────────────────┼─▶│ trace +  │──▶│ gatekeeper │──▶│    router     │   │
//!                      │  │ req. id  │   │ deny/verify│   │ verify/pokemon│   │
//!                      │  └──────────┘   └─────┬──────┘   └──────┬────────┘   │
//!   404 / 307 ◀────────┼────────────────────────┘                 │            │
//!                      │                                          ▼            │
//!                      │                 ┌────────────┐   ┌───────────────┐   │
//!                      │                 │   dedup    │◀──│ upstream      │   │
//!                      │                 │  registry  │   │ clients       │   │
//!                      │                 └─────┬──────┘   └───────────────┘   │
//!                      │                       ▼                              │
//!                      │                 ┌────────────┐                       │
//!                      │                 │ retry +    │───────────────────────┼──▶ PokéAPI /
//!                      │                 │ backoff    │                       │    Turnstile
//!                      │                 └────────────┘                       │
//!                      └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use pokedex_edge::config::loader::{apply_env_overrides, load_config};
use pokedex_edge::config::watcher::ConfigWatcher;
use pokedex_edge::config::EdgeConfig;
use pokedex_edge::lifecycle::{wait_for_signal, Shutdown};
use pokedex_edge::observability::{logging, metrics};
use pokedex_edge::{admin, HttpServer};

#[derive(Parser)]
#[command(name = "pokedex-edge")]
#[command(about = "Edge gatekeeper and resilient upstream client for the Pokédex site", long_about = None)]
struct Args {
    /// Path to a TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => {
            let mut config = EdgeConfig::default();
            apply_env_overrides(&mut config);
            config
        }
    };

    logging::init_logging(&config.observability);
    tracing::info!("pokedex-edge v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_attempts = config.retries.max_attempts,
        gate_enabled = config.gate.enabled,
        protected_prefixes = ?config.gate.protected_prefixes,
        "Configuration loaded"
    );
    if config.verification.secret_key.is_empty() {
        tracing::warn!("No verification secret configured; challenge submissions will fail");
    }

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

    // Hot reload; the watcher must outlive the server.
    let (config_updates, _watcher) = match &args.config {
        Some(path) => {
            let (watcher, rx) = ConfigWatcher::new(path);
            match watcher.with_current(&config).run() {
                Ok(handle) => (rx, Some(handle)),
                Err(e) => {
                    tracing::warn!(error = %e, "Config hot reload unavailable");
                    (rx, None)
                }
            }
        }
        None => (mpsc::unbounded_channel().1, None),
    };

    let server = HttpServer::new(config.clone())?;

    if config.admin.enabled {
        let admin_router = admin::router(server.state().clone(), &config.admin.api_key);
        let admin_listener = TcpListener::bind(&config.admin.bind_address).await?;
        let mut admin_shutdown = shutdown.subscribe();
        tracing::info!(address = %config.admin.bind_address, "Admin API listening");
        tokio::spawn(async move {
            let result = axum::serve(admin_listener, admin_router)
                .with_graceful_shutdown(async move {
                    let _ = admin_shutdown.recv().await;
                })
                .await;
            if let Err(e) = result {
                tracing::error!(error = %e, "Admin server failed");
            }
        });
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    tokio::spawn(wait_for_signal(shutdown.clone()));

    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
