//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with all handlers
//! - Wire up middleware (trace, request ID, timeout, gatekeeper)
//! - Apply live gate reloads
//! - Run the dedup sweeper alongside the server
//! - Shut down gracefully

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::{EdgeConfig, VerificationConfig};
use crate::http::middleware::{gatekeeper_middleware, SharedGate};
use crate::http::request::{make_span, propagate_request_id_layer, set_request_id_layer, track_requests};
use crate::http::response::not_found;
use crate::http::{pokemon, verify};
use crate::resilience::DedupRegistry;
use crate::security::Gatekeeper;
use crate::upstream::{FetchClient, FetchError, PokeApiClient, TurnstileVerifier};

/// Errors that prevent the server from starting.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to build upstream client: {0}")]
    Client(#[from] FetchError),

    #[error("Invalid gate deny pattern: {0}")]
    Gate(#[from] regex::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gate: SharedGate,
    pub pokeapi: PokeApiClient,
    pub dedup: DedupRegistry<Value>,
    pub verifier: TurnstileVerifier,
    pub verification: Arc<VerificationConfig>,
    pub started_at: Instant,
}

impl AppState {
    /// Build every collaborator from configuration.
    pub fn from_config(config: &EdgeConfig) -> Result<Self, ServerError> {
        let fetch = FetchClient::new(&config.retries, &config.timeouts, &config.upstream.user_agent)?;
        Self::with_fetch_client(config, fetch)
    }

    /// Same as `from_config` but with a caller-supplied fetch client.
    pub fn with_fetch_client(config: &EdgeConfig, fetch: FetchClient) -> Result<Self, ServerError> {
        let gate = Gatekeeper::from_config(config.gate.clone())?;
        let dedup = DedupRegistry::new();
        let pokeapi = PokeApiClient::new(
            fetch.clone(),
            dedup.clone(),
            &config.upstream.rest_base_url,
            &config.upstream.graphql_url,
        );

        Ok(Self {
            gate: Arc::new(ArcSwap::from_pointee(gate)),
            pokeapi,
            dedup,
            verifier: TurnstileVerifier::new(fetch, &config.verification),
            verification: Arc::new(config.verification.clone()),
            started_at: Instant::now(),
        })
    }
}

/// HTTP server for the edge service.
pub struct HttpServer {
    router: Router,
    config: EdgeConfig,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: EdgeConfig) -> Result<Self, ServerError> {
        let state = AppState::from_config(&config)?;
        Ok(Self::with_state(config, state))
    }

    /// Create a server around prepared state.
    pub fn with_state(config: EdgeConfig, state: AppState) -> Self {
        let router = Self::build_router(&config, state.clone());
        Self { router, config, state }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &EdgeConfig, state: AppState) -> Router {
        let gate = state.gate.clone();

        Router::new()
            .route("/health", get(health))
            .route(&config.gate.verify_path, get(verify::verify_page))
            .route(&config.gate.verify_api_path, post(verify::verify_turnstile))
            .route("/pokemon/{id}", get(pokemon::pokemon_page))
            .route("/api/pokemon/{id}", get(pokemon::pokemon_api))
            .route("/api/graphql", post(pokemon::graphql))
            .fallback(not_found)
            .layer(from_fn_with_state(gate, gatekeeper_middleware))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(TraceLayer::new_for_http().make_span_with(make_span))
                    .layer(propagate_request_id_layer())
                    .layer(from_fn(track_requests))
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
            )
    }

    /// The fully layered router, for embedding or in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &EdgeConfig {
        &self.config
    }

    /// Run the server until `shutdown` fires.
    ///
    /// Gate sections arriving on `config_updates` are applied live.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<EdgeConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let sweeper = self.state.dedup.spawn_sweeper(
            Duration::from_secs(self.config.dedup.sweep_interval_secs),
            Duration::from_secs(self.config.dedup.stale_after_secs),
            shutdown.resubscribe(),
        );

        let reloader = tokio::spawn(apply_gate_updates(
            self.state.gate.clone(),
            config_updates,
            shutdown.resubscribe(),
        ));

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        let _ = sweeper.await;
        reloader.abort();

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Swap in a new gate for every valid configuration received.
pub async fn apply_gate_updates(
    gate: SharedGate,
    mut updates: mpsc::UnboundedReceiver<EdgeConfig>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            update = updates.recv() => {
                let Some(config) = update else { break };
                match Gatekeeper::from_config(config.gate) {
                    Ok(next) => {
                        gate.store(Arc::new(next));
                        tracing::info!("Gate configuration reloaded");
                    }
                    Err(e) => tracing::error!(error = %e, "Rejected gate configuration, keeping current rules"),
                }
            }
            _ = shutdown.recv() => break,
        }
    }
}

async fn health(axum::extract::State(state): axum::extract::State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "uptime_secs": state.started_at.elapsed().as_secs(),
    }))
}
