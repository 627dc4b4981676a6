use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::http::AppState;
use crate::resilience::DedupStats;
use crate::security::GateSnapshot;

pub async fn status(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "service": "pokedex-edge",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.started_at.elapsed().as_secs(),
        "pending_requests": state.dedup.stats().pending_count,
        "gate_enabled": state.gate.load().config().enabled,
    }))
}

pub async fn dedup(State(state): State<AppState>) -> Json<DedupStats> {
    Json(state.dedup.stats())
}

pub async fn gate(State(state): State<AppState>) -> Json<GateSnapshot> {
    Json(state.gate.load().snapshot())
}
