//! Gatekeeper middleware.
//! Rejects scanner traffic and enforces the verification cookie.

use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::http::response::not_found_response;
use crate::observability::metrics;
use crate::security::{GateDecision, Gatekeeper};

/// Gate shared with the config reloader.
pub type SharedGate = Arc<ArcSwap<Gatekeeper>>;

pub async fn gatekeeper_middleware(
    State(gate): State<SharedGate>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let decision = {
        let gate = gate.load();
        let cookies = request
            .headers()
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok());
        gate.evaluate(request.uri().path(), cookies)
    };
    metrics::record_gate_decision(decision.label());

    match decision {
        GateDecision::Reject => {
            tracing::info!(path = %request.uri().path(), "Blocked scanner path");
            not_found_response()
        }
        GateDecision::RedirectToVerify { location } => {
            tracing::debug!(path = %request.uri().path(), location = %location, "Verification required");
            Redirect::temporary(&location).into_response()
        }
        GateDecision::Allow(_) => next.run(request).await,
    }
}
