//! Response helpers.
//!
//! # Responsibilities
//! - Map upstream errors to user-facing status codes and messages
//! - Produce the single "not found" response shared by the router and
//!   the gatekeeper, so blocked paths look like missing ones

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::upstream::FetchError;

/// JSON error body. Every failure can be retried by the user.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    pub retry: bool,
}

/// Plain 404, identical for unknown routes and rejected paths.
pub fn not_found_response() -> Response {
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}

/// Router fallback.
pub async fn not_found() -> Response {
    not_found_response()
}

/// Status code and error kind for an upstream failure.
pub fn classify(err: &FetchError) -> (StatusCode, &'static str) {
    if err.is_rate_limited() {
        (StatusCode::SERVICE_UNAVAILABLE, "rate_limited")
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, "not_found")
    } else if matches!(err, FetchError::InvalidInput(_)) {
        (StatusCode::BAD_REQUEST, "invalid_input")
    } else if err.is_connectivity() {
        (StatusCode::BAD_GATEWAY, "connectivity")
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "error")
    }
}

/// Render an upstream failure for the client.
pub fn fetch_error_response(err: &FetchError) -> Response {
    let (status, kind) = classify(err);
    let message = match kind {
        "rate_limited" => "The Pokémon data service is temporarily unavailable. Please try again in a moment.".to_string(),
        "not_found" => "No Pokémon matched that request.".to_string(),
        "invalid_input" => err.to_string(),
        "connectivity" => "Could not reach the Pokémon data service. Check your connection and try again.".to_string(),
        _ => "Something went wrong while loading this page. Please try again.".to_string(),
    };

    if status.is_server_error() {
        tracing::warn!(error = %err, status = %status, "Upstream request failed");
    } else {
        tracing::debug!(error = %err, status = %status, "Upstream request rejected");
    }

    (
        status,
        Json(ErrorBody {
            error: kind,
            message,
            retry: true,
        }),
    )
        .into_response()
}
