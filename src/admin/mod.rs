//! Admin API.
//!
//! # Routes
//! - `GET /admin/status`: uptime and version
//! - `GET /admin/dedup`: in-flight deduplicated requests
//! - `GET /admin/gate`: active gate rules
//!
//! All routes require `Authorization: Bearer <admin.api_key>`.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{middleware::from_fn_with_state, routing::get, Router};

use crate::http::AppState;

/// Build the admin router on top of the application state.
pub fn router(state: AppState, api_key: &str) -> Router {
    let key: Arc<str> = Arc::from(api_key);

    Router::new()
        .route("/admin/status", get(handlers::status))
        .route("/admin/dedup", get(handlers::dedup))
        .route("/admin/gate", get(handlers::gate))
        .route_layer(from_fn_with_state(key, auth::admin_auth_middleware))
        .with_state(state)
}
