//! Content handlers backed by the PokéAPI client.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::http::response::fetch_error_response;
use crate::http::server::AppState;

/// Gated detail page. Renders the summary the site needs.
pub async fn pokemon_page(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.pokeapi.pokemon_summary(&id).await {
        Ok(summary) => Json(summary).into_response(),
        Err(e) => fetch_error_response(&e),
    }
}

/// Raw upstream document, ungated.
pub async fn pokemon_api(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.pokeapi.pokemon(&id).await {
        Ok(value) => Json(value).into_response(),
        Err(e) => fetch_error_response(&e),
    }
}

#[derive(Debug, Deserialize)]
pub struct GraphQlBody {
    pub query: String,
    #[serde(default)]
    pub variables: Option<Value>,
}

/// GraphQL pass-through with in-flight deduplication.
pub async fn graphql(State(state): State<AppState>, Json(body): Json<GraphQlBody>) -> Response {
    let variables = body.variables.unwrap_or_else(|| json!({}));
    match state.pokeapi.graphql(&body.query, variables).await {
        Ok(data) => Json(json!({ "data": data })).into_response(),
        Err(e) => fetch_error_response(&e),
    }
}
