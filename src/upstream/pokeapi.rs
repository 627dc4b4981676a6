//! PokéAPI client.
//!
//! Every call goes through the shared dedup registry, so concurrent page
//! renders asking for the same Pokémon trigger a single upstream request
//! (and a single retry sequence).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::resilience::DedupRegistry;
use crate::upstream::client::FetchClient;
use crate::upstream::error::{FetchError, FetchResult};

/// Longest identifier accepted for REST lookups.
const MAX_IDENTIFIER_LEN: usize = 64;

/// Build the dedup key for a request.
///
/// REST calls are keyed by `METHOD:url`; GraphQL calls add the query and
/// the serialized variables.
pub fn cache_key(method: &str, url: &str, extra: Option<&str>) -> String {
    match extra {
        Some(extra) => format!("{}:{}:{}", method, url, extra),
        None => format!("{}:{}", method, url),
    }
}

/// Normalize and validate a Pokémon id or name.
pub fn normalize_identifier(raw: &str) -> FetchResult<String> {
    let id = raw.trim().to_ascii_lowercase();
    let valid = !id.is_empty()
        && id.len() <= MAX_IDENTIFIER_LEN
        && id.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');

    if valid {
        Ok(id)
    } else {
        Err(FetchError::InvalidInput(format!("'{}' is not a valid Pokémon identifier", raw)))
    }
}

/// The slice of a `/pokemon/{id}` response the site renders.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PokemonSummary {
    pub id: u32,
    pub name: String,
    pub height: u32,
    pub weight: u32,
    pub types: Vec<String>,
    pub sprite: Option<String>,
}

#[derive(Deserialize)]
struct RawPokemon {
    id: u32,
    name: String,
    #[serde(default)]
    height: u32,
    #[serde(default)]
    weight: u32,
    #[serde(default)]
    types: Vec<RawTypeSlot>,
    #[serde(default)]
    sprites: RawSprites,
}

#[derive(Deserialize)]
struct RawTypeSlot {
    slot: u8,
    #[serde(rename = "type")]
    kind: RawNamed,
}

#[derive(Deserialize)]
struct RawNamed {
    name: String,
}

#[derive(Deserialize, Default)]
struct RawSprites {
    front_default: Option<String>,
}

impl PokemonSummary {
    /// Extract the summary from a raw PokéAPI document.
    pub fn from_value(value: Value) -> FetchResult<Self> {
        let mut raw: RawPokemon =
            serde_json::from_value(value).map_err(|e| FetchError::Decode(e.to_string()))?;
        raw.types.sort_by_key(|t| t.slot);

        Ok(Self {
            id: raw.id,
            name: raw.name,
            height: raw.height,
            weight: raw.weight,
            types: raw.types.into_iter().map(|t| t.kind.name).collect(),
            sprite: raw.sprites.front_default,
        })
    }
}

#[derive(Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: &'a Value,
}

#[derive(Deserialize)]
struct GraphQlResponse {
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphQlErrorEntry>,
}

#[derive(Deserialize)]
struct GraphQlErrorEntry {
    message: String,
}

/// Deduplicating client for the PokéAPI REST and GraphQL endpoints.
#[derive(Clone)]
pub struct PokeApiClient {
    fetch: FetchClient,
    dedup: DedupRegistry<Value>,
    rest_base_url: String,
    graphql_url: String,
}

impl PokeApiClient {
    pub fn new(
        fetch: FetchClient,
        dedup: DedupRegistry<Value>,
        rest_base_url: &str,
        graphql_url: &str,
    ) -> Self {
        Self {
            fetch,
            dedup,
            rest_base_url: rest_base_url.trim_end_matches('/').to_string(),
            graphql_url: graphql_url.to_string(),
        }
    }

    pub fn dedup(&self) -> &DedupRegistry<Value> {
        &self.dedup
    }

    /// `GET /pokemon/{id}`.
    pub async fn pokemon(&self, id: &str) -> FetchResult<Value> {
        self.rest("pokemon", id).await
    }

    /// `GET /pokemon-species/{id}`.
    pub async fn species(&self, id: &str) -> FetchResult<Value> {
        self.rest("pokemon-species", id).await
    }

    /// Summary used by the Pokémon detail page.
    pub async fn pokemon_summary(&self, id: &str) -> FetchResult<PokemonSummary> {
        PokemonSummary::from_value(self.pokemon(id).await?)
    }

    async fn rest(&self, resource: &str, id: &str) -> FetchResult<Value> {
        let id = normalize_identifier(id)?;
        let url = format!("{}/{}/{}", self.rest_base_url, resource, id);
        let key = cache_key("GET", &url, None);

        let fetch = self.fetch.clone();
        self.dedup
            .deduplicate(key, move || async move { fetch.get_json::<Value>(&url).await })
            .await
    }

    /// Run a GraphQL query and return its `data` member.
    pub async fn graphql(&self, query: &str, variables: Value) -> FetchResult<Value> {
        if query.trim().is_empty() {
            return Err(FetchError::InvalidInput("empty GraphQL query".to_string()));
        }

        let url = self.graphql_url.clone();
        let key = cache_key("POST", &url, Some(&format!("{}:{}", query, variables)));

        let fetch = self.fetch.clone();
        let query = query.to_string();
        self.dedup
            .deduplicate(key, move || async move {
                let body = GraphQlRequest {
                    query: &query,
                    variables: &variables,
                };
                let response: GraphQlResponse = fetch.post_json(&url, &body).await?;
                if let Some(first) = response.errors.first() {
                    return Err(FetchError::GraphQl(first.message.clone()));
                }
                Ok(response.data.unwrap_or(Value::Null))
            })
            .await
    }
}
