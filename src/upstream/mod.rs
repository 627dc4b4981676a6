//! Upstream access subsystem.
//!
//! # Data Flow
//! ```text
//! Handler
//!     → pokeapi.rs / turnstile.rs (build URL, dedup key, body)
//!     → resilience::dedup (collapse identical in-flight calls)
//!     → client.rs (retry with backoff, status → FetchError)
//!     → upstream API
//! ```

pub mod client;
pub mod error;
pub mod pokeapi;
pub mod turnstile;

pub use client::{FetchClient, RequestOptions};
pub use error::{FetchError, FetchResult};
pub use pokeapi::{PokeApiClient, PokemonSummary};
pub use turnstile::{TokenVerdict, TurnstileVerifier};
