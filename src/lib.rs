//! Edge service for a Pokémon reference site.
//!
//! Two components guard the network boundary:
//! - a resilient upstream client (retry with backoff, in-flight dedup)
//! - an edge gatekeeper (scanner deny-list, verification-cookie gating)

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod security;
pub mod upstream;

pub use config::schema::EdgeConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
