//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID, tracing span, request metrics)
//!     → middleware/gatekeeper.rs (reject / redirect / allow)
//!     → verify.rs, pokemon.rs (handlers)
//!     → response.rs (error mapping)
//!     → Send to client
//! ```

pub mod middleware;
pub mod pokemon;
pub mod request;
pub mod response;
pub mod server;
pub mod verify;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer, ServerError};
