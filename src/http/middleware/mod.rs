//! Request middleware applied before routing.

pub mod gatekeeper;

pub use gatekeeper::{gatekeeper_middleware, SharedGate};
