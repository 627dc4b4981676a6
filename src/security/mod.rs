//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → deny_list.rs (scanner paths → 404)
//!     → gatekeeper.rs (exclusions, protected prefixes)
//!     → verification.rs (cookie check, redirect target)
//!     → Pass to routing
//! ```
//!
//! # Design Decisions
//! - Rejections look exactly like a missing route
//! - The gate never performs I/O
//! - No trust in client input: redirect targets are sanitized

pub mod deny_list;
pub mod gatekeeper;
pub mod verification;

pub use deny_list::DenyList;
pub use gatekeeper::{AllowReason, GateDecision, GateSnapshot, Gatekeeper};
