//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to upstream:
//!     → dedup.rs (join an identical in-flight call, or start one)
//!     → retries.rs (check if retryable, compute delay)
//!     → backoff.rs (exponential delay, optional jitter)
//! ```
//!
//! # Design Decisions
//! - Every upstream call has a bounded number of attempts
//! - 429 and 5xx are transient; other 4xx are final
//! - Deduplication is concurrency collapsing, never caching

pub mod backoff;
pub mod dedup;
pub mod retries;

pub use dedup::{DedupRegistry, DedupStats};
pub use retries::{is_retryable, RetryPolicy};
