//! In-flight request deduplication.
//!
//! # Responsibilities
//! - Collapse concurrent calls for the same key into one execution
//! - Replay the single outcome (value or error) to every waiter
//! - Evict the key as soon as the execution settles
//! - Sweep entries that never settle
//!
//! # Design Decisions
//! - Not a cache: nothing survives past settlement
//! - Check-and-insert happens under the DashMap shard lock (entry API)
//! - The execution runs on its own task, so it completes even if every
//!   waiter goes away; there is no cancellation
//! - Entries carry a generation so a late eviction never removes a newer
//!   execution that reused the key

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::observability::metrics;
use crate::upstream::error::{FetchError, FetchResult};

type SharedResult<T> = Shared<BoxFuture<'static, FetchResult<T>>>;

/// One outstanding execution.
struct PendingRequest<T> {
    future: SharedResult<T>,
    created_at: Instant,
    generation: u64,
}

/// Snapshot of the registry for observability.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DedupStats {
    pub pending_count: usize,
    pub keys: Vec<String>,
}

/// Process-wide registry of in-flight requests, keyed by request identity.
pub struct DedupRegistry<T> {
    pending: Arc<DashMap<String, PendingRequest<T>>>,
    next_generation: Arc<AtomicU64>,
}

impl<T> Clone for DedupRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            pending: Arc::clone(&self.pending),
            next_generation: Arc::clone(&self.next_generation),
        }
    }
}

impl<T> Default for DedupRegistry<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> DedupRegistry<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            pending: Arc::new(DashMap::new()),
            next_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Run `fetcher` at most once per key among concurrent callers.
    ///
    /// The first caller for `key` spawns the operation; every caller that
    /// arrives before it settles awaits the same outcome. `fetcher` only
    /// builds the future and must not touch this registry synchronously.
    pub async fn deduplicate<F, Fut>(&self, key: impl Into<String>, fetcher: F) -> FetchResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = FetchResult<T>> + Send + 'static,
    {
        let key = key.into();

        let shared = match self.pending.entry(key.clone()) {
            Entry::Occupied(entry) => {
                tracing::debug!(key = %key, "Joining in-flight request");
                metrics::record_dedup_joined();
                entry.get().future.clone()
            }
            Entry::Vacant(entry) => {
                let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
                let guard = EvictOnSettle {
                    pending: Arc::clone(&self.pending),
                    key: key.clone(),
                    generation,
                };

                let operation = fetcher();
                let handle = tokio::spawn(async move {
                    let _guard = guard;
                    operation.await
                });

                let shared = async move {
                    match handle.await {
                        Ok(result) => result,
                        Err(e) => Err(FetchError::Internal(format!("request task failed: {}", e))),
                    }
                }
                .boxed()
                .shared();

                entry.insert(PendingRequest {
                    future: shared.clone(),
                    created_at: Instant::now(),
                    generation,
                });
                tracing::trace!(key = %key, generation, "Started deduplicated request");
                shared
            }
        };
        metrics::record_dedup_pending(self.pending.len());

        shared.await
    }

    /// Current keys and count, for introspection only.
    pub fn stats(&self) -> DedupStats {
        let mut keys: Vec<String> = self.pending.iter().map(|r| r.key().clone()).collect();
        keys.sort();
        DedupStats {
            pending_count: keys.len(),
            keys,
        }
    }

    /// Drop entries older than `max_age`, settled or not.
    ///
    /// Waiters already holding the shared handle still get the outcome; only
    /// new callers start a fresh execution.
    pub fn purge_stale(&self, max_age: Duration) -> usize {
        let before = self.pending.len();
        self.pending.retain(|key, pending| {
            let keep = pending.created_at.elapsed() < max_age;
            if !keep {
                tracing::warn!(key = %key, age = ?pending.created_at.elapsed(), "Purging stale pending request");
            }
            keep
        });
        let purged = before.saturating_sub(self.pending.len());
        if purged > 0 {
            metrics::record_dedup_purged(purged);
            metrics::record_dedup_pending(self.pending.len());
        }
        purged
    }

    /// Periodically purge stale entries until shutdown.
    pub fn spawn_sweeper(
        &self,
        interval: Duration,
        max_age: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + interval, interval);
            tracing::info!(interval = ?interval, max_age = ?max_age, "Dedup sweeper starting");
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let purged = registry.purge_stale(max_age);
                        tracing::debug!(purged, "Dedup sweep complete");
                    }
                    _ = shutdown.recv() => {
                        tracing::info!("Dedup sweeper received shutdown signal, exiting loop");
                        break;
                    }
                }
            }
        })
    }
}

/// Removes the entry of one generation when the operation finishes,
/// including on panic or runtime shutdown.
struct EvictOnSettle<T> {
    pending: Arc<DashMap<String, PendingRequest<T>>>,
    key: String,
    generation: u64,
}

impl<T> Drop for EvictOnSettle<T> {
    fn drop(&mut self) {
        let generation = self.generation;
        self.pending
            .remove_if(&self.key, |_, pending| pending.generation == generation);
        metrics::record_dedup_pending(self.pending.len());
    }
}
