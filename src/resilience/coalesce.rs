//! In-flight request coalescing.
//!
//! Concurrent callers asking for the same key share one computation. The
//! computation runs as its own task and is awaited through a
//! [`Shared`] future, so no caller (not even the one that started it) can
//! cancel it by going away.

use crate::config::CoalescerConfig;
use crate::error::FetchError;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use lru::LruCache;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Type alias for a computation any number of callers can await.
type SharedComputation<T> = Shared<BoxFuture<'static, Result<T, FetchError>>>;

struct InFlight<T: Clone> {
    id: u64,
    started: Instant,
    future: SharedComputation<T>,
}

struct Registry<T: Clone> {
    entries: LruCache<String, InFlight<T>>,
    next_id: u64,
}

/// Registry of in-flight computations keyed by normalized query.
///
/// Bounded by an LRU capacity and an entry TTL. Both only drop the registry
/// entry: callers already joined to a computation keep awaiting it.
pub struct RequestCoalescer<T: Clone + Send + Sync + 'static> {
    registry: Arc<Mutex<Registry<T>>>,
    ttl: Duration,
}

impl<T: Clone + Send + Sync + 'static> Clone for RequestCoalescer<T> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            ttl: self.ttl,
        }
    }
}

impl<T: Clone + Send + Sync + 'static> std::fmt::Debug for RequestCoalescer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestCoalescer")
            .field("in_flight", &self.in_flight_len())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl<T: Clone + Send + Sync + 'static> RequestCoalescer<T> {
    pub fn new(config: &CoalescerConfig) -> Self {
        let capacity = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            registry: Arc::new(Mutex::new(Registry {
                entries: LruCache::new(capacity),
                next_id: 0,
            })),
            ttl: config.ttl(),
        }
    }

    /// Execute `compute` for `key`, or join the computation already running.
    ///
    /// `compute` is only called when no live entry exists for `key`.
    pub async fn coalesce<F, Fut>(&self, key: &str, compute: F) -> Result<T, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        let future = {
            let mut registry = self.lock();
            let now = Instant::now();
            self.expire(&mut registry, now);

            if let Some(entry) = registry.entries.get(key) {
                tracing::debug!(key, "Joining in-flight computation");
                entry.future.clone()
            } else {
                let id = registry.next_id;
                registry.next_id += 1;
                let future = self.spawn(key, id, compute());

                if let Some((evicted, _)) = registry.entries.push(
                    key.to_string(),
                    InFlight {
                        id,
                        started: now,
                        future: future.clone(),
                    },
                ) {
                    tracing::debug!(key = %evicted, "Evicted in-flight entry");
                }
                tracing::debug!(key, id, "Started computation");
                future
            }
        };

        future.await
    }

    /// Number of registered in-flight computations.
    pub fn in_flight_len(&self) -> usize {
        self.lock().entries.len()
    }

    fn spawn<Fut>(&self, key: &str, id: u64, computation: Fut) -> SharedComputation<T>
    where
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        let registry = Arc::clone(&self.registry);
        let key = key.to_string();

        let handle = tokio::spawn(async move {
            let result = computation.await;
            let mut registry = registry.lock().unwrap_or_else(PoisonError::into_inner);
            // A newer computation may own the key by now.
            if registry.entries.peek(&key).is_some_and(|entry| entry.id == id) {
                registry.entries.pop(&key);
            }
            result
        });

        let joined: BoxFuture<'static, Result<T, FetchError>> =
            async move { handle.await.unwrap_or_else(|e| Err(FetchError::from(e))) }.boxed();
        joined.shared()
    }

    fn expire(&self, registry: &mut Registry<T>, now: Instant) {
        let stale: Vec<String> = registry
            .entries
            .iter()
            .filter(|(_, entry)| now.saturating_duration_since(entry.started) >= self.ttl)
            .map(|(key, _)| key.clone())
            .collect();
        for key in stale {
            registry.entries.pop(&key);
            tracing::debug!(key = %key, "Expired in-flight entry");
        }
    }

    fn lock(&self) -> MutexGuard<'_, Registry<T>> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
