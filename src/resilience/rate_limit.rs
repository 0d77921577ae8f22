//! Dual-scope sliding-window admission control.
//!
//! Every request is counted against its client's window and against one
//! window shared by all clients. Counting goes through a [`CounterStore`] so
//! the in-process log can be swapped for a shared backend; a backend failure
//! admits the request rather than turning an outage into a denial of service.

use crate::config::{RateLimitConfig, WindowConfig};
use crate::error::{LimitScope, StoreError};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Store key of the window shared by every client.
pub const GLOBAL_KEY: &str = "global";

/// Tracked keys beyond which a hit also sweeps idle keys.
const SWEEP_THRESHOLD: usize = 1024;

/// Result of counting one request against one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowHit {
    pub allowed: bool,
    /// Requests still admissible in the current window.
    pub remaining: usize,
    /// When the oldest counted request leaves the window.
    pub reset_at: Instant,
}

/// Backend holding per-key request logs.
///
/// `hit` must be atomic per key: check and record happen as one step.
/// `peek` reports the same state without recording anything.
pub trait CounterStore: Send + Sync {
    fn hit(&self, key: &str, window: &WindowConfig, now: Instant) -> Result<WindowHit, StoreError>;

    fn peek(&self, key: &str, window: &WindowConfig, now: Instant) -> Result<WindowHit, StoreError>;
}

#[derive(Debug)]
struct SlidingLog {
    hits: VecDeque<Instant>,
    period: Duration,
}

impl SlidingLog {
    fn prune(&mut self, now: Instant) {
        while self
            .hits
            .front()
            .is_some_and(|&hit| now.saturating_duration_since(hit) >= self.period)
        {
            self.hits.pop_front();
        }
    }
}

/// Process-local store. Keys whose log empties are dropped.
#[derive(Debug, Default)]
pub struct InMemoryCounterStore {
    logs: Mutex<HashMap<String, SlidingLog>>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently holding at least one request.
    pub fn tracked_keys(&self) -> usize {
        self.logs.lock().map_or(0, |logs| logs.len())
    }
}

impl CounterStore for InMemoryCounterStore {
    fn hit(&self, key: &str, window: &WindowConfig, now: Instant) -> Result<WindowHit, StoreError> {
        let mut logs = self
            .logs
            .lock()
            .map_err(|_| StoreError::Unavailable("counter log lock poisoned".into()))?;

        if logs.len() > SWEEP_THRESHOLD {
            logs.retain(|_, log| {
                log.prune(now);
                !log.hits.is_empty()
            });
        }

        let period = window.window();
        let log = logs.entry(key.to_string()).or_insert_with(|| SlidingLog {
            hits: VecDeque::new(),
            period,
        });
        log.period = period;
        log.prune(now);

        let allowed = log.hits.len() < window.capacity;
        if allowed {
            log.hits.push_back(now);
        }

        let hit = WindowHit {
            allowed,
            remaining: window.capacity.saturating_sub(log.hits.len()),
            reset_at: log.hits.front().map_or(now + period, |&oldest| oldest + period),
        };

        if log.hits.is_empty() {
            logs.remove(key);
        }

        Ok(hit)
    }

    fn peek(&self, key: &str, window: &WindowConfig, now: Instant) -> Result<WindowHit, StoreError> {
        let logs = self
            .logs
            .lock()
            .map_err(|_| StoreError::Unavailable("counter log lock poisoned".into()))?;

        let period = window.window();
        let mut live = logs.get(key).into_iter().flat_map(|log| {
            log.hits
                .iter()
                .filter(move |&&hit| now.saturating_duration_since(hit) < period)
        });
        let oldest = live.next().copied();
        let count = usize::from(oldest.is_some()) + live.count();

        Ok(WindowHit {
            allowed: count < window.capacity,
            remaining: window.capacity.saturating_sub(count),
            reset_at: oldest.map_or(now + period, |oldest| oldest + period),
        })
    }
}

/// Outcome of [`RateLimiter::admit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub allowed: bool,
    pub remaining: usize,
    pub reset_at: Instant,
    /// The window that rejected the request, if any.
    pub limited_by: Option<LimitScope>,
}

impl Admission {
    pub fn retry_after(&self) -> Duration {
        self.reset_at.saturating_duration_since(Instant::now())
    }
}

pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    global: WindowConfig,
    per_client: WindowConfig,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("global", &self.global)
            .field("per_client", &self.per_client)
            .finish_non_exhaustive()
    }
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig, store: Arc<dyn CounterStore>) -> Self {
        Self {
            store,
            global: config.global,
            per_client: config.per_client,
        }
    }

    pub fn in_memory(config: &RateLimitConfig) -> Self {
        Self::new(config, Arc::new(InMemoryCounterStore::new()))
    }

    /// Count one request from `identifier`.
    ///
    /// The client window is consulted first so a single noisy client cannot
    /// drain the shared window with requests it would be refused anyway.
    pub fn admit(&self, identifier: &str) -> Admission {
        let now = Instant::now();
        let client_key = format!("client:{identifier}");

        let client = match self.store.hit(&client_key, &self.per_client, now) {
            Ok(hit) => hit,
            Err(e) => return self.fail_open(&e, now),
        };
        if !client.allowed {
            // A full global window may hold the caller back for longer.
            let reset_at = match self.store.peek(GLOBAL_KEY, &self.global, now) {
                Ok(global) if !global.allowed => client.reset_at.max(global.reset_at),
                Ok(_) => client.reset_at,
                Err(e) => {
                    tracing::debug!(error = %e, "Could not read global window");
                    client.reset_at
                }
            };
            tracing::debug!(client = identifier, "Client window exhausted");
            return Admission {
                allowed: false,
                remaining: 0,
                reset_at,
                limited_by: Some(LimitScope::Client),
            };
        }

        let global = match self.store.hit(GLOBAL_KEY, &self.global, now) {
            Ok(hit) => hit,
            Err(e) => return self.fail_open(&e, now),
        };
        if !global.allowed {
            // Report the later reset when both windows are exhausted.
            let reset_at = if client.remaining == 0 {
                global.reset_at.max(client.reset_at)
            } else {
                global.reset_at
            };
            tracing::debug!(client = identifier, "Global window exhausted");
            return Admission {
                allowed: false,
                remaining: 0,
                reset_at,
                limited_by: Some(LimitScope::Global),
            };
        }

        let binding = if client.remaining <= global.remaining {
            client
        } else {
            global
        };
        Admission {
            allowed: true,
            remaining: binding.remaining,
            reset_at: binding.reset_at,
            limited_by: None,
        }
    }

    fn fail_open(&self, error: &StoreError, now: Instant) -> Admission {
        tracing::warn!(error = %error, "Rate limit store unavailable, admitting request");
        Admission {
            allowed: true,
            remaining: self.per_client.capacity,
            reset_at: now + self.per_client.window(),
            limited_by: None,
        }
    }
}
