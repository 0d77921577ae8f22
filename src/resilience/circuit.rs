//! Failure-triggered circuit breaker guarding the catalog.
//!
//! Transitions out of OPEN are lazy: nothing runs in the background, the
//! cool-down is checked whenever the state is read.

use crate::config::CircuitConfig;
use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitPhase {
    /// Requests flow normally.
    #[default]
    Closed,
    /// Requests are rejected until the cool-down elapses.
    Open,
    /// One probe request is allowed to test recovery.
    HalfOpen,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CircuitState {
    pub consecutive_failures: u32,
    pub last_failure: Option<Instant>,
    pub phase: CircuitPhase,
    /// When the current half-open probe was let through.
    pub probe_started: Option<Instant>,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    state: Mutex<CircuitState>,
    failure_threshold: u32,
    cooldown: Duration,
}

impl CircuitBreaker {
    pub fn new(config: &CircuitConfig) -> Self {
        Self {
            state: Mutex::new(CircuitState::default()),
            failure_threshold: config.failure_threshold.max(1),
            cooldown: config.cooldown(),
        }
    }

    /// Whether a request must be rejected right now.
    ///
    /// In HALF_OPEN the first caller gets `false` and becomes the probe; all
    /// others see the circuit as open until the probe reports or its lease
    /// runs out after another cool-down.
    pub fn is_open(&self) -> bool {
        let now = Instant::now();
        let mut state = self.lock();
        self.refresh(&mut state, now);

        let (phase, probe_started) = (state.phase, state.probe_started);
        match phase {
            CircuitPhase::Closed => false,
            CircuitPhase::Open => true,
            CircuitPhase::HalfOpen => match probe_started {
                Some(started) if now.saturating_duration_since(started) < self.cooldown => true,
                _ => {
                    state.probe_started = Some(now);
                    tracing::debug!("Circuit half-open, letting probe through");
                    false
                }
            },
        }
    }

    pub fn record_success(&self) {
        let mut state = self.lock();
        if state.phase != CircuitPhase::Closed {
            tracing::info!(previous = ?state.phase, "Circuit closed");
        }
        *state = CircuitState::default();
    }

    pub fn record_failure(&self) {
        let now = Instant::now();
        let mut state = self.lock();
        self.refresh(&mut state, now);

        state.consecutive_failures = state.consecutive_failures.saturating_add(1);
        state.last_failure = Some(now);

        let trip = match state.phase {
            CircuitPhase::Closed => state.consecutive_failures >= self.failure_threshold,
            CircuitPhase::HalfOpen => true,
            CircuitPhase::Open => false,
        };
        if trip {
            tracing::info!(
                failures = state.consecutive_failures,
                cooldown_secs = self.cooldown.as_secs(),
                "Circuit opened"
            );
            state.phase = CircuitPhase::Open;
            state.probe_started = None;
        }
    }

    pub fn phase(&self) -> CircuitPhase {
        let mut state = self.lock();
        self.refresh(&mut state, Instant::now());
        state.phase
    }

    pub fn snapshot(&self) -> CircuitState {
        let mut state = self.lock();
        self.refresh(&mut state, Instant::now());
        *state
    }

    /// Time until a rejected caller may expect the circuit to let it through.
    pub fn retry_after(&self) -> Option<Duration> {
        let now = Instant::now();
        let mut state = self.lock();
        self.refresh(&mut state, now);

        let since = match state.phase {
            CircuitPhase::Closed => return None,
            CircuitPhase::Open => state.last_failure?,
            CircuitPhase::HalfOpen => state.probe_started?,
        };
        Some(self.cooldown.saturating_sub(now.saturating_duration_since(since)))
    }

    #[doc(hidden)]
    pub fn reset(&self) {
        *self.lock() = CircuitState::default();
    }

    fn refresh(&self, state: &mut CircuitState, now: Instant) {
        if state.phase == CircuitPhase::Open
            && state
                .last_failure
                .is_none_or(|at| now.saturating_duration_since(at) >= self.cooldown)
        {
            tracing::info!("Circuit half-open");
            state.phase = CircuitPhase::HalfOpen;
            state.probe_started = None;
        }
    }

    fn lock(&self) -> MutexGuard<'_, CircuitState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
