//! Primitives guarding the upstream catalog: admission control, a circuit
//! breaker and in-flight request coalescing.

pub mod circuit;
pub mod coalesce;
pub mod rate_limit;

pub use circuit::{CircuitBreaker, CircuitPhase, CircuitState};
pub use coalesce::RequestCoalescer;
pub use rate_limit::{Admission, CounterStore, GLOBAL_KEY, InMemoryCounterStore, RateLimiter, WindowHit};
