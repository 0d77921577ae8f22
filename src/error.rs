//! Error handling types and utilities.

use std::time::Duration;

/// A specialized Result type for setup and configuration operations.
///
/// This is an alias for `anyhow::Result` with context added via `.context()` and
/// `.with_context()` methods throughout the codebase.
pub type Result<T> = anyhow::Result<T>;

/// Failure of a single upstream catalog computation.
///
/// This is the only error channel that feeds the circuit breaker. It is `Clone`
/// because every caller joined to a coalesced fetch receives the same value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Transport-level failure (DNS, connect, reset).
    #[error("catalog request failed: {0}")]
    Network(String),
    /// The catalog answered with a non-success status.
    #[error("catalog returned HTTP {status}")]
    Status { status: u16 },
    /// The response body could not be interpreted as a record list.
    #[error("catalog response was malformed: {0}")]
    MalformedBody(String),
    /// The fetch exceeded its time budget.
    #[error("catalog request timed out after {0:?}")]
    Timeout(Duration),
    /// The shared computation panicked or was cancelled by the runtime.
    #[error("catalog computation aborted: {0}")]
    Aborted(String),
}

impl From<tokio::task::JoinError> for FetchError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Aborted(err.to_string())
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            Self::Status {
                status: status.as_u16(),
            }
        } else if err.is_decode() {
            Self::MalformedBody(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Failure of a rate-limit counter backend.
///
/// Never reaches callers; the limiter fails open when it sees one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("counter store unavailable: {0}")]
    Unavailable(String),
}

/// Which admission window rejected a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitScope {
    Global,
    Client,
}

impl std::fmt::Display for LimitScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Global => f.write_str("global"),
            Self::Client => f.write_str("client"),
        }
    }
}

/// Error returned by [`crate::service::SearchService::search`].
///
/// Each variant maps to a distinct, retry-informative response in the caller's
/// transport layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    #[error("rate limit exceeded ({scope}), retry in {}s", retry_after.as_secs().max(1))]
    RateLimited {
        scope: LimitScope,
        retry_after: Duration,
    },
    #[error("catalog temporarily unavailable, retry in {}s", retry_after.as_secs().max(1))]
    CircuitOpen { retry_after: Duration },
    #[error(transparent)]
    Upstream(#[from] FetchError),
}

impl SearchError {
    /// Suggested wait before retrying, if the error is transient by nature.
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } | Self::CircuitOpen { retry_after } => {
                Some(*retry_after)
            }
            Self::Upstream(_) => None,
        }
    }
}
