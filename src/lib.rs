//! Japanese-aware title search over a third-party book catalog.
//!
//! Raw queries are normalized (kana variants, full-width digits, volume
//! numbers, abbreviations), sent to the catalog, and the returned records are
//! ranked, collapsed per series and classified into a [`SearchState`]. The
//! catalog call is guarded by a rate limiter, a circuit breaker and an
//! in-flight request coalescer.

pub mod config;
pub mod error;
pub mod query;
pub mod resilience;
pub mod search;
pub mod server;
pub mod service;
pub mod tracing;
pub mod upstream;

pub use config::Config;
pub use error::{FetchError, LimitScope, Result, SearchError, StoreError};
pub use query::{NormalizedQuery, ParsedQuery, QueryNormalizer};
pub use search::{CatalogItem, ScoredCandidate, SearchPipeline, SearchResponse, SearchState};
pub use server::SearchServer;
pub use service::{ResilienceStatus, SearchService};
pub use upstream::{CatalogFetcher, CatalogQuery, HttpCatalogFetcher};
