//! Relevance ranking over catalog candidates.
//!
//! Records from the catalog are extracted into [`CatalogItem`]s, scored by
//! named signals, collapsed to one entry per series and classified into a
//! [`SearchState`]. [`SearchPipeline`] runs those stages in order.

pub mod candidate;
pub mod dedupe;
pub mod pipeline;
pub mod scoring;
pub mod state;

pub use candidate::CatalogItem;
pub use dedupe::{dedupe, series_key};
pub use pipeline::{SearchPipeline, SearchResponse};
pub use scoring::{ScoreBreakdown, ScoredCandidate, rank, score};
pub use state::{SearchState, classify};
