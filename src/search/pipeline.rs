//! The computation the coalescer wraps: fetch, rank, dedupe, classify.

use super::candidate::CatalogItem;
use super::dedupe::dedupe;
use super::scoring::{ScoredCandidate, rank};
use super::state::{SearchState, classify};
use crate::config::{Config, ScoringWeights, Thresholds, UpstreamConfig};
use crate::error::FetchError;
use crate::query::NormalizedQuery;
use crate::upstream::{CatalogFetcher, CatalogQuery};
use ahash::AHashSet;
use futures::future::try_join_all;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Everything a caller needs to render one search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResponse {
    pub query: NormalizedQuery,
    pub state: SearchState,
    /// Ranked, one entry per series, best first.
    pub results: Vec<ScoredCandidate>,
}

impl SearchResponse {
    /// Response for a query that never reached the catalog.
    pub fn not_found(query: NormalizedQuery) -> Self {
        Self {
            query,
            state: SearchState::not_found(),
            results: Vec::new(),
        }
    }
}

pub struct SearchPipeline {
    fetcher: Arc<dyn CatalogFetcher>,
    weights: ScoringWeights,
    thresholds: Thresholds,
    upstream: UpstreamConfig,
}

impl std::fmt::Debug for SearchPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchPipeline")
            .field("weights", &self.weights)
            .field("thresholds", &self.thresholds)
            .field("upstream", &self.upstream.endpoint)
            .finish_non_exhaustive()
    }
}

impl SearchPipeline {
    pub fn new(
        fetcher: Arc<dyn CatalogFetcher>,
        weights: ScoringWeights,
        thresholds: Thresholds,
        upstream: UpstreamConfig,
    ) -> Self {
        Self {
            fetcher,
            weights,
            thresholds,
            upstream,
        }
    }

    pub fn from_config(config: &Config, fetcher: Arc<dyn CatalogFetcher>) -> Self {
        Self::new(
            fetcher,
            config.scoring,
            config.thresholds,
            config.upstream.clone(),
        )
    }

    /// Upstream requests issued for one query.
    ///
    /// Always a title search; a targeted volume adds a keyword search that
    /// names the volume, since title searches tend to return the opening
    /// volumes first.
    pub fn plan(&self, query: &NormalizedQuery) -> Vec<CatalogQuery> {
        let hits = self.upstream.hits;
        let mut plan = vec![CatalogQuery::by_title(query.normalized.as_str(), hits)];
        if let Some(volume) = query.target_volume {
            plan.push(CatalogQuery::by_keyword(
                format!("{} {}", query.normalized, volume),
                hits,
            ));
        }
        plan
    }

    /// Run the fetch plan under the upstream time budget.
    pub async fn fetch(&self, query: &NormalizedQuery) -> Result<Vec<CatalogItem>, FetchError> {
        let budget = self.upstream.timeout();
        let requests = self
            .plan(query)
            .into_iter()
            .map(|request| self.fetcher.fetch(request));

        let batches = tokio::time::timeout(budget, try_join_all(requests))
            .await
            .map_err(|_| FetchError::Timeout(budget))??;

        Ok(merge_records(batches, self.upstream.max_records))
    }

    /// Turn fetched items into the final response. Pure.
    pub fn assemble(&self, query: NormalizedQuery, items: Vec<CatalogItem>) -> SearchResponse {
        let ranked = rank(items, &query, &self.weights, self.thresholds.ambiguous);
        let mut results = dedupe(ranked);
        results.truncate(self.upstream.max_results);

        let recognized_title = query
            .was_alias_resolved
            .then_some(query.normalized.as_str());
        let state = classify(
            &results,
            query.was_alias_resolved,
            recognized_title,
            &self.thresholds,
        );

        tracing::debug!(
            query = %query.normalized,
            state = state.kind(),
            results = results.len(),
            "Assembled search response"
        );

        SearchResponse {
            query,
            state,
            results,
        }
    }

    pub async fn run(&self, query: NormalizedQuery) -> Result<SearchResponse, FetchError> {
        let items = match self.fetch(&query).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(query = %query.normalized, error = %e, "Catalog fetch failed");
                return Err(e);
            }
        };
        Ok(self.assemble(query, items))
    }
}

/// Flatten batches in plan order, dropping repeated ISBNs (first wins) and
/// capping the total.
fn merge_records(batches: Vec<Vec<Value>>, max_records: usize) -> Vec<CatalogItem> {
    let mut seen: AHashSet<String> = AHashSet::new();
    let mut merged = Vec::new();

    for record in batches.iter().flatten() {
        if merged.len() >= max_records {
            break;
        }
        let item = CatalogItem::from_record(record);
        if !item.isbn.is_empty() && !seen.insert(item.isbn.clone()) {
            continue;
        }
        merged.push(item);
    }

    merged
}
