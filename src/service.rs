//! Request control flow: admit, check the breaker, coalesce, record.

use crate::config::Config;
use crate::error::{LimitScope, SearchError};
use crate::query::{ParsedQuery, QueryNormalizer, QueryRejection};
use crate::resilience::{CircuitBreaker, CircuitPhase, CounterStore, RateLimiter, RequestCoalescer};
use crate::search::{SearchPipeline, SearchResponse};
use crate::upstream::CatalogFetcher;
use serde::Serialize;
use std::sync::Arc;

/// Point-in-time view of the resilience layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResilienceStatus {
    pub circuit: CircuitPhase,
    pub consecutive_failures: u32,
    /// Seconds until the breaker admits traffic again, when it is not closed.
    pub retry_after_secs: Option<u64>,
    pub in_flight: usize,
}

/// Search entry point shared by every caller.
#[derive(Debug)]
pub struct SearchService {
    normalizer: QueryNormalizer,
    limiter: RateLimiter,
    breaker: Arc<CircuitBreaker>,
    coalescer: RequestCoalescer<Arc<SearchResponse>>,
    pipeline: Arc<SearchPipeline>,
}

impl SearchService {
    pub fn new(
        normalizer: QueryNormalizer,
        limiter: RateLimiter,
        breaker: CircuitBreaker,
        coalescer: RequestCoalescer<Arc<SearchResponse>>,
        pipeline: SearchPipeline,
    ) -> Self {
        Self {
            normalizer,
            limiter,
            breaker: Arc::new(breaker),
            coalescer,
            pipeline: Arc::new(pipeline),
        }
    }

    /// Build a service with an in-memory rate-limit store.
    pub fn from_config(config: &Config, fetcher: Arc<dyn CatalogFetcher>) -> Self {
        Self::with_store(config, fetcher, Arc::new(crate::resilience::InMemoryCounterStore::new()))
    }

    pub fn with_store(
        config: &Config,
        fetcher: Arc<dyn CatalogFetcher>,
        store: Arc<dyn CounterStore>,
    ) -> Self {
        Self::new(
            QueryNormalizer::from_config(config),
            RateLimiter::new(&config.rate_limit, store),
            CircuitBreaker::new(&config.circuit),
            RequestCoalescer::new(&config.coalescer),
            SearchPipeline::from_config(config, fetcher),
        )
    }

    pub const fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// Run one search on behalf of `client_id`.
    ///
    /// Queries with nothing searchable in them are answered `NOT_FOUND`
    /// without consulting the breaker, so they never consume a half-open
    /// probe.
    pub async fn search(
        &self,
        client_id: &str,
        raw: &str,
    ) -> Result<Arc<SearchResponse>, SearchError> {
        let admission = self.limiter.admit(client_id);
        if !admission.allowed {
            return Err(SearchError::RateLimited {
                scope: admission.limited_by.unwrap_or(LimitScope::Global),
                retry_after: admission.retry_after(),
            });
        }

        let query = match self.normalizer.parse(raw) {
            ParsedQuery::Ok(query) => query,
            ParsedQuery::EmptyQuery(query)
            | ParsedQuery::Failure(QueryRejection::NoSearchableText(query)) => {
                tracing::debug!(original = %query.original, "Nothing to search for");
                return Ok(Arc::new(SearchResponse::not_found(query)));
            }
        };

        if self.breaker.is_open() {
            return Err(SearchError::CircuitOpen {
                retry_after: self.breaker.retry_after().unwrap_or_default(),
            });
        }

        let key = query.coalescing_key();
        let pipeline = Arc::clone(&self.pipeline);
        let breaker = Arc::clone(&self.breaker);

        let response = self
            .coalescer
            .coalesce(&key, move || async move {
                match pipeline.run(query).await {
                    Ok(response) => {
                        breaker.record_success();
                        Ok(Arc::new(response))
                    }
                    Err(e) => {
                        breaker.record_failure();
                        Err(e)
                    }
                }
            })
            .await?;

        Ok(response)
    }

    pub fn status(&self) -> ResilienceStatus {
        let circuit = self.breaker.snapshot();
        ResilienceStatus {
            circuit: circuit.phase,
            consecutive_failures: circuit.consecutive_failures,
            retry_after_secs: self.breaker.retry_after().map(|d| d.as_secs()),
            in_flight: self.coalescer.in_flight_len(),
        }
    }
}
