//! Shared test fixtures and utilities for integration tests.
//!
//! # Available Fixtures
//!
//! - `catalog`: a [`MockCatalog`] preloaded with a small ONE PIECE shelf
//! - `empty_catalog`: a [`MockCatalog`] that answers every request with no records
//!
//! Services are built with [`service`] from any [`Config`], so a test can
//! shrink windows or thresholds without touching the fixtures.
//!
//! [`TempConfig`] writes a TOML file into a temporary directory for tests
//! that exercise config loading end to end.

#![allow(dead_code)] // Helpers are shared across integration test crates

use futures::FutureExt;
use futures::future::BoxFuture;
use rstest::fixture;
use serde_json::{Value, json};
use shelf_search::{CatalogFetcher, CatalogQuery, Config, FetchError, SearchService};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Builds one wrapped catalog record.
pub fn record(title: &str, isbn: &str) -> Value {
    json!({
        "Item": {
            "title": title,
            "author": "尾田 栄一郎",
            "publisherName": "集英社",
            "isbn": isbn,
            "largeImageUrl": format!("https://img.example.test/{isbn}.jpg"),
        }
    })
}

/// Scriptable catalog that counts every request it receives.
#[derive(Clone, Default)]
pub struct MockCatalog {
    records: Arc<Vec<Value>>,
    failure: Arc<Mutex<Option<FetchError>>>,
    delay: Duration,
    calls: Arc<AtomicUsize>,
    queries: Arc<Mutex<Vec<CatalogQuery>>>,
}

impl MockCatalog {
    pub fn with_records(records: Vec<Value>) -> Self {
        Self {
            records: Arc::new(records),
            ..Self::default()
        }
    }

    /// Every request takes `delay` before answering.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Make every following request fail with `error`.
    pub fn fail_with(&self, error: FetchError) {
        *self.failure.lock().unwrap() = Some(error);
    }

    pub fn recover(&self) {
        *self.failure.lock().unwrap() = None;
    }

    /// Number of upstream requests received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<CatalogQuery> {
        self.queries.lock().unwrap().clone()
    }
}

impl CatalogFetcher for MockCatalog {
    fn fetch(&self, query: CatalogQuery) -> BoxFuture<'static, Result<Vec<Value>, FetchError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query);

        let records = Vec::clone(&self.records);
        let failure = self.failure.lock().unwrap().clone();
        let delay = self.delay;

        async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            match failure {
                Some(error) => Err(error),
                None => Ok(records),
            }
        }
        .boxed()
    }
}

#[fixture]
pub fn catalog() -> MockCatalog {
    MockCatalog::with_records(vec![
        record("ONE PIECE 1", "9784088725093"),
        record("ONE PIECE 107", "9784088836607"),
        record("ONE PIECE 108", "9784088837000"),
        record("ONE PIECE FILM RED 公式ガイドブック", "9784088836959"),
        record("ONE PIECE 愛蔵版 1", "9784089080001"),
    ])
}

#[fixture]
pub fn empty_catalog() -> MockCatalog {
    MockCatalog::default()
}

/// Service wired to `catalog` with an in-memory rate-limit store.
pub fn service(config: &Config, catalog: &MockCatalog) -> SearchService {
    SearchService::from_config(config, Arc::new(catalog.clone()))
}

/// A config file in its own temporary directory.
pub struct TempConfig {
    _temp: TempDir,
    path: PathBuf,
}

impl TempConfig {
    /// Writes `content` to `config.toml` in a fresh temporary directory.
    ///
    /// # Panics
    /// Panics if the directory or file cannot be created.
    pub fn new(content: &str) -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let path = temp.path().join("config.toml");
        std::fs::write(&path, content)
            .unwrap_or_else(|e| panic!("Failed to write '{}': {}", path.display(), e));
        Self { _temp: temp, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
