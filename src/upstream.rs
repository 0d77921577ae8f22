//! Boundary to the bibliographic catalog API.
//!
//! The pipeline only ever sees [`CatalogFetcher`]; production wires in
//! [`HttpCatalogFetcher`], tests pass closures.

use crate::config::UpstreamConfig;
use crate::error::FetchError;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;
use std::future::Future;

/// Parameters of a single catalog request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogQuery {
    pub title: Option<String>,
    pub keyword: Option<String>,
    pub isbn: Option<String>,
    pub hits: u32,
}

impl CatalogQuery {
    pub fn by_title(title: impl Into<String>, hits: u32) -> Self {
        Self {
            title: Some(title.into()),
            hits,
            ..Self::default()
        }
    }

    pub fn by_keyword(keyword: impl Into<String>, hits: u32) -> Self {
        Self {
            keyword: Some(keyword.into()),
            hits,
            ..Self::default()
        }
    }
}

/// Source of untyped catalog records.
pub trait CatalogFetcher: Send + Sync {
    fn fetch(&self, query: CatalogQuery) -> BoxFuture<'static, Result<Vec<Value>, FetchError>>;
}

impl<F, Fut> CatalogFetcher for F
where
    F: Fn(CatalogQuery) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<Value>, FetchError>> + Send + 'static,
{
    fn fetch(&self, query: CatalogQuery) -> BoxFuture<'static, Result<Vec<Value>, FetchError>> {
        self(query).boxed()
    }
}

/// Catalog client for a Rakuten-Books-style JSON search endpoint.
#[derive(Debug, Clone)]
pub struct HttpCatalogFetcher {
    client: reqwest::Client,
    endpoint: String,
    application_id: String,
}

impl HttpCatalogFetcher {
    pub fn new(config: &UpstreamConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            application_id: config.application_id.clone(),
        })
    }

    fn params(&self, query: &CatalogQuery) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("format", "json".to_string()),
            ("applicationId", self.application_id.clone()),
            ("hits", query.hits.to_string()),
        ];
        if let Some(title) = &query.title {
            params.push(("title", title.clone()));
        }
        if let Some(keyword) = &query.keyword {
            params.push(("keyword", keyword.clone()));
        }
        if let Some(isbn) = &query.isbn {
            params.push(("isbn", isbn.clone()));
        }
        params
    }
}

impl CatalogFetcher for HttpCatalogFetcher {
    fn fetch(&self, query: CatalogQuery) -> BoxFuture<'static, Result<Vec<Value>, FetchError>> {
        let request = self.client.get(&self.endpoint).query(&self.params(&query));

        async move {
            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status {
                    status: status.as_u16(),
                });
            }

            let body: Value = response
                .json()
                .await
                .map_err(|e| FetchError::MalformedBody(e.to_string()))?;
            records_from_body(body)
        }
        .boxed()
    }
}

/// Pull the record list out of a response body.
///
/// Accepts `{"Items": [...]}`, `{"items": [...]}` or a bare array.
pub fn records_from_body(body: Value) -> Result<Vec<Value>, FetchError> {
    match body {
        Value::Array(records) => Ok(records),
        Value::Object(mut object) => match object.remove("Items").or_else(|| object.remove("items")) {
            Some(Value::Array(records)) => Ok(records),
            Some(Value::Null) | None if object.contains_key("error") => Err(
                FetchError::MalformedBody(format!(
                    "catalog error: {}",
                    object.get("error_description").or_else(|| object.get("error")).unwrap_or(&Value::Null)
                )),
            ),
            Some(Value::Null) | None => Ok(Vec::new()),
            Some(other) => Err(FetchError::MalformedBody(format!(
                "expected an item array, found {}",
                json_kind(&other)
            ))),
        },
        other => Err(FetchError::MalformedBody(format!(
            "expected an object, found {}",
            json_kind(&other)
        ))),
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{check, let_assert};
    use serde_json::json;

    #[test]
    fn test_records_from_wrapped_body() {
        let body = json!({"count": 1, "Items": [{"Item": {"title": "ONE PIECE 1"}}]});
        let_assert!(Ok(records) = records_from_body(body));
        check!(records.len() == 1);
    }

    #[test]
    fn test_records_from_empty_and_bare_bodies() {
        check!(records_from_body(json!({"count": 0})) == Ok(Vec::new()));
        check!(records_from_body(json!([{"title": "x"}])).map(|r| r.len()) == Ok(1));
    }

    #[test]
    fn test_records_from_malformed_bodies() {
        let_assert!(Err(FetchError::MalformedBody(msg)) = records_from_body(json!({"Items": 3})));
        check!(msg.contains("a number"));

        let_assert!(
            Err(FetchError::MalformedBody(msg)) =
                records_from_body(json!({"error": "wrong_parameter", "error_description": "keyword is not valid"}))
        );
        check!(msg.contains("keyword is not valid"));

        let_assert!(Err(FetchError::MalformedBody(_)) = records_from_body(json!("nope")));
    }

    #[tokio::test]
    async fn test_closure_fetcher() {
        let fetcher = |query: CatalogQuery| async move {
            Ok::<_, FetchError>(vec![json!({ "title": query.title.unwrap_or_default() })])
        };
        let records = fetcher.fetch(CatalogQuery::by_title("BLEACH", 5)).await.unwrap();
        check!(records[0]["title"] == "BLEACH");
    }

    #[test]
    fn test_params_include_only_present_fields() {
        let fetcher = HttpCatalogFetcher::new(&UpstreamConfig::default()).unwrap();
        let params = fetcher.params(&CatalogQuery::by_keyword("ONE PIECE 3", 30));
        let names: Vec<&str> = params.iter().map(|(name, _)| *name).collect();
        check!(names == vec!["format", "applicationId", "hits", "keyword"]);
    }
}
