use anyhow::Context;
use rmcp::{ServiceExt, transport::stdio};
use shelf_search::{Config, HttpCatalogFetcher, SearchServer, SearchService};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    shelf_search::tracing::init();

    let config = Config::discover()?;
    let fetcher =
        HttpCatalogFetcher::new(&config.upstream).context("Failed to build catalog client")?;
    if config.upstream.application_id.is_empty() {
        tracing::warn!("upstream.application_id is empty; catalog requests will be rejected");
    }

    tracing::info!(
        endpoint = %config.upstream.endpoint,
        aliases = config.aliases.len(),
        "Starting shelf-search MCP server"
    );

    let service = Arc::new(SearchService::from_config(&config, Arc::new(fetcher)));
    let server = SearchServer::new(service);
    let running = server.serve(stdio()).await.inspect_err(|e| {
        tracing::error!("Error serving MCP server: {:?}", e);
    })?;

    running.waiting().await?;

    Ok(())
}
