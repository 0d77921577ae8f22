//! MCP server exposing the search service over stdio.

use crate::error::SearchError;
use crate::service::SearchService;
use rmcp::{
    ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::*,
    schemars::{self, JsonSchema, generate::SchemaSettings},
    tool, tool_handler, tool_router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Client identifier used when the caller does not name one.
pub const DEFAULT_CLIENT_ID: &str = "stdio";

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchBooksRequest {
    /// Free-form title query, e.g. "ワンピ 108" or "鬼滅の刃 第23巻"
    pub query: String,
    /// Identifier used for per-client rate limiting (default: "stdio")
    #[serde(default)]
    pub client_id: Option<String>,
}

/// Error body returned to MCP clients.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after_secs: Option<u64>,
}

impl From<&SearchError> for ErrorBody {
    fn from(err: &SearchError) -> Self {
        let error = match err {
            SearchError::RateLimited { .. } => "rate_limited",
            SearchError::CircuitOpen { .. } => "circuit_open",
            SearchError::Upstream(_) => "upstream_failure",
        };
        Self {
            error,
            message: err.to_string(),
            // Round up so a client never retries early.
            retry_after_secs: err
                .retry_after()
                .map(|d| d.as_secs() + u64::from(d.subsec_nanos() > 0)),
        }
    }
}

/// MCP server for manga and book title search
#[derive(Clone)]
pub struct SearchServer {
    service: Arc<SearchService>,

    /// Tool router for handling MCP tool calls
    tool_router: ToolRouter<Self>,
}

impl std::fmt::Debug for SearchServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchServer")
            .field("service", &self.service)
            .finish()
    }
}

#[tool_router]
impl SearchServer {
    pub fn new(service: Arc<SearchService>) -> Self {
        Self {
            service,
            tool_router: Self::tool_router(),
        }
    }

    pub const fn service(&self) -> &Arc<SearchService> {
        &self.service
    }

    #[tool(
        description = "Search the book catalog for a manga or book title. Understands abbreviations, kana variants and volume numbers (\"ワンピ 108\", \"進撃 3巻\"). Returns the match state (CONFIDENT_MATCH, AMBIGUOUS_MATCH, TITLE_ONLY, NOT_FOUND) and ranked candidates with score breakdowns as JSON.",
        input_schema = inline_schema_for_type::<SearchBooksRequest>()
    )]
    async fn search_books(
        &self,
        Parameters(request): Parameters<SearchBooksRequest>,
    ) -> std::result::Result<String, String> {
        let client_id = request
            .client_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or(DEFAULT_CLIENT_ID);

        match self.service.search(client_id, &request.query).await {
            Ok(response) => to_json(response.as_ref()),
            Err(e) => {
                tracing::debug!(error = %e, "Search rejected");
                Err(to_json(&ErrorBody::from(&e))?)
            }
        }
    }

    #[tool(
        description = "Report the state of the upstream circuit breaker and the number of in-flight catalog requests."
    )]
    async fn resilience_status(&self) -> std::result::Result<String, String> {
        to_json(&self.service.status())
    }
}

#[tool_handler]
impl ServerHandler for SearchServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo::new(ServerCapabilities::builder().enable_tools().build())
            .with_protocol_version(ProtocolVersion::V_2024_11_05)
            .with_server_info(Implementation::from_build_env())
            .with_instructions(
                "shelf-search: Japanese-aware book and manga title search. \
                 Use search_books with the title as a reader would type it; \
                 abbreviations and volume numbers are resolved automatically.",
            )
    }
}

fn to_json<T: Serialize>(value: &T) -> std::result::Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("Failed to encode response: {}", e))
}

/// Generate an inline JSON schema for MCP tools
///
/// Unlike rmcp's default `schema_for_type()`, this function sets `inline_subschemas = true`
/// so nested types render inline instead of as `$ref` patterns.
pub fn inline_schema_for_type<T: JsonSchema>() -> Arc<JsonObject> {
    let mut settings = SchemaSettings::draft07();
    settings.transforms = vec![Box::new(schemars::transform::AddNullable::default())];
    settings.inline_subschemas = true;

    let generator = settings.into_generator();
    let schema = generator.into_root_schema_for::<T>();
    let object = serde_json::to_value(schema).expect("failed to serialize schema");

    let json_object = match object {
        serde_json::Value::Object(object) => object,
        _ => panic!("Schema serialization produced non-object value"),
    };

    Arc::new(json_object)
}
