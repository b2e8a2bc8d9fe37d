//! synapse-api - HTTP API server for synapse
//!
//! Binds the capture surface (memory CRUD) and the search operation over
//! the hybrid retrieval engine. Authentication is handled upstream; the
//! owner identity arrives in the `X-Owner-Id` header.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use uuid::Uuid;

use synapse_core::{
    defaults, ContentType, CreateMemoryRequest, EmbeddingBackend, Error, JobRepository, JobType,
    Memory, MemoryFilter, MemoryRepository, SearchMode, SearchResponse, SearchResult, VectorIndex,
};
use synapse_db::Database;
use synapse_inference::OllamaBackend;
use synapse_jobs::{EmbedMemoryHandler, JobWorker, PurgeEmbeddingHandler, WorkerConfig};
use synapse_search::{FusionConfig, SearchConfig, SearchEngine, SearchRequest};

// =============================================================================
// REQUEST ID (UUIDv7)
// =============================================================================

/// Generates time-ordered UUIDv7 request correlation IDs.
///
/// UUIDv7 embeds a Unix timestamp, so IDs sort chronologically, which
/// helps log correlation when debugging production incidents.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

// =============================================================================
// OPENAPI
// =============================================================================

#[derive(OpenApi)]
#[openapi(
    info(
        title = "synapse-api",
        description = "Personal knowledge-capture backend with hybrid retrieval"
    ),
    components(schemas(
        Memory,
        ContentType,
        SearchMode,
        SearchResult,
        SearchResponse,
        CreateMemoryRequest,
    ))
)]
struct ApiDoc;

// =============================================================================
// STATE & ERRORS
// =============================================================================

#[derive(Clone)]
struct AppState {
    memories: Arc<dyn MemoryRepository>,
    index: Arc<dyn VectorIndex>,
    jobs: Arc<dyn JobRepository>,
    engine: Arc<SearchEngine>,
}

/// Wrapper mapping core errors onto HTTP responses.
#[derive(Debug)]
struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        Error::NotFound(_) | Error::MemoryNotFound(_) => StatusCode::NOT_FOUND,
        // Provider/index failures in pure semantic mode surface as an
        // upstream failure, not a client error.
        Error::Embedding(_) | Error::Index(_) | Error::Request(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            warn!(error = %self.0, status = %status, "Request failed");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// Extract the owner identity injected by the upstream gateway.
fn owner_from_headers(headers: &HeaderMap) -> Result<Uuid, ApiError> {
    let value = headers
        .get("x-owner-id")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError(Error::InvalidInput("missing X-Owner-Id header".to_string())))?;
    Uuid::parse_str(value)
        .map_err(|_| ApiError(Error::InvalidInput("invalid X-Owner-Id header".to_string())))
}

// =============================================================================
// SEARCH HANDLERS
// =============================================================================

#[derive(Debug, Deserialize)]
struct SearchBody {
    query: String,
    #[serde(default)]
    mode: Option<SearchMode>,
    #[serde(default)]
    limit: Option<i64>,
    #[serde(default, rename = "type")]
    content_type: Option<ContentType>,
}

async fn search_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<SearchBody>,
) -> Result<Json<SearchResponse>, ApiError> {
    let owner_id = owner_from_headers(&headers)?;

    let mut request = SearchRequest::new(owner_id, body.query)
        .with_mode(body.mode.unwrap_or_default())
        .with_limit(body.limit.unwrap_or(defaults::SEARCH_LIMIT));
    if let Some(content_type) = body.content_type {
        request = request.with_content_type(content_type);
    }

    let response = request.execute(&state.engine).await?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: String,
    #[serde(default)]
    mode: Option<SearchMode>,
    #[serde(default)]
    limit: Option<i64>,
    #[serde(default, rename = "type")]
    content_type: Option<ContentType>,
}

async fn search_get(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let owner_id = owner_from_headers(&headers)?;

    let mut request = SearchRequest::new(owner_id, params.q)
        .with_mode(params.mode.unwrap_or_default())
        .with_limit(params.limit.unwrap_or(defaults::SEARCH_LIMIT));
    if let Some(content_type) = params.content_type {
        request = request.with_content_type(content_type);
    }

    let response = request.execute(&state.engine).await?;
    Ok(Json(response))
}

// =============================================================================
// MEMORY HANDLERS
// =============================================================================

async fn create_memory(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateMemoryRequest>,
) -> Result<(StatusCode, Json<Memory>), ApiError> {
    let owner_id = owner_from_headers(&headers)?;
    let memory = state.memories.insert(owner_id, body).await?;

    // Fire-and-forget: the capture must not block on, or fail because
    // of, embedding work. The durable queue picks it up out-of-band.
    if let Err(e) = state
        .jobs
        .queue(Some(memory.id), JobType::Embedding, None)
        .await
    {
        warn!(
            memory_id = %memory.id,
            error = %e,
            "Failed to queue embedding job; memory will miss semantic search"
        );
    }

    Ok((StatusCode::CREATED, Json(memory)))
}

#[derive(Debug, Deserialize)]
struct ListParams {
    #[serde(default, rename = "type")]
    content_type: Option<ContentType>,
    #[serde(default)]
    search: Option<String>,
    #[serde(default)]
    limit: Option<i64>,
}

async fn list_memories(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let owner_id = owner_from_headers(&headers)?;

    let filter = MemoryFilter {
        content_type: params.content_type,
        text: params.search,
        limit: Some(params.limit.unwrap_or(defaults::PAGE_LIMIT)),
        ..Default::default()
    };
    let memories = state.memories.list_by_owner(owner_id, &filter).await?;

    Ok(Json(json!({
        "data": memories,
        "count": memories.len(),
    })))
}

async fn get_memory(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Memory>, ApiError> {
    let owner_id = owner_from_headers(&headers)?;
    let memory = state
        .memories
        .get(id)
        .await?
        .filter(|m| m.owner_id == owner_id)
        .ok_or(Error::MemoryNotFound(id))?;
    Ok(Json(memory))
}

async fn delete_memory(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let owner_id = owner_from_headers(&headers)?;
    let memory = state
        .memories
        .get(id)
        .await?
        .filter(|m| m.owner_id == owner_id)
        .ok_or(Error::MemoryNotFound(id))?;

    state.memories.delete(memory.id).await?;

    // Best-effort inline removal; on failure a durable purge job keeps
    // cleanup at-least-once so stale vectors never outlive their memory.
    if let Err(e) = state.index.remove(memory.id).await {
        warn!(memory_id = %memory.id, error = %e, "Inline embedding removal failed, queueing purge");
        if let Err(e) = state
            .jobs
            .queue(Some(memory.id), JobType::PurgeEmbedding, None)
            .await
        {
            warn!(memory_id = %memory.id, error = %e, "Failed to queue purge job");
        }
    }

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// MISC HANDLERS
// =============================================================================

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

// =============================================================================
// APP WIRING
// =============================================================================

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api-docs/openapi.json", get(openapi_json))
        .route("/api/search", get(search_get).post(search_post))
        .route("/api/memories", get(list_memories).post(create_memory))
        .route("/api/memories/:id", get(get_memory).delete(delete_memory))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

fn search_config_from_env() -> SearchConfig {
    let vector_weight = std::env::var("SYNAPSE_VECTOR_WEIGHT")
        .ok()
        .and_then(|v| v.parse::<f32>().ok())
        .unwrap_or(defaults::VECTOR_WEIGHT);
    let lexical_weight = std::env::var("SYNAPSE_LEXICAL_WEIGHT")
        .ok()
        .and_then(|v| v.parse::<f32>().ok())
        .unwrap_or(defaults::LEXICAL_WEIGHT);

    SearchConfig::default().with_fusion(FusionConfig::with_weights(vector_weight, lexical_weight))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "synapse_api=info,synapse_search=info,synapse_db=info,synapse_jobs=info,tower_http=info"
                .into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;
    let db = Database::connect(&database_url).await?;
    db.migrate().await?;

    let memories: Arc<dyn MemoryRepository> = Arc::new(db.memories.clone());
    let index: Arc<dyn VectorIndex> = Arc::new(db.index.clone());
    let jobs: Arc<dyn JobRepository> = Arc::new(db.jobs.clone());
    let embedder: Arc<dyn EmbeddingBackend> = Arc::new(OllamaBackend::from_env()?);

    let engine = Arc::new(
        SearchEngine::new(memories.clone(), index.clone(), embedder.clone())
            .with_config(search_config_from_env()),
    );

    let mut worker = JobWorker::new(jobs.clone(), WorkerConfig::from_env());
    worker.register_handler(EmbedMemoryHandler::new(
        memories.clone(),
        index.clone(),
        embedder.clone(),
    ));
    worker.register_handler(PurgeEmbeddingHandler::new(index.clone()));
    let worker_handle = worker.start();

    let state = AppState {
        memories,
        index,
        jobs,
        engine,
    };
    let app = build_router(state);

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(defaults::SERVER_PORT);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "synapse-api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    worker_handle.shutdown().await.ok();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping_client_errors() {
        assert_eq!(
            status_for(&Error::InvalidInput("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&Error::MemoryNotFound(Uuid::nil())),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_status_mapping_upstream_failures() {
        assert_eq!(
            status_for(&Error::Embedding("provider down".into())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&Error::Index("index unreachable".into())),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_status_mapping_internal_fallback() {
        assert_eq!(
            status_for(&Error::Internal("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_owner_from_headers() {
        let mut headers = HeaderMap::new();
        assert!(owner_from_headers(&headers).is_err());

        headers.insert("x-owner-id", "not-a-uuid".parse().unwrap());
        assert!(owner_from_headers(&headers).is_err());

        let owner = Uuid::now_v7();
        headers.insert("x-owner-id", owner.to_string().parse().unwrap());
        assert_eq!(owner_from_headers(&headers).unwrap(), owner);
    }

    #[test]
    fn test_search_body_accepts_type_alias() {
        let body: SearchBody = serde_json::from_str(
            r#"{"query": "rust", "mode": "hybrid", "limit": 5, "type": "article"}"#,
        )
        .unwrap();
        assert_eq!(body.mode, Some(SearchMode::Hybrid));
        assert_eq!(body.limit, Some(5));
        assert_eq!(body.content_type, Some(ContentType::Article));
    }

    #[test]
    fn test_search_body_minimal() {
        let body: SearchBody = serde_json::from_str(r#"{"query": "rust"}"#).unwrap();
        assert!(body.mode.is_none());
        assert!(body.limit.is_none());
        assert!(body.content_type.is_none());
    }
}
