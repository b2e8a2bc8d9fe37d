//! Retrieval orchestrator: the public entry point for search.
//!
//! Dispatches to the lexical matcher and the vector index per the
//! requested mode, joins the hybrid legs concurrently, fuses scores, and
//! enforces the failure contract: semantic mode surfaces provider/index
//! failures, hybrid mode degrades to lexical-only and flags the response,
//! and a lexical failure is fatal in every mode.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use synapse_core::{
    defaults, EmbeddingBackend, Error, Memory, MemoryRepository, Result, SearchHit, SearchMode,
    SearchResponse, SearchResult, VectorIndex,
};

use crate::fusion::{fuse, FusionConfig};
use crate::lexical::{LexicalMatcher, LexicalWeights};
use crate::normalize::{normalize, NormalizedQuery};

/// Configuration for the retrieval orchestrator.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Fusion weights for hybrid mode.
    pub fusion: FusionConfig,
    /// Per-field weights for lexical scoring.
    pub lexical_weights: LexicalWeights,
    /// Timeout applied to the embedding call; past it the vector leg is
    /// treated as failed (degradation in hybrid, error in semantic mode).
    pub embed_timeout: Duration,
    /// Per-leg over-fetch factor before fusion and capping.
    pub candidate_factor: i64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            fusion: FusionConfig::default(),
            lexical_weights: LexicalWeights::default(),
            embed_timeout: Duration::from_secs(defaults::EMBED_TIMEOUT_SECS),
            candidate_factor: defaults::SEARCH_CANDIDATE_FACTOR,
        }
    }
}

impl SearchConfig {
    /// Set the fusion weights.
    pub fn with_fusion(mut self, fusion: FusionConfig) -> Self {
        self.fusion = fusion;
        self
    }

    /// Set the lexical field weights.
    pub fn with_lexical_weights(mut self, weights: LexicalWeights) -> Self {
        self.lexical_weights = weights;
        self
    }

    /// Set the embedding timeout.
    pub fn with_embed_timeout(mut self, timeout: Duration) -> Self {
        self.embed_timeout = timeout;
        self
    }
}

/// The retrieval orchestrator.
///
/// Holds explicitly injected collaborators; each search call is
/// independent and stateless beyond the underlying stores.
pub struct SearchEngine {
    memories: Arc<dyn MemoryRepository>,
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn EmbeddingBackend>,
    config: SearchConfig,
}

impl SearchEngine {
    /// Create a new engine with default configuration.
    pub fn new(
        memories: Arc<dyn MemoryRepository>,
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn EmbeddingBackend>,
    ) -> Self {
        Self {
            memories,
            index,
            embedder,
            config: SearchConfig::default(),
        }
    }

    /// Override the configuration.
    pub fn with_config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    /// Search an owner's memories.
    ///
    /// See [`SearchRequest`] for a builder over the same operation.
    #[instrument(skip(self, raw_query), fields(
        subsystem = "search",
        component = "engine",
        op = "search",
        owner_id = %owner_id,
        mode = %mode,
        query = raw_query,
    ))]
    pub async fn search(
        &self,
        owner_id: Uuid,
        raw_query: &str,
        mode: SearchMode,
        limit: i64,
    ) -> Result<SearchResponse> {
        self.execute(SearchRequest {
            owner_id,
            query: raw_query.to_string(),
            mode,
            limit,
            content_type: None,
        })
        .await
    }

    /// Execute a search request.
    pub async fn execute(&self, request: SearchRequest) -> Result<SearchResponse> {
        let start = Instant::now();

        if request.limit <= 0 {
            return Err(Error::InvalidInput("limit must be positive".to_string()));
        }

        let mut normalized = normalize(&request.query, chrono::Utc::now());
        if request.content_type.is_some() {
            // An explicit filter wins over one inferred from the text.
            normalized.content_type = request.content_type;
        }

        debug!(
            clean_query = %normalized.clean_query,
            content_type = ?normalized.content_type,
            has_date_filter = normalized.date_range.is_some(),
            tag_count = normalized.tags.len(),
            "Query normalized"
        );

        let response = match request.mode {
            SearchMode::Lexical => {
                self.lexical_only(request.owner_id, &normalized, request.limit)
                    .await?
            }
            SearchMode::Semantic => {
                self.semantic_only(request.owner_id, &normalized, request.limit)
                    .await?
            }
            SearchMode::Hybrid => {
                self.hybrid(request.owner_id, &normalized, request.limit)
                    .await?
            }
        };

        info!(
            subsystem = "search",
            component = "engine",
            op = "search",
            owner_id = %request.owner_id,
            mode = %request.mode,
            result_count = response.count,
            degraded = response.degraded,
            duration_ms = start.elapsed().as_millis() as u64,
            "Search completed"
        );
        Ok(response)
    }

    /// Lexical-only mode: local matching, sorted by score descending.
    async fn lexical_only(
        &self,
        owner_id: Uuid,
        normalized: &NormalizedQuery,
        limit: i64,
    ) -> Result<SearchResponse> {
        if normalized.is_empty() {
            return Err(Error::InvalidInput(
                "query or filters are required".to_string(),
            ));
        }

        let scored = self.lexical_leg(owner_id, normalized, limit).await?;
        Ok(lexical_native(scored, limit, false))
    }

    /// Pure semantic mode: provider or index failures surface to the
    /// caller; no fallback exists here by contract.
    async fn semantic_only(
        &self,
        owner_id: Uuid,
        normalized: &NormalizedQuery,
        limit: i64,
    ) -> Result<SearchResponse> {
        if normalized.clean_query.is_empty() {
            return Err(Error::InvalidInput(
                "semantic search requires query text".to_string(),
            ));
        }

        let hits = self
            .vector_leg(owner_id, normalized, limit * self.config.candidate_factor)
            .await?;
        let (hits, memories) = self.hydrate(hits, normalized).await?;

        let results: Vec<SearchResult> = hits
            .into_iter()
            .take(limit as usize)
            .filter_map(|hit| {
                memories.get(&hit.memory_id).map(|memory| SearchResult {
                    memory: memory.clone(),
                    score: hit.score,
                    reason: hit.reason,
                })
            })
            .collect();

        Ok(build_response(results, false))
    }

    /// Hybrid mode: both legs run concurrently; the vector leg is best
    /// effort and its failure degrades the response to lexical-only.
    async fn hybrid(
        &self,
        owner_id: Uuid,
        normalized: &NormalizedQuery,
        limit: i64,
    ) -> Result<SearchResponse> {
        if normalized.is_empty() {
            return Err(Error::InvalidInput(
                "query or filters are required".to_string(),
            ));
        }

        let candidate_limit = limit * self.config.candidate_factor;
        let (lexical_result, vector_result) = tokio::join!(
            self.lexical_leg(owner_id, normalized, candidate_limit),
            self.vector_leg(owner_id, normalized, candidate_limit),
        );

        // The lexical leg is the floor of hybrid availability: without it
        // there is no fallback path left, so its failure is fatal.
        let lexical = lexical_result?;

        let (vector_hits, degraded) = match vector_result {
            Ok(hits) => (hits, false),
            Err(e) => {
                warn!(
                    subsystem = "search",
                    component = "engine",
                    owner_id = %owner_id,
                    error = %e,
                    degraded = true,
                    "Vector leg failed, serving lexical-only results"
                );
                (Vec::new(), true)
            }
        };

        debug!(
            lexical_hits = lexical.len(),
            semantic_hits = vector_hits.len(),
            "Hybrid legs joined"
        );

        // Fuse only when both legs contributed; otherwise the single
        // available set keeps its native scores.
        if vector_hits.is_empty() {
            return Ok(lexical_native(lexical, limit, degraded));
        }

        // Hits whose memory was deleted or fails the filters drop out
        // here; an all-stale vector leg falls back to native lexical
        // scores just like an empty one.
        let (vector_hits, mut memory_map) = self.hydrate(vector_hits, normalized).await?;
        if vector_hits.is_empty() {
            return Ok(lexical_native(lexical, limit, degraded));
        }
        for (memory, _, _) in &lexical {
            memory_map.insert(memory.id, memory.clone());
        }

        let lexical_hits: Vec<SearchHit> = lexical
            .iter()
            .map(|(memory, score, reason)| SearchHit {
                memory_id: memory.id,
                score: *score,
                reason: reason.clone(),
            })
            .collect();

        if lexical_hits.is_empty() {
            let results: Vec<SearchResult> = vector_hits
                .into_iter()
                .take(limit as usize)
                .filter_map(|hit| {
                    memory_map.get(&hit.memory_id).map(|memory| SearchResult {
                        memory: memory.clone(),
                        score: hit.score,
                        reason: hit.reason,
                    })
                })
                .collect();
            return Ok(build_response(results, degraded));
        }

        let fused = fuse(
            &lexical_hits,
            &vector_hits,
            &self.config.fusion,
            limit as usize,
        );

        let results: Vec<SearchResult> = fused
            .into_iter()
            .filter_map(|hit| {
                memory_map.get(&hit.memory_id).map(|memory| SearchResult {
                    memory: memory.clone(),
                    score: hit.score,
                    reason: hit.reason,
                })
            })
            .collect();

        Ok(build_response(results, degraded))
    }

    /// Run the lexical matcher with the engine's weights.
    async fn lexical_leg(
        &self,
        owner_id: Uuid,
        normalized: &NormalizedQuery,
        limit: i64,
    ) -> Result<Vec<(Memory, f32, String)>> {
        LexicalMatcher::new(self.memories.clone())
            .with_weights(self.config.lexical_weights)
            .search(owner_id, normalized, limit)
            .await
    }

    /// Embed the normalized query and run the owner-scoped similarity
    /// query. An empty clean query yields no vector leg (nothing to
    /// embed) rather than a failure.
    async fn vector_leg(
        &self,
        owner_id: Uuid,
        normalized: &NormalizedQuery,
        k: i64,
    ) -> Result<Vec<SearchHit>> {
        if normalized.clean_query.is_empty() {
            return Ok(Vec::new());
        }

        let embedding = tokio::time::timeout(
            self.config.embed_timeout,
            self.embedder.embed(&normalized.clean_query),
        )
        .await
        .map_err(|_| {
            Error::Embedding(format!(
                "embedding request timed out after {}s",
                self.config.embed_timeout.as_secs()
            ))
        })??;

        let hits = self.index.query(owner_id, &embedding, k).await?;
        Ok(hits
            .into_iter()
            .map(|hit| SearchHit {
                memory_id: hit.memory_id,
                score: hit.score.clamp(0.0, 1.0),
                reason: "Semantic match".to_string(),
            })
            .collect())
    }

    /// Load the memories behind vector hits and drop hits that no longer
    /// resolve (deleted memories, stale index entries) or that fail the
    /// extracted filters, so AND semantics hold across both legs.
    async fn hydrate(
        &self,
        hits: Vec<SearchHit>,
        normalized: &NormalizedQuery,
    ) -> Result<(Vec<SearchHit>, HashMap<Uuid, Memory>)> {
        let ids: Vec<Uuid> = hits.iter().map(|h| h.memory_id).collect();
        let memories = self.memories.get_many(&ids).await?;
        let memory_map: HashMap<Uuid, Memory> = memories
            .into_iter()
            .filter(|m| normalized.filters_match(m))
            .map(|m| (m.id, m))
            .collect();

        let hits = hits
            .into_iter()
            .filter(|h| memory_map.contains_key(&h.memory_id))
            .collect();
        Ok((hits, memory_map))
    }
}

/// Sort lexical leg output by score descending (stable: ties keep the
/// repository's retrieval order), cap, and wrap with native scores.
fn lexical_native(
    mut scored: Vec<(Memory, f32, String)>,
    limit: i64,
    degraded: bool,
) -> SearchResponse {
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(limit as usize);
    build_response(
        scored
            .into_iter()
            .map(|(memory, score, reason)| SearchResult {
                memory,
                score,
                reason,
            })
            .collect(),
        degraded,
    )
}

fn build_response(results: Vec<SearchResult>, degraded: bool) -> SearchResponse {
    SearchResponse {
        count: results.len(),
        results,
        degraded,
    }
}

/// Builder for search requests.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub owner_id: Uuid,
    pub query: String,
    pub mode: SearchMode,
    pub limit: i64,
    /// Explicit content-type filter; overrides one inferred from the
    /// query text.
    pub content_type: Option<synapse_core::ContentType>,
}

impl SearchRequest {
    /// Create a new request with the default mode and limit.
    pub fn new(owner_id: Uuid, query: impl Into<String>) -> Self {
        Self {
            owner_id,
            query: query.into(),
            mode: SearchMode::default(),
            limit: defaults::SEARCH_LIMIT,
            content_type: None,
        }
    }

    /// Set the retrieval mode.
    pub fn with_mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the result limit.
    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    /// Set an explicit content-type filter.
    pub fn with_content_type(mut self, content_type: synapse_core::ContentType) -> Self {
        self.content_type = Some(content_type);
        self
    }

    /// Execute the request against an engine.
    pub async fn execute(self, engine: &SearchEngine) -> Result<SearchResponse> {
        engine.execute(self).await
    }
}
