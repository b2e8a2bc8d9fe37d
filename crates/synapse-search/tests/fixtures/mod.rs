//! Shared fixtures for search engine integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use synapse_core::{ContentType, EmbeddingBackend, Memory, Result, Vector, VectorHit, VectorIndex};
use synapse_db::test_fixtures::{InMemoryMemoryRepository, InMemoryVectorIndex};
use synapse_inference::MockEmbeddingBackend;
use synapse_search::SearchEngine;

/// Build a memory owned by `owner` with sensible defaults.
pub fn memory(owner: Uuid, title: &str, content_type: ContentType) -> Memory {
    Memory {
        id: Uuid::now_v7(),
        owner_id: owner,
        title: title.to_string(),
        content: None,
        url: None,
        selected_text: None,
        content_type,
        tags: Vec::new(),
        created_at: Utc::now(),
    }
}

/// A vector index that returns a scripted hit list for every query.
/// Stands in for a remote ANN backend whose scores the test controls.
#[derive(Default)]
pub struct ScriptedVectorIndex {
    hits: Vec<VectorHit>,
}

impl ScriptedVectorIndex {
    pub fn returning(hits: Vec<VectorHit>) -> Self {
        Self { hits }
    }
}

#[async_trait]
impl VectorIndex for ScriptedVectorIndex {
    async fn upsert(
        &self,
        _owner_id: Uuid,
        _memory_id: Uuid,
        _vector: &Vector,
        _model: &str,
    ) -> Result<()> {
        Ok(())
    }

    async fn remove(&self, _memory_id: Uuid) -> Result<()> {
        Ok(())
    }

    async fn query(&self, _owner_id: Uuid, _vector: &Vector, k: i64) -> Result<Vec<VectorHit>> {
        let mut hits = self.hits.clone();
        hits.truncate(k.max(0) as usize);
        Ok(hits)
    }
}

/// A complete in-memory world for engine tests.
pub struct TestWorld {
    pub memories: Arc<InMemoryMemoryRepository>,
    pub index: Arc<InMemoryVectorIndex>,
    pub embedder: Arc<MockEmbeddingBackend>,
}

impl TestWorld {
    pub fn new() -> Self {
        Self {
            memories: Arc::new(InMemoryMemoryRepository::new()),
            index: Arc::new(InMemoryVectorIndex::new()),
            embedder: Arc::new(MockEmbeddingBackend::new().with_dimension(64)),
        }
    }

    /// Build an engine over this world's stores.
    pub fn engine(&self) -> SearchEngine {
        SearchEngine::new(
            self.memories.clone(),
            self.index.clone(),
            self.embedder.clone(),
        )
    }

    /// Seed a memory and index its title embedding, as the background
    /// embedding job would.
    pub async fn seed_indexed(&self, memory: Memory) -> Memory {
        self.memories.seed(memory.clone());
        let vector = self.embedder.embed(&memory.title.to_lowercase()).await.unwrap();
        self.index
            .upsert(memory.owner_id, memory.id, &vector, "mock-embed")
            .await
            .unwrap();
        memory
    }
}
