//! Core traits for synapse abstractions.
//!
//! These traits define the interfaces that concrete implementations
//! must satisfy, enabling pluggable backends and testability.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// MEMORY REPOSITORY
// =============================================================================

/// Filters applied when listing an owner's memories.
///
/// All supplied filters combine with AND semantics: a memory must satisfy
/// every one of them. Date bounds are inclusive.
#[derive(Debug, Clone, Default)]
pub struct MemoryFilter {
    /// Content-type equality filter.
    pub content_type: Option<ContentType>,
    /// Created-at lower bound (inclusive).
    pub created_from: Option<DateTime<Utc>>,
    /// Created-at upper bound (inclusive).
    pub created_to: Option<DateTime<Utc>>,
    /// The memory's tag set must contain every listed tag
    /// (case-insensitive).
    pub tags: Vec<String>,
    /// Case-insensitive substring matched against title, content, selected
    /// text, and tags.
    pub text: Option<String>,
    /// Maximum results.
    pub limit: Option<i64>,
}

impl MemoryFilter {
    /// True when no filter fields are set (an unrestricted listing).
    pub fn is_empty(&self) -> bool {
        self.content_type.is_none()
            && self.created_from.is_none()
            && self.created_to.is_none()
            && self.tags.is_empty()
            && self.text.is_none()
    }
}

/// Repository for memory CRUD operations. Every read and write is scoped
/// to a single owner.
#[async_trait]
pub trait MemoryRepository: Send + Sync {
    /// Insert a new memory for the given owner.
    async fn insert(&self, owner_id: Uuid, req: CreateMemoryRequest) -> Result<Memory>;

    /// Get a memory by ID.
    async fn get(&self, id: Uuid) -> Result<Option<Memory>>;

    /// Get several memories by ID. Missing IDs are silently absent from
    /// the result.
    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<Memory>>;

    /// Delete a memory. Idempotent.
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// List an owner's memories matching the filter, newest first.
    async fn list_by_owner(&self, owner_id: Uuid, filter: &MemoryFilter) -> Result<Vec<Memory>>;
}

// =============================================================================
// VECTOR INDEX
// =============================================================================

/// Secondary, eventually-consistent similarity index over memories.
///
/// Every operation takes the owner scope as a required parameter: the
/// interface cannot express a cross-owner query. Queries against an
/// unreachable or unprovisioned index fail with [`crate::Error::Index`],
/// a hard error callers can distinguish from "zero results".
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Store or replace the vector for a memory.
    async fn upsert(
        &self,
        owner_id: Uuid,
        memory_id: Uuid,
        vector: &Vector,
        model: &str,
    ) -> Result<()>;

    /// Delete the vector for a memory. Idempotent.
    async fn remove(&self, memory_id: Uuid) -> Result<()>;

    /// Return up to `k` nearest neighbors for the owner, as
    /// `(memory_id, cosine similarity)` pairs sorted descending by score,
    /// ties broken by memory id.
    async fn query(&self, owner_id: Uuid, vector: &Vector, k: i64) -> Result<Vec<VectorHit>>;
}

// =============================================================================
// EMBEDDING BACKEND
// =============================================================================

/// Backend for embedding generation (text → fixed-length vector).
///
/// Implementations document a maximum input size and truncate longer text
/// deterministically; returned vectors are normalized to unit length for
/// consistent cosine comparison.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Generate embeddings for the given texts.
    ///
    /// Returns a vector of embedding vectors, one per input text.
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vector>>;

    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vector> {
        let texts = [text.to_string()];
        let mut vectors = self.embed_texts(&texts).await?;
        vectors
            .pop()
            .ok_or_else(|| crate::Error::Embedding("provider returned no vectors".to_string()))
    }

    /// Get the expected dimension of embedding vectors.
    fn dimension(&self) -> usize;

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}

// =============================================================================
// JOB REPOSITORY
// =============================================================================

/// Repository for the durable background job queue.
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Queue a new job.
    async fn queue(
        &self,
        memory_id: Option<Uuid>,
        job_type: JobType,
        payload: Option<JsonValue>,
    ) -> Result<Uuid>;

    /// Claim the next pending job whose type is in `job_types`.
    /// An empty slice means "claim any type". Claiming marks the job
    /// running and increments its attempt count.
    async fn claim_next(&self, job_types: &[JobType]) -> Result<Option<Job>>;

    /// Mark a job as completed.
    async fn complete(&self, job_id: Uuid) -> Result<()>;

    /// Record a failure. The job is re-queued for another attempt while
    /// attempts remain, otherwise marked failed.
    async fn fail(&self, job_id: Uuid, error: &str) -> Result<()>;

    /// Mark a job as permanently failed regardless of remaining attempts.
    async fn fail_permanently(&self, job_id: Uuid, error: &str) -> Result<()>;
}
