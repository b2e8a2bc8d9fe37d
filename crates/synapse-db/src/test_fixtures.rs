//! In-memory repository implementations for tests.
//!
//! Always compiled so integration tests in other crates (search engine,
//! job worker) can exercise the full retrieval and embedding pipeline
//! without a live Postgres. Behavior mirrors the Pg implementations:
//! owner scoping, AND-filter semantics, newest-first ordering, and the
//! hard-failure contract of the vector index.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use pgvector::Vector;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use synapse_core::{
    CreateMemoryRequest, Error, Job, JobRepository, JobStatus, JobType, Memory, MemoryFilter,
    MemoryRepository, Result, VectorHit, VectorIndex,
};

// =============================================================================
// MEMORY REPOSITORY
// =============================================================================

/// In-memory MemoryRepository.
#[derive(Default)]
pub struct InMemoryMemoryRepository {
    memories: Mutex<Vec<Memory>>,
}

impl InMemoryMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a fully specified memory (tests control ids and timestamps).
    pub fn seed(&self, memory: Memory) {
        self.memories.lock().unwrap().push(memory);
    }

    fn matches(memory: &Memory, filter: &MemoryFilter) -> bool {
        if let Some(content_type) = filter.content_type {
            if memory.content_type != content_type {
                return false;
            }
        }
        if let Some(from) = filter.created_from {
            if memory.created_at < from {
                return false;
            }
        }
        if let Some(to) = filter.created_to {
            if memory.created_at > to {
                return false;
            }
        }
        for tag in &filter.tags {
            let wanted = tag.to_lowercase();
            if !memory.tags.iter().any(|t| t.to_lowercase() == wanted) {
                return false;
            }
        }
        if let Some(text) = filter.text.as_deref().filter(|t| !t.trim().is_empty()) {
            let needle = text.to_lowercase();
            let in_title = memory.title.to_lowercase().contains(&needle);
            let in_content = memory
                .content
                .as_deref()
                .is_some_and(|c| c.to_lowercase().contains(&needle));
            let in_selected = memory
                .selected_text
                .as_deref()
                .is_some_and(|s| s.to_lowercase().contains(&needle));
            let in_tags = memory
                .tags
                .iter()
                .any(|t| t.to_lowercase().contains(&needle));
            if !(in_title || in_content || in_selected || in_tags) {
                return false;
            }
        }
        true
    }
}

#[async_trait]
impl MemoryRepository for InMemoryMemoryRepository {
    async fn insert(&self, owner_id: Uuid, req: CreateMemoryRequest) -> Result<Memory> {
        if req.title.trim().is_empty() {
            return Err(Error::InvalidInput("title must not be empty".to_string()));
        }
        let memory = Memory {
            id: Uuid::now_v7(),
            owner_id,
            title: req.title,
            content: req.content,
            url: req.url,
            selected_text: req.selected_text,
            content_type: req.content_type,
            tags: req.tags,
            created_at: Utc::now(),
        };
        self.memories.lock().unwrap().push(memory.clone());
        Ok(memory)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Memory>> {
        Ok(self
            .memories
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.id == id)
            .cloned())
    }

    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<Memory>> {
        let memories = self.memories.lock().unwrap();
        Ok(memories
            .iter()
            .filter(|m| ids.contains(&m.id))
            .cloned()
            .collect())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.memories.lock().unwrap().retain(|m| m.id != id);
        Ok(())
    }

    async fn list_by_owner(&self, owner_id: Uuid, filter: &MemoryFilter) -> Result<Vec<Memory>> {
        let memories = self.memories.lock().unwrap();
        let mut matched: Vec<Memory> = memories
            .iter()
            .filter(|m| m.owner_id == owner_id && Self::matches(m, filter))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = filter.limit {
            matched.truncate(limit.max(0) as usize);
        }
        Ok(matched)
    }
}

// =============================================================================
// VECTOR INDEX
// =============================================================================

/// In-memory VectorIndex with a toggleable hard-failure mode for
/// degradation tests.
#[derive(Default)]
pub struct InMemoryVectorIndex {
    entries: Mutex<HashMap<Uuid, (Uuid, Vec<f32>)>>,
    failing: AtomicBool,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail with `Error::Index`, as an
    /// unreachable backing index would.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Index("vector index unreachable".to_string()));
        }
        Ok(())
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if mag_a > 0.0 && mag_b > 0.0 {
            dot / (mag_a * mag_b)
        } else {
            0.0
        }
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn upsert(
        &self,
        owner_id: Uuid,
        memory_id: Uuid,
        vector: &Vector,
        _model: &str,
    ) -> Result<()> {
        self.check_available()?;
        self.entries
            .lock()
            .unwrap()
            .insert(memory_id, (owner_id, vector.to_vec()));
        Ok(())
    }

    async fn remove(&self, memory_id: Uuid) -> Result<()> {
        self.check_available()?;
        self.entries.lock().unwrap().remove(&memory_id);
        Ok(())
    }

    async fn query(&self, owner_id: Uuid, vector: &Vector, k: i64) -> Result<Vec<VectorHit>> {
        self.check_available()?;
        let entries = self.entries.lock().unwrap();
        let query_vec = vector.to_vec();
        let mut hits: Vec<VectorHit> = entries
            .iter()
            .filter(|(_, (owner, _))| *owner == owner_id)
            .map(|(id, (_, stored))| VectorHit {
                memory_id: *id,
                score: Self::cosine_similarity(&query_vec, stored),
            })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.memory_id.cmp(&b.memory_id))
        });
        hits.truncate(k.max(0) as usize);
        Ok(hits)
    }
}

// =============================================================================
// JOB REPOSITORY
// =============================================================================

/// In-memory JobRepository.
#[derive(Default)]
pub struct InMemoryJobRepository {
    jobs: Mutex<Vec<Job>>,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all jobs, in creation order.
    pub fn all(&self) -> Vec<Job> {
        self.jobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobRepository for InMemoryJobRepository {
    async fn queue(
        &self,
        memory_id: Option<Uuid>,
        job_type: JobType,
        payload: Option<JsonValue>,
    ) -> Result<Uuid> {
        let job = Job {
            id: Uuid::now_v7(),
            memory_id,
            job_type,
            status: JobStatus::Pending,
            payload,
            error_message: None,
            attempts: 0,
            max_attempts: synapse_core::defaults::JOB_MAX_ATTEMPTS,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        };
        let id = job.id;
        self.jobs.lock().unwrap().push(job);
        Ok(id)
    }

    async fn claim_next(&self, job_types: &[JobType]) -> Result<Option<Job>> {
        let mut jobs = self.jobs.lock().unwrap();
        let next = jobs.iter_mut().find(|j| {
            j.status == JobStatus::Pending
                && (job_types.is_empty() || job_types.contains(&j.job_type))
        });
        Ok(next.map(|job| {
            job.status = JobStatus::Running;
            job.attempts += 1;
            job.started_at = Some(Utc::now());
            job.clone()
        }))
    }

    async fn complete(&self, job_id: Uuid) -> Result<()> {
        let mut jobs = self.jobs.lock().unwrap();
        if let Some(job) = jobs.iter_mut().find(|j| j.id == job_id) {
            job.status = JobStatus::Completed;
            job.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn fail(&self, job_id: Uuid, error: &str) -> Result<()> {
        let mut jobs = self.jobs.lock().unwrap();
        if let Some(job) = jobs.iter_mut().find(|j| j.id == job_id) {
            job.error_message = Some(error.to_string());
            if job.attempts >= job.max_attempts {
                job.status = JobStatus::Failed;
                job.completed_at = Some(Utc::now());
            } else {
                job.status = JobStatus::Pending;
            }
        }
        Ok(())
    }

    async fn fail_permanently(&self, job_id: Uuid, error: &str) -> Result<()> {
        let mut jobs = self.jobs.lock().unwrap();
        if let Some(job) = jobs.iter_mut().find(|j| j.id == job_id) {
            job.error_message = Some(error.to_string());
            job.status = JobStatus::Failed;
            job.completed_at = Some(Utc::now());
        }
        Ok(())
    }
}
