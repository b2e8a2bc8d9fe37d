//! Worker integration tests over in-memory stores: the full capture →
//! queue → embed → index pipeline without a live Postgres.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use synapse_core::{
    ContentType, CreateMemoryRequest, EmbeddingBackend, JobRepository, JobStatus, JobType,
    MemoryRepository, VectorIndex,
};
use synapse_db::test_fixtures::{
    InMemoryJobRepository, InMemoryMemoryRepository, InMemoryVectorIndex,
};
use synapse_inference::MockEmbeddingBackend;
use synapse_jobs::{EmbedMemoryHandler, JobWorker, PurgeEmbeddingHandler, WorkerConfig};

fn capture_request(title: &str) -> CreateMemoryRequest {
    CreateMemoryRequest {
        title: title.to_string(),
        content: Some("content".to_string()),
        url: None,
        selected_text: None,
        content_type: ContentType::Note,
        tags: vec!["test".to_string()],
    }
}

struct Pipeline {
    memories: Arc<InMemoryMemoryRepository>,
    index: Arc<InMemoryVectorIndex>,
    embedder: Arc<MockEmbeddingBackend>,
    jobs: Arc<InMemoryJobRepository>,
}

impl Pipeline {
    fn new() -> Self {
        Self {
            memories: Arc::new(InMemoryMemoryRepository::new()),
            index: Arc::new(InMemoryVectorIndex::new()),
            embedder: Arc::new(MockEmbeddingBackend::new().with_dimension(32)),
            jobs: Arc::new(InMemoryJobRepository::new()),
        }
    }

    fn worker(&self) -> JobWorker {
        let mut worker = JobWorker::new(
            self.jobs.clone(),
            WorkerConfig::default().with_poll_interval(10),
        );
        worker.register_handler(EmbedMemoryHandler::new(
            self.memories.clone(),
            self.index.clone(),
            self.embedder.clone(),
        ));
        worker.register_handler(PurgeEmbeddingHandler::new(self.index.clone()));
        worker
    }

    /// Wait until the queue settles (no pending or running jobs).
    async fn wait_for_drain(&self) {
        for _ in 0..200 {
            let busy = self
                .jobs
                .all()
                .iter()
                .any(|j| matches!(j.status, JobStatus::Pending | JobStatus::Running));
            if !busy {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job queue did not drain");
    }
}

#[tokio::test]
async fn embedding_job_indexes_captured_memory() {
    let pipeline = Pipeline::new();
    let owner = Uuid::now_v7();

    let memory = pipeline
        .memories
        .insert(owner, capture_request("Rust async runtimes"))
        .await
        .unwrap();
    pipeline
        .jobs
        .queue(Some(memory.id), JobType::Embedding, None)
        .await
        .unwrap();

    let handle = pipeline.worker().start();
    pipeline.wait_for_drain().await;
    handle.shutdown().await.unwrap();

    assert_eq!(pipeline.index.len(), 1);
    let query = pipeline.embedder.embed("anything").await.unwrap();
    let hits = pipeline.index.query(owner, &query, 10).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].memory_id, memory.id);

    let jobs = pipeline.jobs.all();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].status, JobStatus::Completed);
}

#[tokio::test]
async fn embedding_job_for_deleted_memory_succeeds_without_indexing() {
    let pipeline = Pipeline::new();
    let owner = Uuid::now_v7();

    let memory = pipeline
        .memories
        .insert(owner, capture_request("Doomed"))
        .await
        .unwrap();
    pipeline
        .jobs
        .queue(Some(memory.id), JobType::Embedding, None)
        .await
        .unwrap();
    pipeline.memories.delete(memory.id).await.unwrap();

    let handle = pipeline.worker().start();
    pipeline.wait_for_drain().await;
    handle.shutdown().await.unwrap();

    assert!(pipeline.index.is_empty());
    assert_eq!(pipeline.jobs.all()[0].status, JobStatus::Completed);
}

#[tokio::test]
async fn transient_embedding_failure_retries_until_exhausted() {
    let pipeline = Pipeline::new();
    let owner = Uuid::now_v7();
    pipeline.embedder.set_failing(true);

    let memory = pipeline
        .memories
        .insert(owner, capture_request("Unlucky"))
        .await
        .unwrap();
    pipeline
        .jobs
        .queue(Some(memory.id), JobType::Embedding, None)
        .await
        .unwrap();

    let handle = pipeline.worker().start();
    pipeline.wait_for_drain().await;
    handle.shutdown().await.unwrap();

    let jobs = pipeline.jobs.all();
    assert_eq!(jobs[0].status, JobStatus::Failed);
    assert_eq!(jobs[0].attempts, jobs[0].max_attempts);
    assert!(jobs[0].error_message.as_deref().unwrap().contains("embedding"));
    assert!(pipeline.index.is_empty());
}

#[tokio::test]
async fn purge_job_removes_index_entry() {
    let pipeline = Pipeline::new();
    let owner = Uuid::now_v7();

    let memory = pipeline
        .memories
        .insert(owner, capture_request("To purge"))
        .await
        .unwrap();
    let vector = pipeline.embedder.embed("to purge").await.unwrap();
    pipeline
        .index
        .upsert(owner, memory.id, &vector, "mock-embed")
        .await
        .unwrap();

    pipeline
        .jobs
        .queue(Some(memory.id), JobType::PurgeEmbedding, None)
        .await
        .unwrap();

    let handle = pipeline.worker().start();
    pipeline.wait_for_drain().await;
    handle.shutdown().await.unwrap();

    assert!(pipeline.index.is_empty());
    assert_eq!(pipeline.jobs.all()[0].status, JobStatus::Completed);
}
