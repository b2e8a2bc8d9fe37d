//! # synapse-jobs
//!
//! Background job processing for synapse.
//!
//! Embedding generation is deliberately decoupled from the capture write
//! path: creating a memory queues a durable job and returns immediately;
//! this crate's worker claims queued jobs, generates the embedding, and
//! upserts it into the vector index. The intentional read-after-write gap
//! means semantic search may miss very recently captured memories until
//! their embedding lands.

pub mod embed;
pub mod handler;
pub mod worker;

pub use embed::{compose_embedding_text, EmbedMemoryHandler, PurgeEmbeddingHandler};
pub use handler::{JobContext, JobHandler, JobResult};
pub use worker::{JobWorker, WorkerConfig, WorkerEvent, WorkerHandle};
