//! Embedding job handlers.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use synapse_core::{EmbeddingBackend, JobType, Memory, MemoryRepository, VectorIndex};

use crate::handler::{JobContext, JobHandler, JobResult};

/// Compose the text to embed for a memory: title, content, selected
/// text, and tags, in that order. The embedding backend truncates to its
/// own input limit.
pub fn compose_embedding_text(memory: &Memory) -> String {
    let mut parts: Vec<&str> = vec![memory.title.as_str()];
    if let Some(content) = memory.content.as_deref() {
        parts.push(content);
    }
    if let Some(selected) = memory.selected_text.as_deref() {
        parts.push(selected);
    }
    let tags = memory.tags.join(" ");
    if !tags.is_empty() {
        parts.push(&tags);
    }
    parts.join("\n\n")
}

/// Handler for [`JobType::Embedding`]: load the memory, embed its text,
/// upsert into the vector index.
pub struct EmbedMemoryHandler {
    memories: Arc<dyn MemoryRepository>,
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn EmbeddingBackend>,
}

impl EmbedMemoryHandler {
    /// Create a new handler over the given collaborators.
    pub fn new(
        memories: Arc<dyn MemoryRepository>,
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn EmbeddingBackend>,
    ) -> Self {
        Self {
            memories,
            index,
            embedder,
        }
    }
}

#[async_trait]
impl JobHandler for EmbedMemoryHandler {
    fn job_type(&self) -> JobType {
        JobType::Embedding
    }

    async fn execute(&self, ctx: JobContext) -> JobResult {
        let Some(memory_id) = ctx.memory_id() else {
            return JobResult::Failed("embedding job without memory_id".to_string());
        };

        let memory = match self.memories.get(memory_id).await {
            Ok(Some(memory)) => memory,
            Ok(None) => {
                // Deleted before the job ran. Drop any index entry that
                // may have landed from an earlier attempt and succeed.
                debug!(
                    subsystem = "jobs",
                    memory_id = %memory_id,
                    "Memory gone before embedding, clearing index entry"
                );
                if let Err(e) = self.index.remove(memory_id).await {
                    warn!(memory_id = %memory_id, error = %e, "Failed to clear index entry");
                }
                return JobResult::Success;
            }
            Err(e) => return JobResult::Retry(format!("loading memory: {}", e)),
        };

        let text = compose_embedding_text(&memory);
        let vector = match self.embedder.embed(&text).await {
            Ok(vector) => vector,
            Err(e) => return JobResult::Retry(format!("embedding: {}", e)),
        };

        match self
            .index
            .upsert(memory.owner_id, memory.id, &vector, self.embedder.model_name())
            .await
        {
            Ok(()) => JobResult::Success,
            Err(e) => JobResult::Retry(format!("storing embedding: {}", e)),
        }
    }
}

/// Handler for [`JobType::PurgeEmbedding`]: remove a stale vector-index
/// entry after its memory was deleted. Queued when the inline removal on
/// the delete path fails, so cleanup is at-least-once.
pub struct PurgeEmbeddingHandler {
    index: Arc<dyn VectorIndex>,
}

impl PurgeEmbeddingHandler {
    /// Create a new handler over the given index.
    pub fn new(index: Arc<dyn VectorIndex>) -> Self {
        Self { index }
    }
}

#[async_trait]
impl JobHandler for PurgeEmbeddingHandler {
    fn job_type(&self) -> JobType {
        JobType::PurgeEmbedding
    }

    async fn execute(&self, ctx: JobContext) -> JobResult {
        let Some(memory_id) = ctx.memory_id() else {
            return JobResult::Failed("purge job without memory_id".to_string());
        };

        match self.index.remove(memory_id).await {
            Ok(()) => JobResult::Success,
            Err(e) => JobResult::Retry(format!("removing embedding: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use synapse_core::ContentType;
    use uuid::Uuid;

    fn memory_with(content: Option<&str>, selected: Option<&str>, tags: &[&str]) -> Memory {
        Memory {
            id: Uuid::now_v7(),
            owner_id: Uuid::now_v7(),
            title: "Rust async runtimes".to_string(),
            content: content.map(String::from),
            url: None,
            selected_text: selected.map(String::from),
            content_type: ContentType::Article,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_compose_title_only() {
        let memory = memory_with(None, None, &[]);
        assert_eq!(compose_embedding_text(&memory), "Rust async runtimes");
    }

    #[test]
    fn test_compose_all_parts_in_order() {
        let memory = memory_with(Some("body text"), Some("a selection"), &["rust", "async"]);
        assert_eq!(
            compose_embedding_text(&memory),
            "Rust async runtimes\n\nbody text\n\na selection\n\nrust async"
        );
    }

    #[test]
    fn test_compose_is_deterministic() {
        let memory = memory_with(Some("body"), None, &["a"]);
        assert_eq!(
            compose_embedding_text(&memory),
            compose_embedding_text(&memory)
        );
    }
}
