//! Lexical matcher: substring matching with weighted per-field scoring.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use synapse_core::{defaults, Memory, MemoryRepository, Result};

use crate::normalize::NormalizedQuery;

/// Per-field weights for lexical scoring. The weighted sum of matched
/// field indicators is capped at 1.0.
#[derive(Debug, Clone, Copy)]
pub struct LexicalWeights {
    /// Weight when the query appears in the title (largest).
    pub title: f32,
    /// Weight when the query appears in content or selected text.
    pub content: f32,
    /// Weight when the query appears in a tag (smallest).
    pub tag: f32,
}

impl Default for LexicalWeights {
    fn default() -> Self {
        Self {
            title: defaults::TITLE_WEIGHT,
            content: defaults::CONTENT_WEIGHT,
            tag: defaults::TAG_WEIGHT,
        }
    }
}

impl LexicalWeights {
    /// Create custom weights.
    pub fn new(title: f32, content: f32, tag: f32) -> Self {
        Self {
            title,
            content,
            tag,
        }
    }
}

/// Score a memory against a lowercased query string.
///
/// Returns the weighted score and the match reason, or `None` when no
/// field matches. The reason lists matched fields in title/content/tag
/// priority order, e.g. "Matched in title, content".
pub fn score_fields(
    memory: &Memory,
    query: &str,
    weights: &LexicalWeights,
) -> Option<(f32, String)> {
    let mut score = 0.0;
    let mut fields = Vec::new();

    if memory.title.to_lowercase().contains(query) {
        score += weights.title;
        fields.push("title");
    }

    let in_content = memory
        .content
        .as_deref()
        .is_some_and(|c| c.to_lowercase().contains(query));
    let in_selected = memory
        .selected_text
        .as_deref()
        .is_some_and(|s| s.to_lowercase().contains(query));
    if in_content || in_selected {
        score += weights.content;
        fields.push("content");
    }

    if memory.tags.iter().any(|t| t.to_lowercase().contains(query)) {
        score += weights.tag;
        fields.push("tag");
    }

    if fields.is_empty() {
        return None;
    }

    Some((
        score.min(1.0),
        format!("Matched in {}", fields.join(", ")),
    ))
}

/// Lexical matcher over the memory repository.
///
/// Results keep the repository's natural retrieval order (newest first);
/// ranking is the caller's responsibility when merging.
pub struct LexicalMatcher {
    memories: Arc<dyn MemoryRepository>,
    weights: LexicalWeights,
}

impl LexicalMatcher {
    /// Create a new matcher over the given repository.
    pub fn new(memories: Arc<dyn MemoryRepository>) -> Self {
        Self {
            memories,
            weights: LexicalWeights::default(),
        }
    }

    /// Override the field weights.
    pub fn with_weights(mut self, weights: LexicalWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Run the lexical leg for an owner.
    ///
    /// With an empty clean query, returns every memory matching the
    /// extracted filters (filter-only mode). Otherwise scores the
    /// pre-filtered candidates per field.
    pub async fn search(
        &self,
        owner_id: Uuid,
        query: &NormalizedQuery,
        limit: i64,
    ) -> Result<Vec<(Memory, f32, String)>> {
        let filter = query.to_memory_filter(Some(limit));
        let candidates = self.memories.list_by_owner(owner_id, &filter).await?;

        let results: Vec<(Memory, f32, String)> = if query.clean_query.is_empty() {
            candidates
                .into_iter()
                .map(|m| (m, 0.0, "Matched in filters".to_string()))
                .collect()
        } else {
            candidates
                .into_iter()
                .filter_map(|m| {
                    score_fields(&m, &query.clean_query, &self.weights)
                        .map(|(score, reason)| (m, score, reason))
                })
                .collect()
        };

        debug!(
            subsystem = "search",
            component = "lexical",
            op = "search",
            owner_id = %owner_id,
            result_count = results.len(),
            "Lexical retrieval complete"
        );
        Ok(results)
    }
}
