//! Score fusion: merging the lexical and vector result lists.
//!
//! Weighted-sum fusion over the union of memory ids. A memory appearing
//! in only one list keeps a zero for the missing component: under-coverage
//! is penalized, never masked by the other leg's score. The
//! output ordering is strictly deterministic for identical inputs.

use std::collections::HashMap;

use tracing::debug;
use uuid::Uuid;

use synapse_core::{defaults, SearchHit};

/// Fusion weights. Defaults come from the product's historical 70/30
/// vector/lexical split; treat them as tuning values, not constants.
#[derive(Debug, Clone, Copy)]
pub struct FusionConfig {
    /// Weight applied to the vector-similarity score.
    pub vector_weight: f32,
    /// Weight applied to the lexical score.
    pub lexical_weight: f32,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            vector_weight: defaults::VECTOR_WEIGHT,
            lexical_weight: defaults::LEXICAL_WEIGHT,
        }
    }
}

impl FusionConfig {
    /// Create a config with custom weights.
    pub fn with_weights(vector_weight: f32, lexical_weight: f32) -> Self {
        Self {
            vector_weight,
            lexical_weight,
        }
    }
}

/// Fuse two ranked lists into one, capped to `limit`.
///
/// For each memory id in the union:
/// `combined = vector_weight * vector_score + lexical_weight * lexical_score`
/// with a missing component defaulting to 0. Sorted descending by the
/// combined score; ties break by the original lexical order, then the
/// vector order.
pub fn fuse(
    lexical: &[SearchHit],
    vector: &[SearchHit],
    config: &FusionConfig,
    limit: usize,
) -> Vec<SearchHit> {
    let lexical_rank: HashMap<Uuid, usize> = lexical
        .iter()
        .enumerate()
        .map(|(rank, hit)| (hit.memory_id, rank))
        .collect();
    let vector_rank: HashMap<Uuid, usize> = vector
        .iter()
        .enumerate()
        .map(|(rank, hit)| (hit.memory_id, rank))
        .collect();

    let lexical_by_id: HashMap<Uuid, &SearchHit> =
        lexical.iter().map(|hit| (hit.memory_id, hit)).collect();
    let vector_by_id: HashMap<Uuid, &SearchHit> =
        vector.iter().map(|hit| (hit.memory_id, hit)).collect();

    // Union of ids: lexical order first, then unseen vector ids.
    let mut ids: Vec<Uuid> = Vec::with_capacity(lexical.len() + vector.len());
    for hit in lexical {
        ids.push(hit.memory_id);
    }
    for hit in vector {
        if !lexical_by_id.contains_key(&hit.memory_id) {
            ids.push(hit.memory_id);
        }
    }

    let mut fused: Vec<SearchHit> = ids
        .into_iter()
        .map(|id| {
            let lexical_hit = lexical_by_id.get(&id);
            let vector_hit = vector_by_id.get(&id);
            let lexical_score = lexical_hit.map(|h| h.score).unwrap_or(0.0);
            let vector_score = vector_hit.map(|h| h.score).unwrap_or(0.0);
            let score =
                config.vector_weight * vector_score + config.lexical_weight * lexical_score;

            let reason = match (lexical_hit, vector_hit) {
                (Some(l), Some(_)) => format!("{}; semantic match", l.reason),
                (Some(l), None) => l.reason.clone(),
                (None, Some(v)) => v.reason.clone(),
                (None, None) => unreachable!("id came from one of the lists"),
            };

            SearchHit {
                memory_id: id,
                score,
                reason,
            }
        })
        .collect();

    let rank_of = |map: &HashMap<Uuid, usize>, id: &Uuid| -> usize {
        map.get(id).copied().unwrap_or(usize::MAX)
    };

    fused.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| rank_of(&lexical_rank, &a.memory_id).cmp(&rank_of(&lexical_rank, &b.memory_id)))
            .then_with(|| rank_of(&vector_rank, &a.memory_id).cmp(&rank_of(&vector_rank, &b.memory_id)))
    });
    fused.truncate(limit);

    debug!(
        subsystem = "search",
        component = "fusion",
        lexical_hits = lexical.len(),
        semantic_hits = vector.len(),
        vector_weight = config.vector_weight,
        lexical_weight = config.lexical_weight,
        result_count = fused.len(),
        "Score fusion complete"
    );

    fused
}
