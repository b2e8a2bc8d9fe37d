//! Vector index implementation over pgvector.
//!
//! A secondary, eventually-consistent index: the memory row is the source
//! of truth, and this table may briefly lag behind it while embedding
//! generation runs out-of-band.

use async_trait::async_trait;
use pgvector::Vector;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;
use uuid::Uuid;

use synapse_core::{Error, Result, VectorHit, VectorIndex};

/// PostgreSQL + pgvector implementation of VectorIndex.
///
/// All failures map to [`Error::Index`] so callers can tell a broken
/// index apart from an empty result set and from relational-store errors.
#[derive(Clone)]
pub struct PgVectorIndex {
    pool: Pool<Postgres>,
}

impl PgVectorIndex {
    /// Create a new PgVectorIndex with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VectorIndex for PgVectorIndex {
    async fn upsert(
        &self,
        owner_id: Uuid,
        memory_id: Uuid,
        vector: &Vector,
        model: &str,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO memory_embedding (memory_id, owner_id, vector, model, updated_at)
             VALUES ($1, $2, $3, $4, now())
             ON CONFLICT (memory_id) DO UPDATE
                 SET owner_id = EXCLUDED.owner_id,
                     vector = EXCLUDED.vector,
                     model = EXCLUDED.model,
                     updated_at = now()",
        )
        .bind(memory_id)
        .bind(owner_id)
        .bind(vector)
        .bind(model)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Index(e.to_string()))?;

        debug!(
            subsystem = "db",
            component = "vector_index",
            op = "upsert",
            memory_id = %memory_id,
            owner_id = %owner_id,
            model = model,
            "Stored embedding"
        );
        Ok(())
    }

    async fn remove(&self, memory_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM memory_embedding WHERE memory_id = $1")
            .bind(memory_id)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Index(e.to_string()))?;
        Ok(())
    }

    async fn query(&self, owner_id: Uuid, vector: &Vector, k: i64) -> Result<Vec<VectorHit>> {
        // Owner scoping in the WHERE clause is a correctness invariant:
        // rows from other owners must never reach the ranking stage.
        let rows = sqlx::query(
            "SELECT memory_id, 1.0 - (vector <=> $2::vector) AS score
             FROM memory_embedding
             WHERE owner_id = $1
             ORDER BY vector <=> $2::vector, memory_id
             LIMIT $3",
        )
        .bind(owner_id)
        .bind(vector)
        .bind(k)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Index(e.to_string()))?;

        let hits = rows
            .into_iter()
            .map(|row| VectorHit {
                memory_id: row.get("memory_id"),
                score: row.get::<f64, _>("score") as f32,
            })
            .collect::<Vec<_>>();

        debug!(
            subsystem = "db",
            component = "vector_index",
            op = "query",
            owner_id = %owner_id,
            result_count = hits.len(),
            "Similarity query complete"
        );
        Ok(hits)
    }
}
