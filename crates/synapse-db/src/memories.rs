//! Memory repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};
use std::str::FromStr;
use uuid::Uuid;

use synapse_core::{
    ContentType, CreateMemoryRequest, Error, Memory, MemoryFilter, MemoryRepository, Result,
};

use crate::escape_like;

/// PostgreSQL implementation of MemoryRepository.
#[derive(Clone)]
pub struct PgMemoryRepository {
    pool: Pool<Postgres>,
}

impl PgMemoryRepository {
    /// Create a new PgMemoryRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn row_to_memory(row: &sqlx::postgres::PgRow) -> Result<Memory> {
        let content_type: String = row.get("content_type");
        let content_type = ContentType::from_str(&content_type).map_err(Error::Internal)?;
        Ok(Memory {
            id: row.get("id"),
            owner_id: row.get("owner_id"),
            title: row.get("title"),
            content: row.get("content"),
            url: row.get("url"),
            selected_text: row.get("selected_text"),
            content_type,
            tags: row.get("tags"),
            created_at: row.get("created_at"),
        })
    }
}

/// Typed parameter for dynamically built list queries.
enum QueryParam {
    Str(String),
    Time(DateTime<Utc>),
}

#[async_trait]
impl MemoryRepository for PgMemoryRepository {
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

        sqlx::query(
            "INSERT INTO memory
                 (id, owner_id, title, content, url, selected_text, content_type, tags, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(memory.id)
        .bind(memory.owner_id)
        .bind(&memory.title)
        .bind(&memory.content)
        .bind(&memory.url)
        .bind(&memory.selected_text)
        .bind(memory.content_type.to_string())
        .bind(&memory.tags)
        .bind(memory.created_at)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(memory)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Memory>> {
        let row = sqlx::query(
            "SELECT id, owner_id, title, content, url, selected_text, content_type, tags, created_at
             FROM memory WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.as_ref().map(Self::row_to_memory).transpose()
    }

    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<Memory>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT id, owner_id, title, content, url, selected_text, content_type, tags, created_at
             FROM memory WHERE id = ANY($1::uuid[])",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter().map(Self::row_to_memory).collect()
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM memory WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    async fn list_by_owner(&self, owner_id: Uuid, filter: &MemoryFilter) -> Result<Vec<Memory>> {
        let mut sql = String::from(
            "SELECT id, owner_id, title, content, url, selected_text, content_type, tags, created_at
             FROM memory WHERE owner_id = $1",
        );
        let mut params: Vec<QueryParam> = Vec::new();

        if let Some(content_type) = filter.content_type {
            params.push(QueryParam::Str(content_type.to_string()));
            sql.push_str(&format!(" AND content_type = ${}", params.len() + 1));
        }
        if let Some(from) = filter.created_from {
            params.push(QueryParam::Time(from));
            sql.push_str(&format!(" AND created_at >= ${}", params.len() + 1));
        }
        if let Some(to) = filter.created_to {
            params.push(QueryParam::Time(to));
            sql.push_str(&format!(" AND created_at <= ${}", params.len() + 1));
        }
        for tag in &filter.tags {
            params.push(QueryParam::Str(tag.to_lowercase()));
            sql.push_str(&format!(
                " AND EXISTS (SELECT 1 FROM unnest(tags) t WHERE LOWER(t) = ${})",
                params.len() + 1
            ));
        }
        if let Some(text) = filter.text.as_deref().filter(|t| !t.trim().is_empty()) {
            params.push(QueryParam::Str(format!("%{}%", escape_like(text))));
            let idx = params.len() + 1;
            sql.push_str(&format!(
                " AND (title ILIKE ${idx} OR content ILIKE ${idx} OR selected_text ILIKE ${idx} \
                 OR EXISTS (SELECT 1 FROM unnest(tags) t WHERE t ILIKE ${idx}))",
            ));
        }

        sql.push_str(" ORDER BY created_at DESC");
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {}", limit.max(0)));
        }

        let mut query = sqlx::query(&sql).bind(owner_id);
        for param in &params {
            query = match param {
                QueryParam::Str(s) => query.bind(s),
                QueryParam::Time(t) => query.bind(t),
            };
        }

        let rows = query.fetch_all(&self.pool).await.map_err(Error::Database)?;
        rows.iter().map(Self::row_to_memory).collect()
    }
}
