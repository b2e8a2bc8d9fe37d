//! Job queue repository implementation.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::{Pool, Postgres, Row};
use std::str::FromStr;
use tracing::debug;
use uuid::Uuid;

use synapse_core::{defaults, Error, Job, JobRepository, JobStatus, JobType, Result};

/// PostgreSQL implementation of JobRepository.
#[derive(Clone)]
pub struct PgJobRepository {
    pool: Pool<Postgres>,
}

impl PgJobRepository {
    /// Create a new PgJobRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn row_to_job(row: &sqlx::postgres::PgRow) -> Result<Job> {
        let job_type: String = row.get("job_type");
        let status: String = row.get("status");
        Ok(Job {
            id: row.get("id"),
            memory_id: row.get("memory_id"),
            job_type: JobType::from_str(&job_type).map_err(Error::Job)?,
            status: JobStatus::from_str(&status).map_err(Error::Job)?,
            payload: row.get("payload"),
            error_message: row.get("error_message"),
            attempts: row.get("attempts"),
            max_attempts: row.get("max_attempts"),
            created_at: row.get("created_at"),
            started_at: row.get("started_at"),
            completed_at: row.get("completed_at"),
        })
    }
}

#[async_trait]
impl JobRepository for PgJobRepository {
    async fn queue(
        &self,
        memory_id: Option<Uuid>,
        job_type: JobType,
        payload: Option<JsonValue>,
    ) -> Result<Uuid> {
        let id = Uuid::now_v7();
        sqlx::query(
            "INSERT INTO job (id, memory_id, job_type, status, payload, max_attempts)
             VALUES ($1, $2, $3, 'pending', $4, $5)",
        )
        .bind(id)
        .bind(memory_id)
        .bind(job_type.to_string())
        .bind(payload)
        .bind(defaults::JOB_MAX_ATTEMPTS)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "jobs",
            op = "queue",
            job_id = %id,
            job_type = %job_type,
            "Queued job"
        );
        Ok(id)
    }

    async fn claim_next(&self, job_types: &[JobType]) -> Result<Option<Job>> {
        // FOR UPDATE SKIP LOCKED lets concurrent workers claim distinct
        // jobs without blocking each other.
        let type_clause = if job_types.is_empty() {
            ""
        } else {
            "AND job_type = ANY($1)"
        };
        let sql = format!(
            "WITH next AS (
                 SELECT id FROM job
                 WHERE status = 'pending' {type_clause}
                 ORDER BY created_at
                 LIMIT 1
                 FOR UPDATE SKIP LOCKED
             )
             UPDATE job
             SET status = 'running', started_at = now(), attempts = attempts + 1
             WHERE id IN (SELECT id FROM next)
             RETURNING id, memory_id, job_type, status, payload, error_message,
                       attempts, max_attempts, created_at, started_at, completed_at",
        );

        let mut query = sqlx::query(&sql);
        if !job_types.is_empty() {
            let names: Vec<String> = job_types.iter().map(|t| t.to_string()).collect();
            query = query.bind(names);
        }

        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        row.as_ref().map(Self::row_to_job).transpose()
    }

    async fn complete(&self, job_id: Uuid) -> Result<()> {
        sqlx::query(
            "UPDATE job SET status = 'completed', completed_at = now() WHERE id = $1",
        )
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    async fn fail(&self, job_id: Uuid, error: &str) -> Result<()> {
        // Re-queue while attempts remain; otherwise terminal failure.
        sqlx::query(
            "UPDATE job
             SET status = CASE WHEN attempts >= max_attempts THEN 'failed' ELSE 'pending' END,
                 completed_at = CASE WHEN attempts >= max_attempts THEN now() ELSE NULL END,
                 error_message = $2
             WHERE id = $1",
        )
        .bind(job_id)
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    async fn fail_permanently(&self, job_id: Uuid, error: &str) -> Result<()> {
        sqlx::query(
            "UPDATE job SET status = 'failed', completed_at = now(), error_message = $2
             WHERE id = $1",
        )
        .bind(job_id)
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }
}
