//! Job handler trait and execution context.

use async_trait::async_trait;
use uuid::Uuid;

use synapse_core::{Job, JobType};

/// Context provided to job handlers.
pub struct JobContext {
    /// The job being processed.
    pub job: Job,
}

impl JobContext {
    /// Create a new job context.
    pub fn new(job: Job) -> Self {
        Self { job }
    }

    /// Get the memory ID for this job, if any.
    pub fn memory_id(&self) -> Option<Uuid> {
        self.job.memory_id
    }
}

/// Result of job execution.
#[derive(Debug)]
pub enum JobResult {
    /// Job completed successfully.
    Success,
    /// Job failed permanently; retrying would not help.
    Failed(String),
    /// Job hit a transient error and should be retried.
    Retry(String),
}

/// Trait for job handlers.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// The job type this handler processes.
    fn job_type(&self) -> JobType;

    /// Execute the job.
    async fn execute(&self, ctx: JobContext) -> JobResult;
}
