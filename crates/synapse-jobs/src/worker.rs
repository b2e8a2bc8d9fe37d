//! Job worker: claims queued jobs and dispatches them to handlers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use synapse_core::{defaults, Job, JobRepository, JobType};

use crate::handler::{JobContext, JobHandler, JobResult};

/// Configuration for the job worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Polling interval in milliseconds when the queue is empty.
    pub poll_interval_ms: u64,
    /// Maximum number of concurrent jobs.
    pub max_concurrent_jobs: usize,
    /// Whether to enable job processing.
    pub enabled: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: defaults::JOB_POLL_INTERVAL_MS,
            max_concurrent_jobs: defaults::JOB_MAX_CONCURRENT,
            enabled: true,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `JOB_WORKER_ENABLED` | `true` | Enable/disable job processing |
    /// | `JOB_MAX_CONCURRENT` | `4` | Max concurrent jobs |
    /// | `JOB_POLL_INTERVAL_MS` | `500` | Polling interval when queue is empty |
    pub fn from_env() -> Self {
        let enabled = std::env::var("JOB_WORKER_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let max_concurrent_jobs = std::env::var("JOB_MAX_CONCURRENT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults::JOB_MAX_CONCURRENT)
            .max(1);

        let poll_interval_ms = std::env::var("JOB_POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::JOB_POLL_INTERVAL_MS);

        Self {
            poll_interval_ms,
            max_concurrent_jobs,
            enabled,
        }
    }

    /// Create a new config with custom poll interval.
    pub fn with_poll_interval(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Set maximum concurrent jobs.
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent_jobs = max;
        self
    }

    /// Enable or disable job processing.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Event emitted by the job worker.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    /// A job was started.
    JobStarted { job_id: Uuid, job_type: JobType },
    /// A job completed successfully.
    JobCompleted { job_id: Uuid, job_type: JobType },
    /// A job failed (terminally or pending retry).
    JobFailed {
        job_id: Uuid,
        job_type: JobType,
        error: String,
    },
    /// Worker started.
    WorkerStarted,
    /// Worker stopped.
    WorkerStopped,
}

/// Handle for controlling a running worker.
pub struct WorkerHandle {
    shutdown_tx: mpsc::Sender<()>,
    event_rx: broadcast::Receiver<WorkerEvent>,
}

impl WorkerHandle {
    /// Signal the worker to shut down gracefully.
    pub async fn shutdown(&self) -> synapse_core::Result<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| synapse_core::Error::Internal("Failed to send shutdown signal".into()))?;
        Ok(())
    }

    /// Get a receiver for worker events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_rx.resubscribe()
    }
}

/// Job worker that processes jobs from the queue.
pub struct JobWorker {
    jobs: Arc<dyn JobRepository>,
    config: WorkerConfig,
    handlers: HashMap<JobType, Arc<dyn JobHandler>>,
    event_tx: broadcast::Sender<WorkerEvent>,
}

impl JobWorker {
    /// Create a new job worker.
    pub fn new(jobs: Arc<dyn JobRepository>, config: WorkerConfig) -> Self {
        let (event_tx, _) = broadcast::channel(defaults::EVENT_BUS_CAPACITY);
        Self {
            jobs,
            config,
            handlers: HashMap::new(),
            event_tx,
        }
    }

    /// Register a handler for its job type.
    pub fn register_handler<H: JobHandler + 'static>(&mut self, handler: H) {
        let job_type = handler.job_type();
        self.handlers.insert(job_type, Arc::new(handler));
        debug!(?job_type, "Registered job handler");
    }

    /// Start the worker and return a handle for control.
    pub fn start(self) -> WorkerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        let event_rx = self.event_tx.subscribe();

        let worker = Arc::new(self);
        tokio::spawn(async move {
            worker.run(&mut shutdown_rx).await;
        });

        WorkerHandle {
            shutdown_tx,
            event_rx,
        }
    }

    /// Run the worker loop with concurrent job processing.
    ///
    /// Claims up to `max_concurrent_jobs` at a time and processes them
    /// concurrently. Only sleeps when the queue is empty.
    async fn run(self: Arc<Self>, shutdown_rx: &mut mpsc::Receiver<()>) {
        if !self.config.enabled {
            info!("Job worker is disabled, not starting");
            return;
        }
        if self.handlers.is_empty() {
            // claim_next treats an empty type list as "any"; with no
            // handlers that would claim jobs only to fail them.
            warn!("Job worker has no registered handlers, not starting");
            return;
        }

        info!(
            poll_interval_ms = self.config.poll_interval_ms,
            max_concurrent = self.config.max_concurrent_jobs,
            "Job worker started"
        );
        let _ = self.event_tx.send(WorkerEvent::WorkerStarted);

        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);
        let claimable: Vec<JobType> = self.handlers.keys().copied().collect();

        loop {
            if shutdown_rx.try_recv().is_ok() {
                info!("Job worker received shutdown signal");
                break;
            }

            let mut tasks = tokio::task::JoinSet::new();
            for _ in 0..self.config.max_concurrent_jobs {
                match self.jobs.claim_next(&claimable).await {
                    Ok(Some(job)) => {
                        let worker = Arc::clone(&self);
                        tasks.spawn(async move {
                            worker.execute_job(job).await;
                        });
                    }
                    Ok(None) => break,
                    Err(e) => {
                        error!(error = %e, "Failed to claim job");
                        break;
                    }
                }
            }

            if tasks.is_empty() {
                sleep(poll_interval).await;
                continue;
            }

            while tasks.join_next().await.is_some() {}
        }

        let _ = self.event_tx.send(WorkerEvent::WorkerStopped);
    }

    /// Execute one claimed job and record its outcome.
    async fn execute_job(&self, job: Job) {
        let job_id = job.id;
        let job_type = job.job_type;

        debug!(
            subsystem = "jobs",
            component = "worker",
            job_id = %job_id,
            job_type = %job_type,
            attempt = job.attempts,
            "Executing job"
        );
        let _ = self.event_tx.send(WorkerEvent::JobStarted { job_id, job_type });

        let Some(handler) = self.handlers.get(&job_type) else {
            // claim_next only claims registered types, so this is a bug.
            error!(job_id = %job_id, job_type = %job_type, "No handler for claimed job");
            let _ = self
                .jobs
                .fail_permanently(job_id, "no handler registered")
                .await;
            return;
        };

        match handler.execute(JobContext::new(job)).await {
            JobResult::Success => {
                if let Err(e) = self.jobs.complete(job_id).await {
                    error!(job_id = %job_id, error = %e, "Failed to mark job completed");
                }
                let _ = self
                    .event_tx
                    .send(WorkerEvent::JobCompleted { job_id, job_type });
            }
            JobResult::Retry(reason) => {
                warn!(
                    job_id = %job_id,
                    job_type = %job_type,
                    error = %reason,
                    "Job failed, will retry while attempts remain"
                );
                if let Err(e) = self.jobs.fail(job_id, &reason).await {
                    error!(job_id = %job_id, error = %e, "Failed to record job failure");
                }
                let _ = self.event_tx.send(WorkerEvent::JobFailed {
                    job_id,
                    job_type,
                    error: reason,
                });
            }
            JobResult::Failed(reason) => {
                warn!(
                    job_id = %job_id,
                    job_type = %job_type,
                    error = %reason,
                    "Job failed permanently"
                );
                if let Err(e) = self.jobs.fail_permanently(job_id, &reason).await {
                    error!(job_id = %job_id, error = %e, "Failed to record job failure");
                }
                let _ = self.event_tx.send(WorkerEvent::JobFailed {
                    job_id,
                    job_type,
                    error: reason,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_config_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.poll_interval_ms, 500);
        assert_eq!(config.max_concurrent_jobs, 4);
        assert!(config.enabled);
    }

    #[test]
    fn test_worker_config_builders() {
        let config = WorkerConfig::default()
            .with_poll_interval(50)
            .with_max_concurrent(2)
            .with_enabled(false);
        assert_eq!(config.poll_interval_ms, 50);
        assert_eq!(config.max_concurrent_jobs, 2);
        assert!(!config.enabled);
    }
}
