//! Background commit worker.
//!
//! Polls the ingest store for queued commit jobs and runs them one at a
//! time. Claiming is atomic, so several workers (or an API running jobs
//! inline) can share one database without running a job twice.

use std::time::Duration;

use archivist_pipeline::commit::execute_claimed;
use archivist_pipeline::{IngestContext, PipelineResult};
use tokio_util::sync::CancellationToken;

/// Default delay between polls when the queue is empty.
const DEFAULT_POLL_INTERVAL_SECS: u64 = 2;

/// Worker settings loaded from the environment.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub poll_interval: Duration,
}

impl WorkerConfig {
    /// Load settings from environment variables with defaults.
    ///
    /// | Env Var                     | Default |
    /// |-----------------------------|---------|
    /// | `WORKER_POLL_INTERVAL_SECS` | `2`     |
    pub fn from_env() -> Self {
        let secs: u64 = std::env::var("WORKER_POLL_INTERVAL_SECS")
            .unwrap_or_else(|_| DEFAULT_POLL_INTERVAL_SECS.to_string())
            .parse()
            .expect("WORKER_POLL_INTERVAL_SECS must be a valid u64");
        Self {
            poll_interval: Duration::from_secs(secs.max(1)),
        }
    }
}

/// Claims and executes queued commit jobs.
pub struct CommitWorker {
    ctx: IngestContext,
    poll_interval: Duration,
}

impl CommitWorker {
    pub fn new(ctx: IngestContext, config: &WorkerConfig) -> Self {
        Self {
            ctx,
            poll_interval: config.poll_interval,
        }
    }

    /// Poll until `cancel` fires. A job in progress finishes before the
    /// loop observes cancellation.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.poll_interval);
        tracing::info!(poll_secs = self.poll_interval.as_secs(), "Commit worker started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Commit worker cancelled");
                    break;
                }
                _ = interval.tick() => {
                    match self.drain().await {
                        Ok(0) => {}
                        Ok(n) => tracing::info!(jobs = n, "Commit jobs processed"),
                        Err(e) => tracing::error!(error = %e, "Commit worker poll failed"),
                    }
                }
            }
        }
    }

    /// Run every queued job, oldest first. Returns how many were claimed.
    ///
    /// A job that fails is recorded as failed on the job itself; only
    /// store errors while claiming stop the drain.
    pub async fn drain(&self) -> PipelineResult<usize> {
        let mut processed = 0;
        while let Some(job) = self.ctx.store.claim_next_job().await? {
            let job_id = job.id;
            processed += 1;
            match execute_claimed(&self.ctx, job).await {
                Ok(done) => tracing::debug!(job_id, status = ?done.status, "Commit job finished"),
                Err(e) => tracing::error!(job_id, error = %e, "Commit job could not be finalised"),
            }
        }
        Ok(processed)
    }
}
