//! Job Runner
//!
//! In-process registry of asynchronous searches. `submit` registers a job
//! and spawns its worker; the worker reports progress through a
//! [`ProgressReporter`] and ends in `completed` or `failed`.
//!
//! One job per cache key may be queued or processing at a time: resubmitting
//! an in-flight key returns the existing id. The registry lock is never held
//! across an await.
//!
//! Finished jobs stay pollable for the retention window, then `sweep` drops
//! them.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::job::{Job, JobStatus};
use crate::search::service::SearchPage;

/// Progress the worker reports when it picks a job up.
pub const PROGRESS_STARTED: u8 = 20;
const PROGRESS_DONE: u8 = 100;

#[derive(Default)]
struct Registry {
    jobs: HashMap<Uuid, Job>,
    in_flight: HashMap<String, Uuid>,
}

impl Registry {
    /// Applies `f` to a non-terminal job. Terminal jobs are frozen.
    fn update(&mut self, id: Uuid, f: impl FnOnce(&mut Job)) {
        if let Some(job) = self.jobs.get_mut(&id) {
            if job.status.is_terminal() {
                return;
            }
            f(job);
            job.updated_at = Utc::now();
            if job.status.is_terminal() && self.in_flight.get(&job.cache_key) == Some(&id) {
                self.in_flight.remove(&job.cache_key);
            }
        }
    }
}

/// Handle a worker uses to publish progress for its own job.
#[derive(Clone)]
pub struct ProgressReporter {
    id: Uuid,
    registry: Arc<Mutex<Registry>>,
}

impl ProgressReporter {
    /// Raises progress to `percent`. Lower values and values at or above 100
    /// (reserved for completion) are clamped.
    pub fn report(&self, percent: u8) {
        self.registry.lock().update(self.id, |job| {
            job.progress = job.progress.max(percent.min(PROGRESS_DONE - 1));
        });
    }
}

#[derive(Clone)]
pub struct JobRunner {
    registry: Arc<Mutex<Registry>>,
    retention: Duration,
}

impl JobRunner {
    /// `retention` is how long a completed or failed job stays pollable.
    pub fn new(retention: std::time::Duration) -> Self {
        Self {
            registry: Arc::default(),
            retention: Duration::from_std(retention).unwrap_or(Duration::MAX),
        }
    }

    /// Registers a job for `cache_key` and spawns `work` for it, or returns
    /// the id of the job already queued or processing for that key.
    pub fn submit<F, Fut>(&self, cache_key: String, page: usize, page_size: usize, work: F) -> Uuid
    where
        F: FnOnce(ProgressReporter) -> Fut + Send + 'static,
        Fut: Future<Output = Result<SearchPage, AppError>> + Send + 'static,
    {
        let id = {
            let mut registry = self.registry.lock();
            if let Some(existing) = registry.in_flight.get(&cache_key) {
                info!("Search {} already in flight as job {}", cache_key, existing);
                return *existing;
            }
            let job = Job::queued(cache_key.clone(), page, page_size);
            let id = job.id;
            registry.in_flight.insert(cache_key, id);
            registry.jobs.insert(id, job);
            id
        };
        info!("Job {} queued", id);

        let registry = Arc::clone(&self.registry);
        tokio::spawn(async move {
            registry.lock().update(id, |job| {
                job.status = JobStatus::Processing;
                job.progress = job.progress.max(PROGRESS_STARTED);
            });

            let reporter = ProgressReporter {
                id,
                registry: Arc::clone(&registry),
            };
            // Run the work in its own task so a panic still fails the job.
            let outcome = tokio::spawn(work(reporter)).await;

            let mut registry = registry.lock();
            match outcome {
                Ok(Ok(page)) => {
                    info!("Job {} completed with {} candidates", id, page.total);
                    registry.update(id, |job| {
                        job.status = JobStatus::Completed;
                        job.progress = PROGRESS_DONE;
                        job.result = Some(page);
                    });
                }
                Ok(Err(e)) => {
                    warn!("Job {} failed: {}", id, e);
                    registry.update(id, |job| {
                        job.status = JobStatus::Failed;
                        job.error = Some(format!("{}: {e}", e.code()));
                    });
                }
                Err(e) => {
                    warn!("Job {} worker aborted: {}", id, e);
                    registry.update(id, |job| {
                        job.status = JobStatus::Failed;
                        job.error = Some(format!("worker aborted: {e}"));
                    });
                }
            }
        });

        id
    }

    /// Drops terminal jobs that finished more than the retention window ago.
    /// Returns how many went.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Utc::now())
    }

    pub fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let mut registry = self.registry.lock();
        let before = registry.jobs.len();
        registry
            .jobs
            .retain(|_, job| !job.status.is_terminal() || now - job.updated_at < self.retention);
        before - registry.jobs.len()
    }

    pub fn len(&self) -> usize {
        self.registry.lock().jobs.len()
    }

    /// Snapshot of a job.
    pub fn status(&self, id: Uuid) -> Result<Job, AppError> {
        self.registry
            .lock()
            .jobs
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))
    }
}
