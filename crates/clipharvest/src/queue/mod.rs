//! Background download jobs: submission, dedup, status polling.

pub mod job_store;

use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::Utc;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::{debug, error, info, warn};

use crate::config::QueueConfig;
use crate::db::Database;
use crate::download::{normalize_url, Platform, VideoDownloader};
use crate::error::QueueError;
use crate::sanitize::redact_url;
use crate::storage::ArtifactStorage;
use crate::worker::job::{Job, JobResult, JobStatus, QueuedJob};
use crate::worker::{RetryPolicy, WorkerContext, WorkerPool};

pub use job_store::{CancelOutcome, JobStore, QueueStats};

const EVICTION_INTERVAL: Duration = Duration::from_secs(30);

/// Optional collaborators for [`JobQueue::start_with`].
#[derive(Default)]
pub struct QueueOptions {
    /// Where completed downloads are written.
    pub storage: Option<ArtifactStorage>,
    /// Write-through persistence. Pending jobs from a previous run resume.
    pub database: Option<Database>,
}

/// Accepts video URLs and runs them on a worker pool.
///
/// Workers claim jobs (`pending → processing`); a collector thread applies
/// terminal results and evicts old terminal jobs.
pub struct JobQueue {
    store: Arc<JobStore>,
    pool: WorkerPool,
    collector: Mutex<Option<JoinHandle<()>>>,
}

impl JobQueue {
    /// Must be called from inside a Tokio runtime.
    pub fn start(
        config: &QueueConfig,
        downloader: Arc<dyn VideoDownloader>,
    ) -> Result<Self, QueueError> {
        Self::start_with(config, downloader, QueueOptions::default())
    }

    pub fn start_with(
        config: &QueueConfig,
        downloader: Arc<dyn VideoDownloader>,
        options: QueueOptions,
    ) -> Result<Self, QueueError> {
        let store = Arc::new(JobStore::new());

        let mut resume = Vec::new();
        if let Some(db) = options.database {
            store.set_database(db);
            match store.load_from_database() {
                Ok(jobs) => resume = jobs,
                Err(e) => error!("Failed to load jobs from database: {}", e),
            }
        }

        let context = Arc::new(WorkerContext {
            store: Arc::clone(&store),
            downloader,
            storage: options.storage,
            retry: RetryPolicy::from_config(config),
        });
        let pool = WorkerPool::start(context, config.worker_count)?;

        let retention = chrono::Duration::from_std(Duration::from_secs(config.retention_secs))
            .unwrap_or_else(|_| chrono::Duration::days(36500));
        let max_terminal = config.max_terminal_jobs;
        let collector_store = Arc::clone(&store);
        let results = pool.result_receiver();
        let collector = thread::spawn(move || {
            run_collector(collector_store, results, retention, max_terminal);
        });

        let queue = Self {
            store,
            pool,
            collector: Mutex::new(Some(collector)),
        };

        for job in &resume {
            queue.pool.submit(QueuedJob::from(job))?;
        }
        if !resume.is_empty() {
            info!("Resumed {} pending jobs", resume.len());
        }

        Ok(queue)
    }

    /// Validates `source_url` and queues a job for it. A URL whose normalized
    /// form matches an active job returns that job's id instead.
    pub fn submit(&self, source_url: &str) -> Result<String, QueueError> {
        let source_url = source_url.trim();
        if source_url.is_empty() {
            return Err(QueueError::Validation(
                "source URL must not be empty".to_string(),
            ));
        }
        let parsed = reqwest::Url::parse(source_url)
            .map_err(|e| QueueError::Validation(format!("{}: {}", redact_url(source_url), e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(QueueError::Validation(format!(
                "unsupported scheme '{}'",
                parsed.scheme()
            )));
        }

        let platform = Platform::detect(source_url);
        if platform == Platform::Unknown {
            return Err(QueueError::UnsupportedPlatform(redact_url(source_url)));
        }
        let normalized = normalize_url(source_url).ok_or_else(|| {
            QueueError::Validation(format!("cannot normalize {}", redact_url(source_url)))
        })?;

        let job = Job::new(source_url, normalized, platform);
        let queued = QueuedJob::from(&job);
        let (id, inserted) = self.store.insert_or_get_active(job);
        if !inserted {
            info!("Submission matches active job {}", id);
            return Ok(id);
        }

        if let Err(e) = self.pool.submit(queued) {
            self.store.remove(&id);
            return Err(e);
        }
        debug!("Queued job {} for {}", id, redact_url(source_url));
        Ok(id)
    }

    pub fn get_job(&self, id: &str) -> Option<Job> {
        self.store.get(id)
    }

    /// Pending and processing jobs, oldest first.
    pub fn get_active_jobs(&self) -> Vec<Job> {
        self.store.active()
    }

    pub fn get_stats(&self) -> QueueStats {
        self.store.stats()
    }

    /// Flags a job for cooperative cancellation. The worker fails it with
    /// `cancelled` before its next attempt.
    pub fn request_cancel(&self, id: &str) -> Result<CancelOutcome, QueueError> {
        let outcome = self.store.request_cancel(id)?;
        if outcome == CancelOutcome::Requested {
            info!("Cancellation requested for job {}", id);
        }
        Ok(outcome)
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    pub fn shutdown(&self) {
        self.pool.shutdown();
    }

    pub fn is_shutdown(&self) -> bool {
        self.pool.is_shutdown()
    }

    /// Waits for the workers and the collector to stop. Call after
    /// [`JobQueue::shutdown`].
    pub async fn wait(&self) {
        self.pool.wait().await;

        let collector = match self.collector.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = collector {
            match tokio::task::spawn_blocking(move || handle.join()).await {
                Ok(Ok(())) => debug!("Result collector finished"),
                Ok(Err(e)) => error!("Result collector panicked: {:?}", e),
                Err(e) => error!("Failed to join result collector: {}", e),
            }
        }
    }
}

fn run_collector(
    store: Arc<JobStore>,
    results: Receiver<JobResult>,
    retention: chrono::Duration,
    max_terminal: usize,
) {
    debug!("Result collector started");

    loop {
        match results.recv_timeout(EVICTION_INTERVAL) {
            Ok(result) => apply_result(&store, result),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        store.evict(Utc::now(), retention, max_terminal);
    }

    debug!("Result collector stopped");
}

fn apply_result(store: &JobStore, result: JobResult) {
    let job_id = result.job_id.clone();
    match store.finish(result) {
        Ok(job) if job.status == JobStatus::Completed => {
            info!("Job {} completed after {} attempts", job.id, job.attempts);
        }
        Ok(job) => {
            warn!(
                "Job {} failed after {} attempts: {}",
                job.id,
                job.attempts,
                job.error.as_deref().unwrap_or("unknown error")
            );
        }
        Err(e) => error!("Failed to record result for job {}: {}", job_id, e),
    }
}
