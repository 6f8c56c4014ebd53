//! In-memory job table with optional SQLite write-through.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::db::job_repo::{self, JobRow};
use crate::db::{Database, DatabaseError};
use crate::download::Platform;
use crate::error::QueueError;
use crate::worker::job::{Job, JobOutcome, JobOutput, JobResult, JobStatus};

const INTERRUPTED_MESSAGE: &str = "interrupted by restart";

// ─── Helpers ────────────────────────────────────────────────────────────────

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            log::warn!("parse_timestamp: failed to parse '{}': {}", s, e);
            Utc::now()
        })
}

fn job_to_row(job: &Job) -> JobRow {
    JobRow {
        id: job.id.clone(),
        source_url: job.source_url.clone(),
        normalized_url: job.normalized_url.clone(),
        platform: job.platform.as_str().to_string(),
        status: job.status.as_str().to_string(),
        error: job.error.clone(),
        attempts: job.attempts,
        result: job
            .result
            .as_ref()
            .and_then(|r| serde_json::to_string(r).ok()),
        cancel_requested: job.cancel_requested,
        created_at: job.created_at.to_rfc3339(),
        updated_at: job.updated_at.to_rfc3339(),
    }
}

fn job_from_row(row: JobRow) -> Result<Job, DatabaseError> {
    let status = JobStatus::parse(&row.status).ok_or_else(|| DatabaseError::CorruptRow {
        table: "jobs",
        reason: format!("unknown status '{}' for job {}", row.status, row.id),
    })?;
    let result = match row.result.as_deref() {
        Some(json) => match serde_json::from_str::<JobOutput>(json) {
            Ok(output) => Some(output),
            Err(e) => {
                log::warn!("Dropping unreadable result for job {}: {}", row.id, e);
                None
            }
        },
        None => None,
    };

    Ok(Job {
        platform: Platform::parse(&row.platform),
        status,
        created_at: parse_timestamp(&row.created_at),
        updated_at: parse_timestamp(&row.updated_at),
        result,
        error: row.error,
        attempts: row.attempts,
        cancel_requested: row.cancel_requested,
        id: row.id,
        source_url: row.source_url,
        normalized_url: row.normalized_url,
    })
}

// ─── Stats ──────────────────────────────────────────────────────────────────

/// Job counts per status, taken from one snapshot so they always add up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

/// Outcome of a cancel request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The job will fail with `cancelled` before its next attempt.
    Requested,
    /// The job had already finished; nothing changed.
    AlreadyTerminal(JobStatus),
}

// ─── JobStore ───────────────────────────────────────────────────────────────

/// Authoritative job table.
///
/// Every state change goes through here and is checked against
/// [`JobStatus::can_transition_to`]. When a database is attached, each change
/// is written through to the `jobs` table.
pub struct JobStore {
    db: RwLock<Option<Database>>,
    cache: RwLock<HashMap<String, Job>>,
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl JobStore {
    pub fn new() -> Self {
        Self {
            db: RwLock::new(None),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn set_database(&self, db: Database) {
        let mut guard = match self.db.write() {
            Ok(g) => g,
            Err(poisoned) => {
                log::warn!("Job store DB lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        *guard = Some(db);
    }

    pub fn get_database(&self) -> Option<Database> {
        let guard = match self.db.read() {
            Ok(g) => g,
            Err(poisoned) => {
                log::warn!("Job store DB lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        guard.clone()
    }

    fn read_cache(&self) -> RwLockReadGuard<'_, HashMap<String, Job>> {
        match self.cache.read() {
            Ok(g) => g,
            Err(poisoned) => {
                log::warn!("Job store cache lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write_cache(&self) -> RwLockWriteGuard<'_, HashMap<String, Job>> {
        match self.cache.write() {
            Ok(g) => g,
            Err(poisoned) => {
                log::warn!("Job store cache lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn persist(&self, job: &Job) {
        if let Some(db) = self.get_database() {
            if let Err(e) = job_repo::upsert(&db, &job_to_row(job)) {
                log::error!("Failed to persist job {} to database: {}", job.id, e);
            }
        }
    }

    /// Inserts `job` unless a non-terminal job with the same normalized URL
    /// exists. Returns the id that callers should track and whether `job` was
    /// the one inserted.
    pub fn insert_or_get_active(&self, job: Job) -> (String, bool) {
        let mut cache = self.write_cache();
        if let Some(existing) = cache
            .values()
            .filter(|j| !j.is_terminal() && j.normalized_url == job.normalized_url)
            .min_by_key(|j| j.created_at)
        {
            return (existing.id.clone(), false);
        }

        let id = job.id.clone();
        self.persist(&job);
        cache.insert(id.clone(), job);
        (id, true)
    }

    /// Drops a job that never reached a worker.
    pub fn remove(&self, id: &str) {
        self.write_cache().remove(id);
        if let Some(db) = self.get_database() {
            if let Err(e) = job_repo::delete_many(&db, &[id.to_string()]) {
                log::error!("Failed to delete job {} from database: {}", id, e);
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<Job> {
        self.read_cache().get(id).cloned()
    }

    /// Moves a job from `pending` to `processing`. Returns false when the job
    /// is missing or another worker already claimed it.
    pub fn try_start(&self, id: &str) -> bool {
        let mut cache = self.write_cache();
        let Some(job) = cache.get_mut(id) else {
            return false;
        };
        if !job.status.can_transition_to(JobStatus::Processing) {
            return false;
        }
        job.status = JobStatus::Processing;
        job.updated_at = Utc::now();
        self.persist(job);
        true
    }

    pub fn record_attempt(&self, id: &str, attempts: u32) {
        let mut cache = self.write_cache();
        if let Some(job) = cache.get_mut(id) {
            job.attempts = attempts;
            job.updated_at = Utc::now();
            self.persist(job);
        }
    }

    pub fn is_cancel_requested(&self, id: &str) -> bool {
        self.read_cache()
            .get(id)
            .map(|j| j.cancel_requested)
            .unwrap_or(false)
    }

    pub fn request_cancel(&self, id: &str) -> Result<CancelOutcome, QueueError> {
        let mut cache = self.write_cache();
        let job = cache
            .get_mut(id)
            .ok_or_else(|| QueueError::JobNotFound(id.to_string()))?;
        if job.is_terminal() {
            return Ok(CancelOutcome::AlreadyTerminal(job.status));
        }
        if !job.cancel_requested {
            job.cancel_requested = true;
            job.updated_at = Utc::now();
            self.persist(job);
        }
        Ok(CancelOutcome::Requested)
    }

    /// Applies a worker's terminal outcome.
    pub fn finish(&self, result: JobResult) -> Result<Job, QueueError> {
        let target = result.target_status();
        let mut cache = self.write_cache();
        let job = cache
            .get_mut(&result.job_id)
            .ok_or_else(|| QueueError::JobNotFound(result.job_id.clone()))?;

        if !job.status.can_transition_to(target) {
            return Err(QueueError::InvalidTransition {
                job_id: result.job_id,
                from: job.status,
                to: target,
            });
        }

        job.status = target;
        job.attempts = result.attempts;
        job.updated_at = Utc::now();
        match result.outcome {
            JobOutcome::Completed(output) => {
                job.result = Some(output);
                job.error = None;
            }
            JobOutcome::Failed { message, .. } => {
                job.result = None;
                job.error = Some(message);
            }
        }
        self.persist(job);
        Ok(job.clone())
    }

    /// Pending and processing jobs, oldest first.
    pub fn active(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self
            .read_cache()
            .values()
            .filter(|j| !j.is_terminal())
            .cloned()
            .collect();
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        jobs
    }

    pub fn stats(&self) -> QueueStats {
        let cache = self.read_cache();
        let mut stats = QueueStats {
            total: cache.len(),
            ..QueueStats::default()
        };
        for job in cache.values() {
            match job.status {
                JobStatus::Pending => stats.pending += 1,
                JobStatus::Processing => stats.processing += 1,
                JobStatus::Completed => stats.completed += 1,
                JobStatus::Failed => stats.failed += 1,
            }
        }
        stats
    }

    /// Removes terminal jobs older than `retention`, then the oldest terminal
    /// jobs beyond `max_terminal`. Active jobs are never evicted.
    pub fn evict(
        &self,
        now: DateTime<Utc>,
        retention: Duration,
        max_terminal: usize,
    ) -> Vec<String> {
        let mut cache = self.write_cache();

        let mut terminal: Vec<(DateTime<Utc>, String)> = cache
            .values()
            .filter(|j| j.is_terminal())
            .map(|j| (j.updated_at, j.id.clone()))
            .collect();
        terminal.sort();

        let cutoff = now - retention;
        let expired = terminal.iter().take_while(|(at, _)| *at < cutoff).count();
        let remaining = terminal.len() - expired;
        let over_cap = remaining.saturating_sub(max_terminal);

        let evicted: Vec<String> = terminal
            .into_iter()
            .take(expired + over_cap)
            .map(|(_, id)| id)
            .collect();
        for id in &evicted {
            cache.remove(id);
        }
        drop(cache);

        if !evicted.is_empty() {
            log::debug!("Evicted {} terminal jobs", evicted.len());
            if let Some(db) = self.get_database() {
                if let Err(e) = job_repo::delete_many(&db, &evicted) {
                    log::error!("Failed to delete evicted jobs from database: {}", e);
                }
            }
        }
        evicted
    }

    /// Loads persisted jobs into the cache.
    ///
    /// Jobs left `processing` by a previous run are failed. Jobs left
    /// `pending` are returned so the caller can hand them to workers again.
    pub fn load_from_database(&self) -> Result<Vec<Job>, DatabaseError> {
        let Some(db) = self.get_database() else {
            return Ok(Vec::new());
        };

        let mut requeue = Vec::new();
        let mut cache = self.write_cache();
        for row in job_repo::list_all(&db)? {
            let mut job = match job_from_row(row) {
                Ok(job) => job,
                Err(e) => {
                    log::warn!("Skipping unreadable job row: {}", e);
                    continue;
                }
            };
            match job.status {
                JobStatus::Processing => {
                    job.status = JobStatus::Failed;
                    job.error = Some(INTERRUPTED_MESSAGE.to_string());
                    job.updated_at = Utc::now();
                    self.persist(&job);
                }
                JobStatus::Pending => requeue.push(job.clone()),
                JobStatus::Completed | JobStatus::Failed => {}
            }
            cache.insert(job.id.clone(), job);
        }

        log::info!(
            "Loaded {} jobs from database ({} to resume)",
            cache.len(),
            requeue.len()
        );
        Ok(requeue)
    }
}
