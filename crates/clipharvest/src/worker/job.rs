use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::download::{AdditionalMetadata, DownloadMetrics, Platform};
use crate::error::FailureKind;

/// Lifecycle of a job: `pending → processing → completed | failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Processing)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Failed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<JobStatus> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "processing" => Some(JobStatus::Processing),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result payload of a completed job. The video bytes live on disk, not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_path: Option<String>,
    pub metrics: DownloadMetrics,
    pub metadata: AdditionalMetadata,
}

/// A tracked download request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub source_url: String,
    /// Dedup key, see [`crate::download::normalize_url`].
    #[serde(skip)]
    pub normalized_url: String,
    pub platform: Platform,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JobOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub attempts: u32,
    #[serde(default)]
    pub cancel_requested: bool,
}

impl Job {
    pub fn new(
        source_url: impl Into<String>,
        normalized_url: impl Into<String>,
        platform: Platform,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            source_url: source_url.into(),
            normalized_url: normalized_url.into(),
            platform,
            status: JobStatus::Pending,
            created_at: now,
            updated_at: now,
            result: None,
            error: None,
            attempts: 0,
            cancel_requested: false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Message sent to the worker pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedJob {
    pub id: String,
    pub source_url: String,
    pub platform: Platform,
}

impl From<&Job> for QueuedJob {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id.clone(),
            source_url: job.source_url.clone(),
            platform: job.platform,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed(JobOutput),
    Failed { kind: FailureKind, message: String },
}

/// Message a worker sends back once it has finished with a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobResult {
    pub job_id: String,
    pub attempts: u32,
    pub outcome: JobOutcome,
}

impl JobResult {
    pub fn success(job_id: String, attempts: u32, output: JobOutput) -> Self {
        Self {
            job_id,
            attempts,
            outcome: JobOutcome::Completed(output),
        }
    }

    pub fn failure(job_id: String, attempts: u32, kind: FailureKind, message: String) -> Self {
        Self {
            job_id,
            attempts,
            outcome: JobOutcome::Failed { kind, message },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, JobOutcome::Completed(_))
    }

    pub fn target_status(&self) -> JobStatus {
        if self.is_success() {
            JobStatus::Completed
        } else {
            JobStatus::Failed
        }
    }
}
