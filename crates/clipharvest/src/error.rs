use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::download::DownloadFailure;
use crate::search::SearchError;
use crate::worker::job::JobStatus;

/// Failure classes shared by every component.
///
/// Only `Upstream` and `Timeout` are retried by the job queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Malformed third-party payload (manifest, metadata JSON).
    Parse,
    /// Network error or non-2xx upstream response.
    Upstream,
    /// A network step exceeded its deadline.
    Timeout,
    /// Missing or invalid caller input.
    Validation,
    /// Unknown job id or unsupported platform.
    NotFound,
    /// Writing the downloaded artifact failed.
    Storage,
    /// The job was cancelled before it finished.
    Cancelled,
}

impl FailureKind {
    pub fn is_retryable(self) -> bool {
        matches!(self, FailureKind::Upstream | FailureKind::Timeout)
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FailureKind::Parse => "parse",
            FailureKind::Upstream => "upstream",
            FailureKind::Timeout => "timeout",
            FailureKind::Validation => "validation",
            FailureKind::NotFound => "not_found",
            FailureKind::Storage => "storage",
            FailureKind::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug)]
pub enum ClipharvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("Download error: {0}")]
    Download(#[from] DownloadFailure),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Keyword pool error: {0}")]
    Keyword(#[from] KeywordError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),
}

impl ClipharvestError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ClipharvestError::Config(_) => FailureKind::Validation,
            ClipharvestError::Search(e) => e.kind.failure_kind(),
            ClipharvestError::Download(e) => e.kind,
            ClipharvestError::Queue(e) => e.kind(),
            ClipharvestError::Keyword(e) => e.kind(),
            ClipharvestError::Storage(_) | ClipharvestError::Database(_) => FailureKind::Storage,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Invalid URL for '{field}': {reason}")]
    InvalidUrl { field: String, reason: String },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File already exists: {0}")]
    FileExists(PathBuf),
}

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Invalid source URL: {0}")]
    Validation(String),

    #[error("Unsupported platform for URL: {0}")]
    UnsupportedPlatform(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Job {job_id} cannot move from {from} to {to}")]
    InvalidTransition {
        job_id: String,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Worker channel closed unexpectedly")]
    ChannelClosed,

    #[error("Job queue must be started inside a Tokio runtime")]
    NoRuntime,
}

impl QueueError {
    pub fn kind(&self) -> FailureKind {
        match self {
            QueueError::Validation(_) | QueueError::InvalidTransition { .. } => {
                FailureKind::Validation
            }
            QueueError::UnsupportedPlatform(_) | QueueError::JobNotFound(_) => {
                FailureKind::NotFound
            }
            QueueError::ChannelClosed | QueueError::NoRuntime => FailureKind::Upstream,
        }
    }
}

#[derive(Error, Debug)]
pub enum KeywordError {
    #[error("Invalid keyword input: {0}")]
    Validation(String),

    #[error("Keyword store error: {0}")]
    Store(#[from] crate::db::DatabaseError),

    #[error("Keyword pool lock poisoned for category '{0}'")]
    LockPoisoned(String),
}

impl KeywordError {
    pub fn kind(&self) -> FailureKind {
        match self {
            KeywordError::Validation(_) => FailureKind::Validation,
            KeywordError::Store(_) | KeywordError::LockPoisoned(_) => FailureKind::Storage,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClipharvestError>;
