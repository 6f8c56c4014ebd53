pub mod config;
pub mod db;
pub mod download;
pub mod error;
pub mod http;
pub mod keywords;
pub mod manifest;
pub mod queue;
pub mod sanitize;
pub mod search;
pub mod storage;
pub mod worker;

pub use config::{load_config, load_config_or_default, Config};
pub use db::{Database, DatabaseError};
pub use download::{
    DownloadFailure, DownloadOrchestrator, DownloadOutcome, DownloadStage, Platform,
    VideoDownloader,
};
pub use error::{
    ClipharvestError, ConfigError, FailureKind, KeywordError, QueueError, Result, StorageError,
};
pub use keywords::{KeywordPool, KeywordStore, RotationRequest, RotationResult};
pub use manifest::{parse_renditions, select_lowest_bandwidth, Rendition, RenditionSelector};
pub use queue::{CancelOutcome, JobQueue, JobStore, QueueOptions, QueueStats};
pub use search::{
    CandidateVideo, FilterOptions, PlatformSearchClient, SearchError, SearchPage, SearchQuery,
    TikTokSearchClient,
};
pub use storage::ArtifactStorage;
pub use worker::{Job, JobStatus, RetryPolicy};
