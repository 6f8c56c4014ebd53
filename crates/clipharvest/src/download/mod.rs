//! Source URL → platform metadata → rendition → bytes.

pub mod error;
pub mod fetcher;
pub mod orchestrator;
pub mod outcome;
pub mod platform;
pub mod resolver;

use async_trait::async_trait;

pub use error::{DownloadFailure, DownloadStage};
pub use fetcher::{HttpFetcher, ReqwestFetcher};
pub use orchestrator::DownloadOrchestrator;
pub use outcome::{AdditionalMetadata, DownloadMetrics, DownloadOutcome, VideoMetadata};
pub use platform::{normalize_url, Platform};
pub use resolver::{HttpMediaResolver, MediaResolver};

/// The unit of work a queue job executes.
#[async_trait]
pub trait VideoDownloader: Send + Sync {
    async fn download(&self, source_url: &str) -> Result<DownloadOutcome, DownloadFailure>;
}
