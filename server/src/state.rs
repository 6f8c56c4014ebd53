//! Shared handler state and the usage accounting seam.

use std::sync::Arc;

use clipharvest::keywords::KeywordPool;
use clipharvest::{Config, JobQueue, PlatformSearchClient, VideoDownloader};

/// Billable operations checked against the usage gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageAction {
    Search,
    SyncDownload,
}

impl UsageAction {
    pub fn as_str(self) -> &'static str {
        match self {
            UsageAction::Search => "search",
            UsageAction::SyncDownload => "sync_download",
        }
    }
}

/// Credit accounting collaborator. Returning `Err` refuses the request with
/// HTTP 402 and the given reason.
pub trait UsageGate: Send + Sync {
    fn check(&self, action: UsageAction) -> Result<(), String>;
}

/// Permits everything.
pub struct AllowAll;

impl UsageGate for AllowAll {
    fn check(&self, _action: UsageAction) -> Result<(), String> {
        Ok(())
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub queue: Arc<JobQueue>,
    /// Used directly by synchronous debug downloads.
    pub downloader: Arc<dyn VideoDownloader>,
    pub search: Arc<dyn PlatformSearchClient>,
    pub keywords: Arc<KeywordPool>,
    pub usage: Arc<dyn UsageGate>,
}
