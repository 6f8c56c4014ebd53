//! Keyword search against short-video platforms.

pub mod client;
pub mod dto;
pub mod error;
pub mod filter;
pub mod rendition;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::manifest::Rendition;

pub use client::{PlatformSearchClient, SearchPage, SearchQuery, TikTokSearchClient};
pub use error::{SearchError, SearchErrorKind};
pub use filter::{filter, filter_at, FilterOptions};
pub use rendition::{pick_target_rendition, DEFAULT_MAX_TARGET_HEIGHT};

/// A normalized search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateVideo {
    pub id: String,
    pub url: String,
    pub duration_seconds: Option<u32>,
    pub view_count: u64,
    pub like_count: u64,
    pub published_at: Option<DateTime<Utc>>,
    pub author: Option<String>,
    pub description: Option<String>,
    /// May hold a single representative URL instead of a full ladder.
    pub renditions: Vec<Rendition>,
}

impl CandidateVideo {
    pub fn target_rendition(&self, max_height: u32) -> Option<&Rendition> {
        pick_target_rendition(&self.renditions, max_height)
    }
}
