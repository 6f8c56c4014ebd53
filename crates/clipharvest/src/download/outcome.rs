use serde::{Deserialize, Serialize};

use crate::download::platform::Platform;

/// What a platform's metadata endpoint reports about one video.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoMetadata {
    /// DASH-like manifest text, when the platform offers a rendition ladder.
    pub manifest: Option<String>,
    /// Single playable URL, used when no manifest is available.
    pub direct_url: Option<String>,
    pub author: Option<String>,
    pub duration_seconds: Option<u32>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadMetrics {
    pub byte_size: u64,
    pub fetch_duration_ms: u64,
    /// 0 when the platform gave a direct URL without bandwidth information.
    pub selected_bandwidth: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalMetadata {
    pub author: Option<String>,
    pub duration_seconds: Option<u32>,
    pub title: Option<String>,
    pub original_url: String,
    pub platform: Platform,
}

/// A finished download. Never partial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    pub video_data: Vec<u8>,
    pub metrics: DownloadMetrics,
    pub metadata: AdditionalMetadata,
}
