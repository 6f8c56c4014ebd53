use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::FailureKind;

/// Step of the download pipeline that produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStage {
    DetectPlatform,
    FetchMetadata,
    SelectRendition,
    FetchRendition,
    StoreArtifact,
}

impl DownloadStage {
    pub fn as_str(self) -> &'static str {
        match self {
            DownloadStage::DetectPlatform => "detect_platform",
            DownloadStage::FetchMetadata => "fetch_metadata",
            DownloadStage::SelectRendition => "select_rendition",
            DownloadStage::FetchRendition => "fetch_rendition",
            DownloadStage::StoreArtifact => "store_artifact",
        }
    }
}

impl std::fmt::Display for DownloadStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{stage} failed ({kind}): {message}")]
pub struct DownloadFailure {
    pub stage: DownloadStage,
    pub kind: FailureKind,
    pub message: String,
}

impl DownloadFailure {
    pub fn new(stage: DownloadStage, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            stage,
            kind,
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_retryable()
    }

    pub(crate) fn from_reqwest(stage: DownloadStage, err: &reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            FailureKind::Timeout
        } else if err.is_decode() {
            FailureKind::Parse
        } else {
            FailureKind::Upstream
        };
        Self::new(stage, kind, err.to_string())
    }

    /// 404/410 mean the video is gone; every other non-2xx is retryable.
    pub(crate) fn from_status(stage: DownloadStage, status: reqwest::StatusCode) -> Self {
        let kind = match status.as_u16() {
            404 | 410 => FailureKind::NotFound,
            _ => FailureKind::Upstream,
        };
        Self::new(stage, kind, format!("upstream returned HTTP {}", status.as_u16()))
    }
}
