//! Adaptive-streaming manifest parsing and rendition selection.

pub mod parser;
pub mod selector;

use serde::{Deserialize, Serialize};

pub use parser::{parse_renditions, ParsedManifest};
pub use selector::{select_lowest_bandwidth, RenditionSelector, DEFAULT_PREFERRED_LABEL};

/// One encoded variant of a video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rendition {
    /// Bits per second.
    pub bandwidth: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_label: Option<String>,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl Rendition {
    pub fn new(bandwidth: u64, url: impl Into<String>) -> Self {
        Self {
            bandwidth,
            quality_label: None,
            url: url.into(),
            width: None,
            height: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.quality_label = Some(label.into());
        self
    }

    pub fn with_height(mut self, height: u32) -> Self {
        self.height = Some(height);
        self
    }

    /// Vertical resolution, from the explicit height or a `"{n}p"` label.
    pub fn effective_height(&self) -> Option<u32> {
        self.height.or_else(|| {
            self.quality_label
                .as_deref()
                .and_then(|l| l.trim().strip_suffix('p'))
                .and_then(|n| n.parse().ok())
        })
    }
}
