use crate::manifest::parser::parse_renditions;
use crate::manifest::Rendition;

/// Smallest quality label platforms commonly offer.
pub const DEFAULT_PREFERRED_LABEL: &str = "240p";

/// Picks the cheapest playable rendition from a manifest.
#[derive(Debug, Clone)]
pub struct RenditionSelector {
    preferred_label: String,
}

impl Default for RenditionSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl RenditionSelector {
    pub fn new() -> Self {
        Self {
            preferred_label: DEFAULT_PREFERRED_LABEL.to_string(),
        }
    }

    pub fn with_preferred_label(label: impl Into<String>) -> Self {
        Self {
            preferred_label: label.into(),
        }
    }

    pub fn preferred_label(&self) -> &str {
        &self.preferred_label
    }

    /// Returns the rendition labeled with the preferred marker if one exists,
    /// otherwise the lowest-bandwidth rendition. `None` when nothing parses.
    pub fn select(&self, manifest: &str) -> Option<Rendition> {
        let parsed = parse_renditions(manifest);
        if parsed.truncated {
            log::debug!(
                "Selecting from truncated manifest ({} renditions recovered)",
                parsed.renditions.len()
            );
        }
        self.select_from(parsed.renditions)
    }

    pub fn select_from(&self, renditions: Vec<Rendition>) -> Option<Rendition> {
        let preferred = self.preferred_label.trim();
        if let Some(pos) = renditions.iter().position(|r| {
            r.quality_label
                .as_deref()
                .is_some_and(|l| l.trim().eq_ignore_ascii_case(preferred))
        }) {
            return renditions.into_iter().nth(pos);
        }

        // min_by_key returns the first of equal minimums
        renditions.into_iter().min_by_key(|r| r.bandwidth)
    }
}

/// Selects with the default preferred label.
pub fn select_lowest_bandwidth(manifest: &str) -> Option<Rendition> {
    RenditionSelector::new().select(manifest)
}
