use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use log::{debug, info};
use tracing::Instrument;

use crate::config::Config;
use crate::download::error::{DownloadFailure, DownloadStage};
use crate::download::fetcher::{HttpFetcher, ReqwestFetcher};
use crate::download::outcome::{AdditionalMetadata, DownloadMetrics, DownloadOutcome};
use crate::download::platform::Platform;
use crate::download::resolver::{HttpMediaResolver, MediaResolver};
use crate::download::VideoDownloader;
use crate::error::{ConfigError, FailureKind};
use crate::manifest::{Rendition, RenditionSelector};
use crate::sanitize::redact_url;

/// Resolves a source URL to its cheapest rendition and fetches it.
pub struct DownloadOrchestrator {
    resolver: Arc<dyn MediaResolver>,
    fetcher: Arc<dyn HttpFetcher>,
    selector: RenditionSelector,
}

impl DownloadOrchestrator {
    pub fn new(
        resolver: Arc<dyn MediaResolver>,
        fetcher: Arc<dyn HttpFetcher>,
        selector: RenditionSelector,
    ) -> Self {
        Self {
            resolver,
            fetcher,
            selector,
        }
    }

    /// Production wiring: reqwest-backed resolver and fetcher.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let resolver = HttpMediaResolver::new(&config.platforms, &config.network)?;
        let fetcher = ReqwestFetcher::new(&config.network)?;
        Ok(Self::new(
            Arc::new(resolver),
            Arc::new(fetcher),
            RenditionSelector::with_preferred_label(config.renditions.preferred_label.clone()),
        ))
    }

    async fn run(&self, source_url: &str) -> Result<DownloadOutcome, DownloadFailure> {
        let platform = Platform::detect(source_url);
        if platform == Platform::Unknown {
            return Err(DownloadFailure::new(
                DownloadStage::DetectPlatform,
                FailureKind::NotFound,
                format!("unsupported platform for {}", redact_url(source_url)),
            ));
        }

        let metadata = self
            .resolver
            .resolve(platform, source_url)
            .instrument(tracing::info_span!("download.fetch_metadata"))
            .await?;

        let rendition = {
            let _span = tracing::info_span!("download.select_rendition").entered();
            self.choose_rendition(metadata.manifest.as_deref(), metadata.direct_url.as_deref())?
        };
        debug!(
            "Selected rendition {} (bandwidth {}, label {:?})",
            redact_url(&rendition.url),
            rendition.bandwidth,
            rendition.quality_label
        );

        let started = Instant::now();
        let video_data = self
            .fetcher
            .fetch(&rendition.url)
            .instrument(tracing::info_span!("download.fetch_rendition"))
            .await?;
        let fetch_duration_ms = started.elapsed().as_millis() as u64;

        Ok(DownloadOutcome {
            metrics: DownloadMetrics {
                byte_size: video_data.len() as u64,
                fetch_duration_ms,
                selected_bandwidth: rendition.bandwidth,
                quality_label: rendition.quality_label,
            },
            metadata: AdditionalMetadata {
                author: metadata.author,
                duration_seconds: metadata.duration_seconds,
                title: metadata.title,
                original_url: source_url.to_string(),
                platform,
            },
            video_data,
        })
    }

    /// The manifest wins when it yields a rendition; the direct URL is the
    /// fallback.
    fn choose_rendition(
        &self,
        manifest: Option<&str>,
        direct_url: Option<&str>,
    ) -> Result<Rendition, DownloadFailure> {
        if let Some(selected) = manifest.and_then(|m| self.selector.select(m)) {
            return Ok(selected);
        }
        if manifest.is_some() {
            debug!("Manifest yielded no rendition, trying direct URL");
        }
        match direct_url {
            Some(url) => Ok(Rendition::new(0, url)),
            None => Err(DownloadFailure::new(
                DownloadStage::SelectRendition,
                FailureKind::Parse,
                "no playable rendition",
            )),
        }
    }
}

#[async_trait]
impl VideoDownloader for DownloadOrchestrator {
    async fn download(&self, source_url: &str) -> Result<DownloadOutcome, DownloadFailure> {
        let span = tracing::info_span!("download", url = %redact_url(source_url));
        let outcome = self.run(source_url).instrument(span).await?;
        info!(
            "Downloaded {} bytes from {} in {}ms",
            outcome.metrics.byte_size,
            outcome.metadata.platform,
            outcome.metrics.fetch_duration_ms
        );
        Ok(outcome)
    }
}
