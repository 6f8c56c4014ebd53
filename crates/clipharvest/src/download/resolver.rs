use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::config::{NetworkConfig, PlatformsConfig};
use crate::download::error::{DownloadFailure, DownloadStage};
use crate::download::outcome::VideoMetadata;
use crate::download::platform::Platform;
use crate::error::{ConfigError, FailureKind};
use crate::http::{create_http_client, join_url};

/// Looks up a video's manifest or playable URL on its platform.
#[async_trait]
pub trait MediaResolver: Send + Sync {
    async fn resolve(
        &self,
        platform: Platform,
        source_url: &str,
    ) -> Result<VideoMetadata, DownloadFailure>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetailResponse {
    #[serde(default)]
    manifest: Option<String>,
    #[serde(default)]
    play_url: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    duration: Option<u32>,
    #[serde(default)]
    title: Option<String>,
}

impl From<DetailResponse> for VideoMetadata {
    fn from(r: DetailResponse) -> Self {
        Self {
            manifest: r.manifest.filter(|m| !m.trim().is_empty()),
            direct_url: r.play_url.filter(|u| !u.trim().is_empty()),
            author: r.author,
            duration_seconds: r.duration,
            title: r.title,
        }
    }
}

/// Calls `GET {metadata_base_url}/video/detail?url=<source>` on the
/// platform's metadata service.
pub struct HttpMediaResolver {
    client: Client,
    tiktok_base_url: String,
    instagram_base_url: String,
}

impl HttpMediaResolver {
    pub fn new(platforms: &PlatformsConfig, network: &NetworkConfig) -> Result<Self, ConfigError> {
        let client = create_http_client(
            network,
            Duration::from_secs(network.manifest_timeout_secs),
        )?;
        Ok(Self {
            client,
            tiktok_base_url: platforms.tiktok.metadata_base_url.clone(),
            instagram_base_url: platforms.instagram.metadata_base_url.clone(),
        })
    }

    fn detail_url(&self, platform: Platform, source_url: &str) -> Result<reqwest::Url, DownloadFailure> {
        let base = match platform {
            Platform::Tiktok => &self.tiktok_base_url,
            Platform::Instagram => &self.instagram_base_url,
            Platform::Unknown => {
                return Err(DownloadFailure::new(
                    DownloadStage::FetchMetadata,
                    FailureKind::NotFound,
                    "no metadata endpoint for unknown platform",
                ))
            }
        };
        let mut url = join_url(base, "video/detail").map_err(|e| {
            DownloadFailure::new(DownloadStage::FetchMetadata, FailureKind::Validation, e)
        })?;
        url.query_pairs_mut().append_pair("url", source_url);
        Ok(url)
    }
}

#[async_trait]
impl MediaResolver for HttpMediaResolver {
    async fn resolve(
        &self,
        platform: Platform,
        source_url: &str,
    ) -> Result<VideoMetadata, DownloadFailure> {
        let stage = DownloadStage::FetchMetadata;
        let url = self.detail_url(platform, source_url)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadFailure::from_reqwest(stage, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadFailure::from_status(stage, status));
        }

        let body = response
            .text()
            .await
            .map_err(|e| DownloadFailure::from_reqwest(stage, &e))?;
        parse_detail(&body)
    }
}

fn parse_detail(body: &str) -> Result<VideoMetadata, DownloadFailure> {
    let detail: DetailResponse = serde_json::from_str(body).map_err(|e| {
        DownloadFailure::new(
            DownloadStage::FetchMetadata,
            FailureKind::Parse,
            format!("malformed metadata response: {}", e),
        )
    })?;
    Ok(detail.into())
}
