use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::config::NetworkConfig;
use crate::download::error::{DownloadFailure, DownloadStage};
use crate::error::{ConfigError, FailureKind};
use crate::http::create_http_client;

/// Fetches rendition bytes.
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, DownloadFailure>;
}

pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    pub fn new(network: &NetworkConfig) -> Result<Self, ConfigError> {
        let client = create_http_client(
            network,
            Duration::from_secs(network.rendition_timeout_secs),
        )?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, DownloadFailure> {
        let stage = DownloadStage::FetchRendition;
        let parsed = reqwest::Url::parse(url).map_err(|e| {
            DownloadFailure::new(
                stage,
                FailureKind::Parse,
                format!("invalid rendition URL: {}", e),
            )
        })?;

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| DownloadFailure::from_reqwest(stage, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadFailure::from_status(stage, status));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| DownloadFailure::from_reqwest(stage, &e))?;
        if bytes.is_empty() {
            return Err(DownloadFailure::new(
                stage,
                FailureKind::Upstream,
                "empty response body",
            ));
        }
        Ok(bytes.to_vec())
    }
}
