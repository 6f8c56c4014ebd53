//! Test doubles for the download seams.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use clipharvest::download::{
    AdditionalMetadata, DownloadMetrics, HttpFetcher, MediaResolver, VideoMetadata,
};
use clipharvest::{DownloadFailure, DownloadOutcome, DownloadStage, FailureKind, Platform, VideoDownloader};

pub fn outcome_for(source_url: &str, bytes: &[u8]) -> DownloadOutcome {
    DownloadOutcome {
        video_data: bytes.to_vec(),
        metrics: DownloadMetrics {
            byte_size: bytes.len() as u64,
            fetch_duration_ms: 1,
            selected_bandwidth: 150_000,
            quality_label: Some("240p".to_string()),
        },
        metadata: AdditionalMetadata {
            author: Some("tester".to_string()),
            duration_seconds: Some(12),
            title: None,
            original_url: source_url.to_string(),
            platform: Platform::detect(source_url),
        },
    }
}

pub fn upstream_failure(message: &str) -> DownloadFailure {
    DownloadFailure::new(DownloadStage::FetchMetadata, FailureKind::Upstream, message)
}

/// Replays scripted failures, then succeeds forever.
pub struct ScriptedDownloader {
    failures: Mutex<VecDeque<DownloadFailure>>,
    calls: AtomicUsize,
}

impl ScriptedDownloader {
    pub fn succeeding() -> Self {
        Self::failing_with(Vec::new())
    }

    pub fn failing_with(failures: Vec<DownloadFailure>) -> Self {
        Self {
            failures: Mutex::new(failures.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VideoDownloader for ScriptedDownloader {
    async fn download(&self, source_url: &str) -> Result<DownloadOutcome, DownloadFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(failure) = self.failures.lock().unwrap().pop_front() {
            return Err(failure);
        }
        Ok(outcome_for(source_url, b"video-bytes"))
    }
}

/// Always fails with the same failure.
pub struct FailingDownloader(pub DownloadFailure);

#[async_trait]
impl VideoDownloader for FailingDownloader {
    async fn download(&self, _source_url: &str) -> Result<DownloadOutcome, DownloadFailure> {
        Err(self.0.clone())
    }
}

/// Blocks every download until the test releases a permit.
pub struct GatedDownloader {
    gate: Semaphore,
    started: AtomicUsize,
}

impl GatedDownloader {
    pub fn new() -> Self {
        Self {
            gate: Semaphore::new(0),
            started: AtomicUsize::new(0),
        }
    }

    pub fn release(&self, downloads: usize) {
        self.gate.add_permits(downloads);
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VideoDownloader for GatedDownloader {
    async fn download(&self, source_url: &str) -> Result<DownloadOutcome, DownloadFailure> {
        self.started.fetch_add(1, Ordering::SeqCst);
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| upstream_failure("gate closed"))?;
        permit.forget();
        Ok(outcome_for(source_url, b"gated-bytes"))
    }
}

/// Metadata lookup that fails a fixed number of times before answering.
pub struct FlakyResolver {
    remaining_failures: AtomicUsize,
    metadata: VideoMetadata,
    pub calls: AtomicUsize,
}

impl FlakyResolver {
    pub fn new(failures: usize, metadata: VideoMetadata) -> Self {
        Self {
            remaining_failures: AtomicUsize::new(failures),
            metadata,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl MediaResolver for FlakyResolver {
    async fn resolve(
        &self,
        _platform: Platform,
        _source_url: &str,
    ) -> Result<VideoMetadata, DownloadFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(upstream_failure("metadata endpoint returned HTTP 503"));
        }
        Ok(self.metadata.clone())
    }
}

/// Serves fixed bytes and records requested URLs.
pub struct StaticFetcher {
    body: Vec<u8>,
    pub urls: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn new(body: &[u8]) -> Self {
        Self {
            body: body.to_vec(),
            urls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl HttpFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, DownloadFailure> {
        self.urls.lock().unwrap().push(url.to_string());
        Ok(self.body.clone())
    }
}

pub const LADDER_MANIFEST: &str = r#"<?xml version="1.0"?>
<MPD><Period><AdaptationSet>
  <Representation id="1" bandwidth="900000" height="720" FBQualityLabel="720p"><BaseURL>https://cdn.example/720.mp4?sig=a&amp;e=1</BaseURL></Representation>
  <Representation id="2" bandwidth="150000" height="360" FBQualityLabel="360p"><BaseURL>https://cdn.example/360.mp4?sig=b&amp;e=1</BaseURL></Representation>
  <Representation id="3" bandwidth="400000" height="480" FBQualityLabel="480p"><BaseURL>https://cdn.example/480.mp4?sig=c&amp;e=1</BaseURL></Representation>
</AdaptationSet></Period></MPD>"#;
