//! Builders for test configurations and fixtures.

#![allow(dead_code)]

use clipharvest::config::QueueConfig;
use clipharvest::manifest::Rendition;
use clipharvest::CandidateVideo;

/// Builder for `QueueConfig` with millisecond backoff.
pub struct QueueConfigBuilder {
    config: QueueConfig,
}

impl QueueConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: QueueConfig {
                worker_count: 2,
                max_attempts: 3,
                retry_base_delay_ms: 1,
                retry_max_delay_ms: 5,
                max_terminal_jobs: 100,
                retention_secs: 3600,
            },
        }
    }

    pub fn workers(mut self, count: usize) -> Self {
        self.config.worker_count = count;
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    pub fn max_terminal_jobs(mut self, max: usize) -> Self {
        self.config.max_terminal_jobs = max;
        self
    }

    pub fn build(self) -> QueueConfig {
        self.config
    }
}

impl Default for QueueConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `CandidateVideo` search hits.
pub struct CandidateBuilder {
    video: CandidateVideo,
}

impl CandidateBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            video: CandidateVideo {
                id: id.to_string(),
                url: format!("https://www.tiktok.com/@tester/video/{}", id),
                duration_seconds: Some(15),
                view_count: 0,
                like_count: 0,
                published_at: None,
                author: Some("tester".to_string()),
                description: None,
                renditions: vec![Rendition::new(100_000, format!("https://cdn/{}.mp4", id))],
            },
        }
    }

    pub fn views(mut self, views: u64) -> Self {
        self.video.view_count = views;
        self
    }

    pub fn likes(mut self, likes: u64) -> Self {
        self.video.like_count = likes;
        self
    }

    pub fn build(self) -> CandidateVideo {
        self.video
    }
}

pub fn tiktok_url(n: usize) -> String {
    format!("https://www.tiktok.com/@tester/video/{}", 7_000_000 + n)
}
