//! HTTP routes. JSON bodies use camelCase keys.

pub mod keywords;
pub mod search;
pub mod videos;

use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::task;

use crate::error::ApiError;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/videos/download", post(videos::submit_download))
        .route("/api/videos/jobs", get(videos::list_active_jobs))
        .route("/api/videos/jobs/:id", get(videos::get_job))
        .route("/api/videos/jobs/:id/cancel", post(videos::cancel_job))
        .route("/api/videos/stats", get(videos::queue_stats))
        .route("/api/search", post(search::search))
        .route("/api/keywords", get(keywords::pool_stats))
        .route("/api/keywords/seed", post(keywords::seed))
        .route("/api/keywords/auto-seed", post(keywords::auto_seed))
        .route("/api/keywords/rotate", post(keywords::rotate))
        .with_state(state)
}

async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Runs a synchronous store call off the async executor.
pub(crate) async fn blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    task::spawn_blocking(f).await.map_err(|e| {
        ApiError::new(
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            "internal",
            e.to_string(),
        )
    })?
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use clipharvest::config::QueueConfig;
    use clipharvest::download::{AdditionalMetadata, DownloadMetrics};
    use clipharvest::keywords::InMemoryKeywordStore;
    use clipharvest::{
        CandidateVideo, Config, DownloadFailure, DownloadOutcome, DownloadStage, FailureKind,
        JobQueue, KeywordPool, Platform, PlatformSearchClient, Rendition, SearchError, SearchPage,
        SearchQuery, VideoDownloader,
    };
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::build_router;
    use crate::state::{AllowAll, AppState, UsageAction, UsageGate};

    pub struct StaticDownloader;

    #[async_trait]
    impl VideoDownloader for StaticDownloader {
        async fn download(&self, source_url: &str) -> Result<DownloadOutcome, DownloadFailure> {
            if source_url.contains("missing") {
                return Err(DownloadFailure::new(
                    DownloadStage::FetchMetadata,
                    FailureKind::NotFound,
                    "video removed",
                ));
            }
            Ok(DownloadOutcome {
                video_data: b"clip".to_vec(),
                metrics: DownloadMetrics {
                    byte_size: 4,
                    fetch_duration_ms: 3,
                    selected_bandwidth: 150_000,
                    quality_label: Some("240p".to_string()),
                },
                metadata: AdditionalMetadata {
                    author: Some("chef".to_string()),
                    duration_seconds: Some(12),
                    title: None,
                    original_url: source_url.to_string(),
                    platform: Platform::detect(source_url),
                },
            })
        }
    }

    pub struct StaticSearch {
        pub queries: Mutex<Vec<SearchQuery>>,
    }

    #[async_trait]
    impl PlatformSearchClient for StaticSearch {
        async fn search(&self, query: &SearchQuery) -> Result<SearchPage, SearchError> {
            if let Ok(mut queries) = self.queries.lock() {
                queries.push(query.clone());
            }
            let video = |id: &str, views: u64| CandidateVideo {
                id: id.to_string(),
                url: format!("https://www.tiktok.com/video/{}", id),
                duration_seconds: Some(20),
                view_count: views,
                like_count: 10,
                published_at: None,
                author: None,
                description: None,
                renditions: vec![
                    Rendition::new(900_000, format!("https://cdn.test/{}/1080", id))
                        .with_height(1080),
                    Rendition::new(400_000, format!("https://cdn.test/{}/720", id))
                        .with_height(720),
                ],
            };
            Ok(SearchPage {
                items: vec![video("1", 50), video("2", 5_000)],
                next_cursor: Some("2".to_string()),
                has_more: true,
                search_session_id: query
                    .search_session_id
                    .clone()
                    .unwrap_or_else(|| "session-1".to_string()),
            })
        }
    }

    pub struct DenyAll;

    impl UsageGate for DenyAll {
        fn check(&self, action: UsageAction) -> Result<(), String> {
            Err(format!("no credits left for {}", action.as_str()))
        }
    }

    pub struct TestApp {
        pub router: Router,
        pub queue: Arc<JobQueue>,
        pub keywords: Arc<KeywordPool>,
        pub search: Arc<StaticSearch>,
    }

    pub fn test_app(debug_sync: bool, usage: Arc<dyn UsageGate>) -> TestApp {
        let mut config = Config::default();
        config.server.debug_sync = debug_sync;
        let queue_config = QueueConfig {
            worker_count: 1,
            max_attempts: 1,
            retry_base_delay_ms: 1,
            retry_max_delay_ms: 1,
            ..QueueConfig::default()
        };
        let downloader = Arc::new(StaticDownloader);
        let queue = Arc::new(JobQueue::start(&queue_config, downloader.clone()).unwrap());
        let keywords = Arc::new(KeywordPool::new(
            Arc::new(InMemoryKeywordStore::new()),
            config.keywords.clone(),
        ));
        let search = Arc::new(StaticSearch {
            queries: Mutex::new(Vec::new()),
        });

        let state = AppState {
            config: Arc::new(config),
            queue: Arc::clone(&queue),
            downloader,
            search: search.clone(),
            keywords: Arc::clone(&keywords),
            usage,
        };
        TestApp {
            router: build_router(state),
            queue,
            keywords,
            search,
        }
    }

    pub fn default_app() -> TestApp {
        test_app(false, Arc::new(AllowAll))
    }

    pub async fn send(
        router: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_healthz() {
        let app = default_app();
        let (status, body) = send(&app.router, "GET", "/healthz", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }
}
