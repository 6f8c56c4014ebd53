//! Download orchestrator wired to the reqwest resolver and fetcher.

mod common;

use std::sync::Arc;

use clipharvest::config::Config;
use clipharvest::{
    DownloadOrchestrator, DownloadStage, FailureKind, JobQueue, JobStatus, Platform,
    VideoDownloader,
};

use common::*;

fn config_with_metadata_base(base_url: &str) -> Config {
    let mut config = Config::default();
    config.platforms.tiktok.metadata_base_url = base_url.to_string();
    config.platforms.instagram.metadata_base_url = base_url.to_string();
    config
}

fn detail_json(manifest: Option<&str>, play_url: Option<&str>) -> String {
    serde_json::json!({
        "manifest": manifest,
        "playUrl": play_url,
        "author": "chef",
        "duration": 21,
        "title": "street food tour",
    })
    .to_string()
}

#[tokio::test]
async fn test_manifest_rendition_is_fetched() {
    let cdn = StubServer::start(vec![(200, "fake-mp4-payload".to_string())]).await;
    let manifest = format!(
        r#"<MPD><Period><AdaptationSet>
            <Representation bandwidth="800000" FBQualityLabel="720p"><BaseURL>{cdn}v/720.mp4</BaseURL></Representation>
            <Representation bandwidth="650000" FBQualityLabel="240p"><BaseURL>{cdn}v/240.mp4</BaseURL></Representation>
            <Representation bandwidth="120000" FBQualityLabel="audio"><BaseURL>{cdn}v/low.mp4</BaseURL></Representation>
        </AdaptationSet></Period></MPD>"#,
        cdn = cdn.base_url
    );
    let metadata = StubServer::start(vec![(200, detail_json(Some(&manifest), None))]).await;

    let orchestrator =
        DownloadOrchestrator::from_config(&config_with_metadata_base(&metadata.base_url)).unwrap();
    let outcome = orchestrator
        .download("https://www.tiktok.com/@chef/video/111")
        .await
        .unwrap();

    assert_eq!(outcome.video_data, b"fake-mp4-payload");
    assert_eq!(outcome.metrics.byte_size, 16);
    assert_eq!(outcome.metrics.selected_bandwidth, 650_000);
    assert_eq!(outcome.metrics.quality_label.as_deref(), Some("240p"));
    assert_eq!(outcome.metadata.author.as_deref(), Some("chef"));
    assert_eq!(outcome.metadata.duration_seconds, Some(21));
    assert_eq!(outcome.metadata.platform, Platform::Tiktok);

    let metadata_lines = metadata.request_lines().await;
    assert!(metadata_lines[0].starts_with("GET /video/detail?url=https%3A%2F%2Fwww.tiktok.com"));
    let cdn_lines = cdn.request_lines().await;
    assert_eq!(cdn_lines, vec!["GET /v/240.mp4 HTTP/1.1"]);
}

#[tokio::test]
async fn test_direct_url_used_without_manifest() {
    let cdn = StubServer::start(vec![(200, "reel".to_string())]).await;
    let play_url = format!("{}reel.mp4", cdn.base_url);
    let metadata = StubServer::start(vec![(200, detail_json(None, Some(&play_url)))]).await;

    let orchestrator =
        DownloadOrchestrator::from_config(&config_with_metadata_base(&metadata.base_url)).unwrap();
    let outcome = orchestrator
        .download("https://www.instagram.com/reel/Cabc123/")
        .await
        .unwrap();

    assert_eq!(outcome.video_data, b"reel");
    assert_eq!(outcome.metrics.selected_bandwidth, 0);
    assert!(outcome.metrics.quality_label.is_none());
    assert_eq!(outcome.metadata.platform, Platform::Instagram);
}

#[tokio::test]
async fn test_metadata_status_classification() {
    let metadata = StubServer::start(vec![
        (404, "{}".to_string()),
        (502, "{}".to_string()),
        (200, "not json".to_string()),
    ])
    .await;
    let orchestrator =
        DownloadOrchestrator::from_config(&config_with_metadata_base(&metadata.base_url)).unwrap();
    let url = "https://www.tiktok.com/@chef/video/111";

    let missing = orchestrator.download(url).await.unwrap_err();
    assert_eq!(missing.stage, DownloadStage::FetchMetadata);
    assert_eq!(missing.kind, FailureKind::NotFound);
    assert!(!missing.is_transient());

    let bad_gateway = orchestrator.download(url).await.unwrap_err();
    assert_eq!(bad_gateway.kind, FailureKind::Upstream);
    assert!(bad_gateway.is_transient());

    let malformed = orchestrator.download(url).await.unwrap_err();
    assert_eq!(malformed.kind, FailureKind::Parse);
}

#[tokio::test]
async fn test_no_playable_rendition() {
    let metadata = StubServer::start(vec![(200, detail_json(Some("<MPD/>"), None))]).await;
    let orchestrator =
        DownloadOrchestrator::from_config(&config_with_metadata_base(&metadata.base_url)).unwrap();

    let err = orchestrator
        .download("https://www.tiktok.com/@chef/video/111")
        .await
        .unwrap_err();
    assert_eq!(err.stage, DownloadStage::SelectRendition);
    assert_eq!(err.kind, FailureKind::Parse);
    assert!(err.to_string().contains("no playable rendition"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_queue_runs_real_orchestrator() {
    let cdn = StubServer::start(vec![(200, "bytes".to_string())]).await;
    let play_url = format!("{}clip.mp4", cdn.base_url);
    let metadata = StubServer::start(vec![(200, detail_json(None, Some(&play_url)))]).await;

    let config = config_with_metadata_base(&metadata.base_url);
    let orchestrator = Arc::new(DownloadOrchestrator::from_config(&config).unwrap());
    let queue = JobQueue::start(&QueueConfigBuilder::new().build(), orchestrator).unwrap();

    let id = queue.submit("https://vm.tiktok.com/ZMabc/").unwrap();
    let job = wait_for_terminal(&queue, &id).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.attempts, 1);
    let output = job.result.unwrap();
    assert_eq!(output.metrics.byte_size, 5);
    assert_eq!(output.metadata.original_url, "https://vm.tiktok.com/ZMabc/");
}
