//! Search client against a canned endpoint, plus result filtering.

mod common;

use chrono::{Duration, Utc};
use clipharvest::config::{NetworkConfig, SearchConfig};
use clipharvest::search::{filter, filter_at, pick_target_rendition, SearchErrorKind};
use clipharvest::{FailureKind, FilterOptions, PlatformSearchClient, SearchQuery, TikTokSearchClient};

use common::*;

const SEARCH_RESPONSE: &str = r#"{
    "status_code": 0,
    "cursor": 10,
    "has_more": 1,
    "log_pb": { "impr_id": "impr-123" },
    "data": [
        { "item": {
            "id": "111",
            "desc": "street food tour",
            "createTime": 1767225600,
            "author": { "uniqueId": "chef" },
            "stats": { "playCount": 5400, "diggCount": 300 },
            "video": {
                "duration": 21,
                "bitrateInfo": [
                    { "Bitrate": 2000000, "GearName": "1080", "PlayAddr": { "UrlList": ["https://cdn/1080.mp4"], "Height": 1080 } },
                    { "Bitrate": 900000, "GearName": "720", "PlayAddr": { "UrlList": ["https://cdn/720.mp4"], "Height": 720 } },
                    { "Bitrate": 300000, "GearName": "360", "PlayAddr": { "UrlList": ["https://cdn/360.mp4"], "Height": 360 } }
                ]
            }
        } },
        { "item": { "desc": "no id here", "video": { "playAddr": "https://cdn/x.mp4" } } },
        { "item": {
            "id": "222",
            "stats": { "playCount": 80 },
            "video": { "playAddr": "https://cdn/222.mp4", "height": 540, "bitrate": 500000 }
        } }
    ]
}"#;

fn client(base_url: &str) -> TikTokSearchClient {
    TikTokSearchClient::new(
        &SearchConfig {
            base_url: base_url.to_string(),
            page_size: 10,
        },
        &NetworkConfig::default(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_search_normalizes_page() {
    let stub = StubServer::start(vec![(200, SEARCH_RESPONSE.to_string())]).await;
    let page = client(&stub.base_url)
        .search(&SearchQuery::new("street food"))
        .await
        .unwrap();

    assert_eq!(page.items.len(), 2);
    assert_eq!(page.next_cursor.as_deref(), Some("10"));
    assert!(page.has_more);
    assert_eq!(page.search_session_id, "impr-123");

    let first = &page.items[0];
    assert_eq!(first.url, "https://www.tiktok.com/@chef/video/111");
    assert_eq!(first.view_count, 5400);
    assert_eq!(first.duration_seconds, Some(21));
    assert!(first.published_at.is_some());
    assert_eq!(
        pick_target_rendition(&first.renditions, 720).map(|r| r.url.as_str()),
        Some("https://cdn/720.mp4")
    );

    let second = &page.items[1];
    assert_eq!(second.url, "https://www.tiktok.com/video/222");
    assert_eq!(second.renditions[0].quality_label.as_deref(), Some("540p"));

    let lines = stub.request_lines().await;
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("GET /search/video?keyword=street+food&cursor=0&search_id="));
    assert!(lines[0].contains("&count=10 "));
}

#[tokio::test]
async fn test_search_continues_with_cursor_and_session() {
    let stub = StubServer::start(vec![(200, r#"{"status_code":0,"data":[]}"#.to_string())]).await;
    let page = client(&stub.base_url)
        .search(
            &SearchQuery::new("cats")
                .with_cursor("10")
                .with_session("sess-9"),
        )
        .await
        .unwrap();
    assert!(page.items.is_empty());
    assert!(!page.has_more);
    assert_eq!(page.search_session_id, "sess-9");

    let lines = stub.request_lines().await;
    assert!(lines[0].contains("cursor=10&search_id=sess-9"));
}

#[tokio::test]
async fn test_search_server_error_is_retryable() {
    let stub = StubServer::start(vec![(503, "{}".to_string())]).await;
    let err = client(&stub.base_url)
        .search(&SearchQuery::new("cats").with_cursor("20"))
        .await
        .unwrap_err();

    assert_eq!(err.kind, SearchErrorKind::Status(503));
    assert_eq!(err.cursor.as_deref(), Some("20"));
    assert!(err.is_retryable());
    assert_eq!(err.kind.failure_kind(), FailureKind::Upstream);
}

#[tokio::test]
async fn test_search_rejects_malformed_body_and_empty_keyword() {
    let stub = StubServer::start(vec![(200, "<html>".to_string())]).await;
    let client = client(&stub.base_url);

    let err = client.search(&SearchQuery::new("cats")).await.unwrap_err();
    assert!(matches!(err.kind, SearchErrorKind::Schema(_)));
    assert!(!err.is_retryable());

    let err = client.search(&SearchQuery::new("   ")).await.unwrap_err();
    assert!(matches!(err.kind, SearchErrorKind::Validation(_)));
    assert_eq!(err.keyword, "   ");
    assert_eq!(err.kind.failure_kind(), FailureKind::Validation);
}

#[tokio::test]
async fn test_client_errors_are_not_retried_as_upstream() {
    let stub = StubServer::start(vec![(403, "forbidden".to_string())]).await;
    let client = client(&stub.base_url);

    let err = client.search(&SearchQuery::new("cats")).await.unwrap_err();
    assert!(matches!(err.kind, SearchErrorKind::Status(403)));
    assert_eq!(err.kind.failure_kind(), FailureKind::Validation);
    assert!(!err.is_retryable());
    assert_eq!(err.keyword, "cats");
}

#[test]
fn test_min_views_filter_keeps_order() {
    let items = vec![
        CandidateBuilder::new("a").views(999).build(),
        CandidateBuilder::new("b").views(1000).build(),
        CandidateBuilder::new("c").views(50_000).build(),
        CandidateBuilder::new("d").views(10).build(),
        CandidateBuilder::new("e").views(1001).build(),
    ];
    let options = FilterOptions {
        min_views: Some(1000),
        ..FilterOptions::default()
    };

    let ids: Vec<String> = filter(items, &options).into_iter().map(|v| v.id).collect();
    assert_eq!(ids, vec!["b", "c", "e"]);
}

#[test]
fn test_combined_filters_are_conjunctive() {
    let now = Utc::now();
    let mut fresh = CandidateBuilder::new("fresh").views(2000).likes(50).build();
    fresh.published_at = Some(now - Duration::days(1));
    let mut stale = CandidateBuilder::new("stale").views(2000).likes(50).build();
    stale.published_at = Some(now - Duration::days(30));
    let unpopular = CandidateBuilder::new("unpopular").views(2000).likes(1).build();

    let options = FilterOptions {
        min_likes: Some(10),
        within_days: Some(7),
        ..FilterOptions::default()
    };
    let ids: Vec<String> = filter_at(vec![fresh, stale, unpopular], &options, now)
        .into_iter()
        .map(|v| v.id)
        .collect();
    assert_eq!(ids, vec!["fresh"]);
}
