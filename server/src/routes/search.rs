use axum::extract::State;
use axum::Json;
use chrono::Utc;
use clipharvest::search::filter;
use clipharvest::{CandidateVideo, FilterOptions, Rendition, SearchQuery};
use log::warn;
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use crate::error::ApiError;
use crate::state::{AppState, UsageAction};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub keyword: String,
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub search_session_id: Option<String>,
    #[serde(default)]
    pub filters: FilterOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoView {
    #[serde(flatten)]
    pub video: CandidateVideo,
    pub target_rendition: Option<Rendition>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub videos: Vec<VideoView>,
    pub count: usize,
    pub next_cursor: Option<String>,
    pub has_more: bool,
    pub search_session_id: String,
}

/// One page of results, filtered. The unfiltered hit count is recorded in
/// the search history that feeds keyword auto-seeding.
pub async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    state
        .usage
        .check(UsageAction::Search)
        .map_err(ApiError::usage_denied)?;

    let query = SearchQuery {
        keyword: request.keyword,
        cursor: request.cursor,
        search_session_id: request.search_session_id,
    };
    let span = tracing::info_span!("search", cursor = query.cursor.as_deref().unwrap_or("0"));
    let page = state.search.search(&query).instrument(span).await?;

    let hits = page.items.len() as u64;
    let keywords = state.keywords.clone();
    let keyword = query.keyword.clone();
    let recorded =
        tokio::task::spawn_blocking(move || keywords.record_search(&keyword, hits, Utc::now()))
            .await;
    match recorded {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Failed to record search history: {}", e),
        Err(e) => warn!("Search history task failed: {}", e),
    }

    let max_height = state.config.renditions.max_target_height;
    let videos: Vec<VideoView> = filter(page.items, &request.filters)
        .into_iter()
        .map(|video| VideoView {
            target_rendition: video.target_rendition(max_height).cloned(),
            video,
        })
        .collect();

    Ok(Json(SearchResponse {
        count: videos.len(),
        videos,
        next_cursor: page.next_cursor,
        has_more: page.has_more,
        search_session_id: page.search_session_id,
    }))
}
