use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use crate::config::{NetworkConfig, SearchConfig};
use crate::error::ConfigError;
use crate::http::{create_http_client, join_url};
use crate::sanitize::hash_keyword;
use crate::search::dto::{RawItem, RawSearchResponse};
use crate::search::error::{SearchError, SearchErrorKind};
use crate::search::CandidateVideo;

/// One page request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub keyword: String,
    #[serde(default)]
    pub cursor: Option<String>,
    /// Ties consecutive pages of one search together. Generated when absent.
    #[serde(default)]
    pub search_session_id: Option<String>,
}

impl SearchQuery {
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            cursor: None,
            search_session_id: None,
        }
    }

    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.search_session_id = Some(session_id.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    pub items: Vec<CandidateVideo>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
    /// Pass back with the next cursor to continue the same search.
    pub search_session_id: String,
}

/// A platform's keyword search endpoint.
#[async_trait]
pub trait PlatformSearchClient: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> Result<SearchPage, SearchError>;
}

/// Search client for the TikTok web search API.
pub struct TikTokSearchClient {
    client: Client,
    base_url: String,
    page_size: u32,
}

impl TikTokSearchClient {
    pub fn new(search: &SearchConfig, network: &NetworkConfig) -> Result<Self, ConfigError> {
        let client = create_http_client(
            network,
            Duration::from_secs(network.search_timeout_secs),
        )?;
        Ok(Self::with_client(client, &search.base_url, search.page_size))
    }

    pub fn with_client(client: Client, base_url: &str, page_size: u32) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
            page_size,
        }
    }

    fn build_url(&self, query: &SearchQuery, session_id: &str) -> Result<reqwest::Url, SearchError> {
        let mut url = join_url(&self.base_url, "search/video").map_err(|e| {
            SearchError::new(&query.keyword, query.cursor.clone(), SearchErrorKind::Validation(e))
        })?;
        url.query_pairs_mut()
            .append_pair("keyword", query.keyword.trim())
            .append_pair("cursor", query.cursor.as_deref().unwrap_or("0"))
            .append_pair("search_id", session_id)
            .append_pair("count", &self.page_size.to_string());
        Ok(url)
    }

    async fn fetch(&self, query: &SearchQuery, session_id: String) -> Result<SearchPage, SearchError> {
        let keyword = query.keyword.as_str();
        let cursor = query.cursor.as_deref();
        let url = self.build_url(query, &session_id)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SearchError::from_reqwest(keyword, cursor, &e))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Search request returned HTTP {}", status);
            return Err(SearchError::new(
                keyword,
                cursor.map(str::to_string),
                SearchErrorKind::Status(status.as_u16()),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SearchError::from_reqwest(keyword, cursor, &e))?;
        let raw: RawSearchResponse = serde_json::from_str(&body).map_err(|e| {
            SearchError::new(
                keyword,
                cursor.map(str::to_string),
                SearchErrorKind::Schema(e.to_string()),
            )
        })?;

        page_from_response(raw, session_id).map_err(|kind| {
            SearchError::new(keyword, cursor.map(str::to_string), kind)
        })
    }
}

#[async_trait]
impl PlatformSearchClient for TikTokSearchClient {
    async fn search(&self, query: &SearchQuery) -> Result<SearchPage, SearchError> {
        if query.keyword.trim().is_empty() {
            return Err(SearchError::new(
                &query.keyword,
                query.cursor.clone(),
                SearchErrorKind::Validation("keyword must not be empty".to_string()),
            ));
        }

        let session_id = query
            .search_session_id
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());

        let span = tracing::info_span!(
            "search.request",
            keyword = %hash_keyword(&query.keyword),
            cursor = query.cursor.as_deref().unwrap_or("0"),
        );
        let page = self.fetch(query, session_id).instrument(span).await?;
        debug!(
            "Search returned {} items (has_more: {})",
            page.items.len(),
            page.has_more
        );
        Ok(page)
    }
}

/// Normalizes a decoded response. A non-zero `status_code` is an upstream
/// rejection even on HTTP 200.
pub(crate) fn page_from_response(
    raw: RawSearchResponse,
    session_id: String,
) -> Result<SearchPage, SearchErrorKind> {
    if raw.status_code != 0 {
        return Err(SearchErrorKind::Schema(format!(
            "platform status_code {}",
            raw.status_code
        )));
    }

    let total = raw.data.len();
    let items: Vec<CandidateVideo> = raw
        .data
        .into_iter()
        .filter_map(|entry| entry.item)
        .filter_map(RawItem::into_candidate)
        .collect();
    if items.len() < total {
        debug!("Dropped {} unusable search entries", total - items.len());
    }

    let search_session_id = raw
        .log_pb
        .and_then(|l| l.impr_id)
        .filter(|s| !s.is_empty())
        .unwrap_or(session_id);

    Ok(SearchPage {
        items,
        next_cursor: raw.cursor,
        has_more: raw.has_more,
        search_session_id,
    })
}
