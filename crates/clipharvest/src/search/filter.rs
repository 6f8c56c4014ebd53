use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::search::CandidateVideo;

/// Optional predicates, combined with AND. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    #[serde(default)]
    pub min_views: Option<u64>,
    #[serde(default)]
    pub max_views: Option<u64>,
    #[serde(default)]
    pub min_likes: Option<u64>,
    #[serde(default)]
    pub max_duration_sec: Option<u32>,
    /// Published within this many days of the reference instant.
    #[serde(default)]
    pub within_days: Option<u32>,
}

impl FilterOptions {
    /// Items with an unknown duration or publish date fail the predicates
    /// that need them.
    pub fn matches(&self, item: &CandidateVideo, now: DateTime<Utc>) -> bool {
        if self.min_views.is_some_and(|min| item.view_count < min) {
            return false;
        }
        if self.max_views.is_some_and(|max| item.view_count > max) {
            return false;
        }
        if self.min_likes.is_some_and(|min| item.like_count < min) {
            return false;
        }
        if let Some(max) = self.max_duration_sec {
            if !item.duration_seconds.is_some_and(|d| d <= max) {
                return false;
            }
        }
        if let Some(days) = self.within_days {
            let cutoff = now - Duration::days(i64::from(days));
            if !item.published_at.is_some_and(|p| p >= cutoff) {
                return false;
            }
        }
        true
    }

    pub fn is_empty(&self) -> bool {
        *self == FilterOptions::default()
    }
}

/// Keeps the items matching `options`, preserving order.
pub fn filter(items: Vec<CandidateVideo>, options: &FilterOptions) -> Vec<CandidateVideo> {
    filter_at(items, options, Utc::now())
}

pub fn filter_at(
    items: Vec<CandidateVideo>,
    options: &FilterOptions,
    now: DateTime<Utc>,
) -> Vec<CandidateVideo> {
    items
        .into_iter()
        .filter(|item| options.matches(item, now))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn video(id: usize, views: u64) -> CandidateVideo {
        CandidateVideo {
            id: id.to_string(),
            url: format!("https://www.tiktok.com/video/{}", id),
            duration_seconds: Some(10 + id as u32),
            view_count: views,
            like_count: views / 10,
            published_at: Some(Utc.with_ymd_and_hms(2026, 1, id as u32 + 1, 0, 0, 0).unwrap()),
            author: None,
            description: None,
            renditions: vec![],
        }
    }

    fn ten_videos() -> Vec<CandidateVideo> {
        [50, 2000, 999, 1000, 0, 15000, 300, 1001, 7, 4000]
            .iter()
            .enumerate()
            .map(|(i, v)| video(i, *v))
            .collect()
    }

    #[test]
    fn test_min_views_preserves_order() {
        let result = filter(ten_videos(), &FilterOptions {
            min_views: Some(1000),
            ..Default::default()
        });
        let views: Vec<u64> = result.iter().map(|v| v.view_count).collect();
        assert_eq!(views, vec![2000, 1000, 15000, 1001, 4000]);
    }

    #[test]
    fn test_empty_options_keep_everything() {
        let options = FilterOptions::default();
        assert!(options.is_empty());
        assert_eq!(filter(ten_videos(), &options).len(), 10);
    }

    #[test]
    fn test_combined_predicates() {
        let options = FilterOptions {
            min_views: Some(1000),
            max_views: Some(5000),
            min_likes: Some(150),
            ..Default::default()
        };
        let ids: Vec<String> = filter(ten_videos(), &options)
            .into_iter()
            .map(|v| v.id)
            .collect();
        assert_eq!(ids, vec!["1", "9"]);
    }

    #[test]
    fn test_max_duration_excludes_unknown() {
        let mut items = ten_videos();
        items[0].duration_seconds = None;
        let options = FilterOptions {
            max_duration_sec: Some(12),
            ..Default::default()
        };
        let ids: Vec<String> = filter(items, &options).into_iter().map(|v| v.id).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn test_within_days_relative_to_now() {
        let now = Utc.with_ymd_and_hms(2026, 1, 10, 12, 0, 0).unwrap();
        let options = FilterOptions {
            within_days: Some(3),
            ..Default::default()
        };
        // published Jan 1..=Jan 10; cutoff is Jan 7 12:00
        let ids: Vec<String> = filter_at(ten_videos(), &options, now)
            .into_iter()
            .map(|v| v.id)
            .collect();
        assert_eq!(ids, vec!["7", "8", "9"]);
    }
}
