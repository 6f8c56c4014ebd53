//! Wire format of the platform search endpoint and its normalization into
//! [`CandidateVideo`]s.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};

use crate::manifest::Rendition;
use crate::search::CandidateVideo;

#[derive(Debug, Deserialize)]
pub struct RawSearchResponse {
    #[serde(default)]
    pub status_code: i64,
    #[serde(default)]
    pub data: Vec<RawSearchEntry>,
    #[serde(default, deserialize_with = "number_or_string")]
    pub cursor: Option<String>,
    #[serde(default, deserialize_with = "int_or_bool")]
    pub has_more: bool,
    #[serde(default)]
    pub log_pb: Option<RawLogPb>,
}

#[derive(Debug, Deserialize)]
pub struct RawLogPb {
    #[serde(default)]
    pub impr_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawSearchEntry {
    #[serde(default)]
    pub item: Option<RawItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawItem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub create_time: Option<i64>,
    #[serde(default)]
    pub author: Option<RawAuthor>,
    #[serde(default)]
    pub stats: Option<RawStats>,
    #[serde(default)]
    pub video: Option<RawVideo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAuthor {
    #[serde(default)]
    pub unique_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStats {
    #[serde(default)]
    pub play_count: u64,
    #[serde(default)]
    pub digg_count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawVideo {
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub play_addr: Option<String>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub bitrate: Option<u64>,
    #[serde(default)]
    pub bitrate_info: Vec<RawBitrate>,
}

#[derive(Debug, Deserialize)]
pub struct RawBitrate {
    #[serde(rename = "Bitrate", default)]
    pub bitrate: Option<u64>,
    #[serde(rename = "GearName", default)]
    pub gear_name: Option<String>,
    #[serde(rename = "PlayAddr", default)]
    pub play_addr: Option<RawPlayAddr>,
}

#[derive(Debug, Deserialize)]
pub struct RawPlayAddr {
    #[serde(rename = "UrlList", default)]
    pub url_list: Vec<String>,
    #[serde(rename = "Height", default)]
    pub height: Option<u32>,
    #[serde(rename = "Width", default)]
    pub width: Option<u32>,
}

impl RawItem {
    /// Drops items without an id or any playable URL.
    pub fn into_candidate(self) -> Option<CandidateVideo> {
        let id = self.id.filter(|id| !id.trim().is_empty())?;
        let author = self.author.and_then(|a| a.unique_id);
        let stats = self.stats.unwrap_or_default();
        let video = self.video;

        let mut renditions = Vec::new();
        let mut duration_seconds = None;
        if let Some(video) = video {
            duration_seconds = video.duration;
            for info in video.bitrate_info {
                if let Some(r) = info.into_rendition() {
                    renditions.push(r);
                }
            }
            // Some responses only carry one representative address.
            if renditions.is_empty() {
                if let Some(url) = video.play_addr.filter(|u| !u.is_empty()) {
                    let mut r = Rendition::new(video.bitrate.unwrap_or(0), url);
                    if let Some(h) = video.height {
                        r = r.with_height(h).with_label(format!("{}p", h));
                    }
                    renditions.push(r);
                }
            }
        }
        if renditions.is_empty() {
            return None;
        }

        let url = match author.as_deref() {
            Some(handle) => format!("https://www.tiktok.com/@{}/video/{}", handle, id),
            None => format!("https://www.tiktok.com/video/{}", id),
        };

        Some(CandidateVideo {
            id,
            url,
            duration_seconds,
            view_count: stats.play_count,
            like_count: stats.digg_count,
            published_at: self.create_time.and_then(timestamp_to_utc),
            author,
            description: self.desc,
            renditions,
        })
    }
}

impl RawBitrate {
    fn into_rendition(self) -> Option<Rendition> {
        let play_addr = self.play_addr?;
        let url = play_addr.url_list.into_iter().find(|u| !u.is_empty())?;
        let mut r = Rendition::new(self.bitrate?, url);
        r.width = play_addr.width;
        r.height = play_addr.height;
        r.quality_label = play_addr.height.map(|h| format!("{}p", h)).or(self.gear_name);
        Some(r)
    }
}

fn timestamp_to_utc(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}

fn number_or_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s),
        _ => None,
    })
}

fn int_or_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Bool(b)) => b,
        Some(serde_json::Value::Number(n)) => n.as_i64().is_some_and(|n| n != 0),
        _ => false,
    })
}
