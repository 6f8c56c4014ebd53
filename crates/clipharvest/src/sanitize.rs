//! Helpers for sanitizing data before it enters tracing span attributes.
//!
//! Source URLs often carry signed query parameters and session tokens, so
//! spans only ever see the scheme, host and path.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Strips the query string, fragment and userinfo from a URL.
///
/// - `https://www.tiktok.com/@a/video/1?sig=abc` → `https://www.tiktok.com/@a/video/1`
/// - `https://user:pw@cdn.example.com/v.mp4` → `https://cdn.example.com/v.mp4`
/// - unparseable input → `<invalid-url>`
pub fn redact_url(url: &str) -> String {
    match reqwest::Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_query(None);
            parsed.set_fragment(None);
            let _ = parsed.set_username("");
            let _ = parsed.set_password(None);
            parsed.to_string()
        }
        Err(_) => "<invalid-url>".to_string(),
    }
}

/// Returns a short deterministic hash of a keyword for correlation without
/// putting search terms in spans.
pub fn hash_keyword(keyword: &str) -> String {
    let mut hasher = DefaultHasher::new();
    keyword.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}
