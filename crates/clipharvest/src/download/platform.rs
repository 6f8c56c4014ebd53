use serde::{Deserialize, Serialize};

/// Source platform of a video URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Tiktok,
    Instagram,
    Unknown,
}

impl Platform {
    /// Identifies the platform from the URL shape.
    ///
    /// TikTok: any `tiktok.com` host, including the `vm.` and `vt.` short-link
    /// hosts. Instagram: `instagram.com` posts and reels (`/p/`, `/reel/`,
    /// `/reels/`).
    pub fn detect(url: &str) -> Platform {
        let Ok(parsed) = reqwest::Url::parse(url.trim()) else {
            return Platform::Unknown;
        };
        if !matches!(parsed.scheme(), "http" | "https") {
            return Platform::Unknown;
        }
        let Some(host) = parsed.host_str() else {
            return Platform::Unknown;
        };
        let host = host.to_ascii_lowercase();

        if host_matches(&host, "tiktok.com") {
            return Platform::Tiktok;
        }
        if host_matches(&host, "instagram.com") {
            let path = parsed.path();
            if ["/p/", "/reel/", "/reels/"]
                .iter()
                .any(|prefix| path.starts_with(prefix))
            {
                return Platform::Instagram;
            }
        }
        Platform::Unknown
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Tiktok => "tiktok",
            Platform::Instagram => "instagram",
            Platform::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Platform {
        match s {
            "tiktok" => Platform::Tiktok,
            "instagram" => Platform::Instagram,
            _ => Platform::Unknown,
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn host_matches(host: &str, domain: &str) -> bool {
    host == domain || host.ends_with(&format!(".{}", domain))
}

/// Canonical form used to recognise duplicate submissions: https scheme,
/// no `www.`/`m.` prefix, no query, fragment or trailing slash.
pub fn normalize_url(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    let host = host
        .strip_prefix("www.")
        .or_else(|| host.strip_prefix("m."))
        .unwrap_or(&host);
    let path = parsed.path().trim_end_matches('/');
    Some(format!("https://{}{}", host, path))
}
