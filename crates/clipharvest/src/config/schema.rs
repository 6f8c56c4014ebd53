use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    #[serde(default = "default_output_directory")]
    pub output_directory: String,
    /// SQLite file for jobs and the keyword pool. `None` keeps jobs in memory
    /// and uses the default database path for keywords.
    #[serde(default)]
    pub database_path: Option<String>,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub platforms: PlatformsConfig,
    #[serde(default)]
    pub renditions: RenditionConfig,
    #[serde(default)]
    pub keywords: KeywordConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            output_directory: default_output_directory(),
            database_path: None,
            queue: QueueConfig::default(),
            network: NetworkConfig::default(),
            search: SearchConfig::default(),
            platforms: PlatformsConfig::default(),
            renditions: RenditionConfig::default(),
            keywords: KeywordConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

fn default_output_directory() -> String {
    dirs::home_dir()
        .map(|h| h.join(".clipharvest").join("videos"))
        .unwrap_or_else(|| std::path::PathBuf::from("videos"))
        .to_string_lossy()
        .to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
    /// Upper bound on completed + failed jobs kept for polling.
    #[serde(default = "default_max_terminal_jobs")]
    pub max_terminal_jobs: usize,
    /// Terminal jobs older than this are evicted.
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,
}

fn default_worker_count() -> usize {
    num_cpus::get().clamp(1, 8)
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

fn default_retry_max_delay_ms() -> u64 {
    10_000
}

fn default_max_terminal_jobs() -> usize {
    500
}

fn default_retention_secs() -> u64 {
    3600
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            max_attempts: default_max_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
            max_terminal_jobs: default_max_terminal_jobs(),
            retention_secs: default_retention_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_search_timeout_secs")]
    pub search_timeout_secs: u64,
    #[serde(default = "default_manifest_timeout_secs")]
    pub manifest_timeout_secs: u64,
    #[serde(default = "default_rendition_timeout_secs")]
    pub rendition_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_search_timeout_secs() -> u64 {
    15
}

fn default_manifest_timeout_secs() -> u64 {
    15
}

fn default_rendition_timeout_secs() -> u64 {
    60
}

fn default_user_agent() -> String {
    format!("clipharvest/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            search_timeout_secs: default_search_timeout_secs(),
            manifest_timeout_secs: default_manifest_timeout_secs(),
            rendition_timeout_secs: default_rendition_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_base_url")]
    pub base_url: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_search_base_url() -> String {
    "https://www.tiktok.com/api".to_string()
}

fn default_page_size() -> u32 {
    20
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: default_search_base_url(),
            page_size: default_page_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformEndpoint {
    /// Base URL of the metadata service; `/video/detail` is appended.
    pub metadata_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformsConfig {
    #[serde(default = "default_tiktok_endpoint")]
    pub tiktok: PlatformEndpoint,
    #[serde(default = "default_instagram_endpoint")]
    pub instagram: PlatformEndpoint,
}

fn default_tiktok_endpoint() -> PlatformEndpoint {
    PlatformEndpoint {
        metadata_base_url: "https://www.tiktok.com/api".to_string(),
    }
}

fn default_instagram_endpoint() -> PlatformEndpoint {
    PlatformEndpoint {
        metadata_base_url: "https://www.instagram.com/api/v1".to_string(),
    }
}

impl Default for PlatformsConfig {
    fn default() -> Self {
        Self {
            tiktok: default_tiktok_endpoint(),
            instagram: default_instagram_endpoint(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenditionConfig {
    /// Quality label returned immediately when a manifest offers it.
    #[serde(default = "default_preferred_label")]
    pub preferred_label: String,
    /// Ceiling used when picking a search candidate's target rendition.
    #[serde(default = "default_max_target_height")]
    pub max_target_height: u32,
}

fn default_preferred_label() -> String {
    "240p".to_string()
}

fn default_max_target_height() -> u32 {
    720
}

impl Default for RenditionConfig {
    fn default() -> Self {
        Self {
            preferred_label: default_preferred_label(),
            max_target_height: default_max_target_height(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordConfig {
    /// Days a keyword rests after use before rotation picks it again.
    #[serde(default = "default_cooldown_days")]
    pub cooldown_days: u32,
    #[serde(default = "default_category")]
    pub default_category: String,
    #[serde(default = "default_history_category")]
    pub history_category: String,
}

fn default_cooldown_days() -> u32 {
    1
}

fn default_category() -> String {
    "general".to_string()
}

fn default_history_category() -> String {
    "history".to_string()
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            cooldown_days: default_cooldown_days(),
            default_category: default_category(),
            history_category: default_history_category(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Allows `sync: true` download requests that return the video inline.
    #[serde(default)]
    pub debug_sync: bool,
}

fn default_bind_address() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            debug_sync: false,
        }
    }
}
