pub mod loader;
pub mod schema;

pub use loader::{load_config, load_config_from_str, load_config_or_default, resolve_config_path};
pub use schema::{
    Config, KeywordConfig, NetworkConfig, PlatformEndpoint, PlatformsConfig, QueueConfig,
    RenditionConfig, SearchConfig, ServerConfig,
};
