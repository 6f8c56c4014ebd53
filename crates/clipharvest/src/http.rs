use std::time::Duration;

use reqwest::{Client, Url};

use crate::config::NetworkConfig;
use crate::error::ConfigError;

/// Creates an HTTP client with the configured connect timeout and the given
/// per-request deadline.
pub fn create_http_client(
    network: &NetworkConfig,
    request_timeout: Duration,
) -> Result<Client, ConfigError> {
    Client::builder()
        .connect_timeout(Duration::from_secs(network.connect_timeout_secs))
        .timeout(request_timeout)
        .user_agent(network.user_agent.clone())
        .build()
        .map_err(|e| ConfigError::Validation {
            message: format!("Failed to create HTTP client: {}", e),
        })
}

/// Joins a base URL and a path without doubling the separator.
pub fn join_url(base: &str, path: &str) -> Result<Url, String> {
    let joined = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Url::parse(&joined).map_err(|e| format!("invalid URL '{}': {}", joined, e))
}
