use std::path::{Path, PathBuf};

use crate::config::schema::Config;
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "CLIPHARVEST_CONFIG";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

/// Returns the config file to load: `$CLIPHARVEST_CONFIG` if set, otherwise
/// `~/.clipharvest/config.json` when that file exists.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::home_dir()
        .map(|h| h.join(".clipharvest").join("config.json"))
        .filter(|p| p.exists())
}

/// Loads the resolved config file, or falls back to defaults when none exists.
pub fn load_config_or_default() -> Result<Config, ConfigError> {
    match resolve_config_path() {
        Some(path) => {
            log::info!("Loading configuration from {}", path.display());
            load_config(path)
        }
        None => {
            log::info!("No configuration file found, using defaults");
            Ok(Config::default())
        }
    }
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.queue.worker_count == 0 {
        return Err(ConfigError::Validation {
            message: "queue.worker_count must be greater than 0".to_string(),
        });
    }

    if config.queue.max_attempts == 0 {
        return Err(ConfigError::Validation {
            message: "queue.max_attempts must be at least 1".to_string(),
        });
    }

    if config.queue.retry_base_delay_ms > config.queue.retry_max_delay_ms {
        return Err(ConfigError::Validation {
            message: "queue.retry_base_delay_ms exceeds queue.retry_max_delay_ms".to_string(),
        });
    }

    if config.renditions.preferred_label.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "renditions.preferred_label must not be empty".to_string(),
        });
    }

    validate_url("search.base_url", &config.search.base_url)?;
    validate_url(
        "platforms.tiktok.metadata_base_url",
        &config.platforms.tiktok.metadata_base_url,
    )?;
    validate_url(
        "platforms.instagram.metadata_base_url",
        &config.platforms.instagram.metadata_base_url,
    )?;

    Ok(())
}

fn validate_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = reqwest::Url::parse(value).map_err(|e| ConfigError::InvalidUrl {
        field: field.to_string(),
        reason: e.to_string(),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl {
            field: field.to_string(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }

    Ok(())
}
