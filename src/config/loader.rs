//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use secrecy::SecretString;
use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Environment variables that override secrets and endpoints from the file.
pub const ENV_CLIENT_ID: &str = "EBAY_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "EBAY_CLIENT_SECRET";
pub const ENV_REFRESH_TOKEN: &str = "EBAY_REFRESH_TOKEN";
pub const ENV_HEADER_SERVICE_KEY: &str = "HEADER_SERVICE_API_KEY";
pub const ENV_PROXY_KEY: &str = "PROXY_API_KEY";
pub const ENV_DASHBOARD_URL: &str = "DASHBOARD_API_URL";

/// Parse a configuration from TOML text without touching the environment.
pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Load and validate configuration from a TOML file.
///
/// A missing file yields the defaults so the worker can run purely from
/// environment variables. Overrides are applied before validation.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let mut config = if path.exists() {
        let content = fs::read_to_string(path)?;
        parse_config(&content)?
    } else {
        tracing::info!(path = %path.display(), "Config file not found, using defaults");
        AppConfig::default()
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply environment overrides through `lookup`.
///
/// Supplying a client id from the environment enables the credential.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(id) = lookup(ENV_CLIENT_ID) {
        config.credential.client_id = id;
        config.credential.enabled = true;
    }
    if let Some(secret) = lookup(ENV_CLIENT_SECRET) {
        config.credential.client_secret = SecretString::new(secret);
    }
    if let Some(token) = lookup(ENV_REFRESH_TOKEN) {
        config.credential.refresh_token = SecretString::new(token);
    }
    if let Some(key) = lookup(ENV_HEADER_SERVICE_KEY) {
        if let Some(service) = config.fetch.header_service.as_mut() {
            service.api_key = SecretString::new(key);
        }
    }
    if let Some(key) = lookup(ENV_PROXY_KEY) {
        if let Some(proxy) = config.fetch.proxy.as_mut() {
            proxy.api_key = SecretString::new(key);
        }
    }
    if let Some(url) = lookup(ENV_DASHBOARD_URL) {
        config.sync.dashboard_url = url;
    }
}
