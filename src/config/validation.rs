//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges, URLs and CSS
//! selectors. All problems are collected so a bad file is reported in one go.

use std::fmt;

use scraper::Selector;
use secrecy::ExposeSecret;
use url::Url;

use crate::config::schema::AppConfig;

/// Upper bound for any configured duration (ten years).
pub const MAX_DURATION_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let credential = &config.credential;
    if credential.enabled {
        if credential.client_id.is_empty() {
            errors.push(ValidationError::new("credential.client_id", "must be set"));
        }
        if credential.client_secret.expose_secret().is_empty() {
            errors.push(ValidationError::new("credential.client_secret", "must be set"));
        }
        if credential.refresh_token.expose_secret().is_empty() {
            errors.push(ValidationError::new("credential.refresh_token", "must be set"));
        }
        check_url(&mut errors, "credential.token_url", &credential.token_url);
        if credential.renewal_interval_secs == 0 {
            errors.push(ValidationError::new(
                "credential.renewal_interval_secs",
                "must be greater than 0",
            ));
        }
        for (field, secs) in [
            ("credential.renewal_interval_secs", credential.renewal_interval_secs),
            ("credential.safety_margin_secs", credential.safety_margin_secs),
            ("credential.forced_refresh_window_secs", credential.forced_refresh_window_secs),
        ] {
            if secs > MAX_DURATION_SECS {
                errors.push(ValidationError::new(
                    field,
                    format!("must be at most {} seconds", MAX_DURATION_SECS),
                ));
            }
        }
        if credential.safety_margin_secs >= credential.renewal_interval_secs {
            errors.push(ValidationError::new(
                "credential.safety_margin_secs",
                "must be shorter than renewal_interval_secs",
            ));
        }
    }
    if credential.request_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "credential.request_timeout_secs",
            "must be greater than 0",
        ));
    }
    if credential.max_forced_refreshes == 0 {
        errors.push(ValidationError::new(
            "credential.max_forced_refreshes",
            "must allow at least one forced refresh",
        ));
    }

    let fetch = &config.fetch;
    if fetch.max_attempts == 0 {
        errors.push(ValidationError::new("fetch.max_attempts", "must be at least 1"));
    }
    if fetch.timeout_secs == 0 {
        errors.push(ValidationError::new("fetch.timeout_secs", "must be greater than 0"));
    }
    if fetch.block_markers.iter().any(|m| m.trim().is_empty()) {
        errors.push(ValidationError::new("fetch.block_markers", "markers must not be empty"));
    }
    if let Some(service) = &fetch.header_service {
        check_url(&mut errors, "fetch.header_service.endpoint", &service.endpoint);
        if service.num_results == 0 {
            errors.push(ValidationError::new(
                "fetch.header_service.num_results",
                "must be at least 1",
            ));
        }
    }
    if let Some(proxy) = &fetch.proxy {
        check_url(&mut errors, "fetch.proxy.endpoint", &proxy.endpoint);
    }

    for (i, rule) in config.extract.price_rules.iter().enumerate() {
        if Selector::parse(&rule.selector).is_err() {
            errors.push(ValidationError::new(
                format!("extract.price_rules[{}].selector", i),
                format!("invalid CSS selector '{}'", rule.selector),
            ));
        }
    }

    let sync = &config.sync;
    if sync.enabled {
        check_url(&mut errors, "sync.dashboard_url", &sync.dashboard_url);
        if sync.interval_secs == 0 {
            errors.push(ValidationError::new("sync.interval_secs", "must be greater than 0"));
        }
        for (i, product) in sync.products.iter().enumerate() {
            check_url(&mut errors, &format!("sync.products[{}].url", i), &product.url);
        }
    }
    if sync.concurrency == 0 {
        errors.push(ValidationError::new("sync.concurrency", "must be at least 1"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    match Url::parse(value) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(ValidationError::new(
            field,
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new(field, format!("invalid URL: {}", e))),
    }
}
