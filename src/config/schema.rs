//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the worker.
//! All types derive Serde traits for deserialization from config files.
//! Secret-bearing sections only derive `Deserialize` and print redacted
//! `Debug` output.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Root configuration for the dropship worker.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// OAuth credential for the protected marketplace API.
    pub credential: CredentialConfig,

    /// Page fetching settings.
    pub fetch: FetchConfig,

    /// Field extraction rules.
    pub extract: ExtractConfig,

    /// Periodic product sync to the dashboard.
    pub sync: SyncConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// OAuth refresh-token credential configuration.
#[derive(Deserialize)]
#[serde(default)]
pub struct CredentialConfig {
    /// Enable the credential manager and its renewal loop.
    pub enabled: bool,

    /// OAuth client identifier.
    pub client_id: String,

    /// OAuth client secret (HTTP Basic password).
    pub client_secret: SecretString,

    /// Long-lived refresh token.
    pub refresh_token: SecretString,

    /// Provider token endpoint.
    pub token_url: String,

    /// Scopes requested on every refresh (joined with spaces).
    pub scopes: Vec<String>,

    /// A token closer than this to expiry is treated as stale.
    pub safety_margin_secs: u64,

    /// Proactive renewal interval; must be shorter than the token lifetime.
    pub renewal_interval_secs: u64,

    /// Timeout for a single token exchange.
    pub request_timeout_secs: u64,

    /// Sliding window for the forced-refresh budget.
    pub forced_refresh_window_secs: u64,

    /// Maximum forced refreshes (401 recoveries) inside one window.
    pub max_forced_refreshes: u32,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            client_id: String::new(),
            client_secret: SecretString::new(String::new()),
            refresh_token: SecretString::new(String::new()),
            token_url: "https://api.ebay.com/identity/v1/oauth2/token".to_string(),
            scopes: vec!["https://api.ebay.com/oauth/api_scope".to_string()],
            safety_margin_secs: 60,
            renewal_interval_secs: 6000, // eBay user tokens live 7200s
            request_timeout_secs: 10,
            forced_refresh_window_secs: 60,
            max_forced_refreshes: 3,
        }
    }
}

impl std::fmt::Debug for CredentialConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialConfig")
            .field("enabled", &self.enabled)
            .field("client_id", &self.client_id)
            .field("client_secret", &redacted(&self.client_secret))
            .field("refresh_token", &redacted(&self.refresh_token))
            .field("token_url", &self.token_url)
            .field("scopes", &self.scopes)
            .field("safety_margin_secs", &self.safety_margin_secs)
            .field("renewal_interval_secs", &self.renewal_interval_secs)
            .finish()
    }
}

/// Page fetch configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Attempts per fetch, including the first.
    pub max_attempts: u32,

    /// Fixed delay between attempts in milliseconds.
    pub backoff_ms: u64,

    /// Total timeout for a single attempt in seconds.
    pub timeout_secs: u64,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Case-insensitive body markers that identify a challenge page.
    pub block_markers: Vec<String>,

    /// Optional header-rotation service.
    pub header_service: Option<HeaderServiceConfig>,

    /// Optional forwarding proxy.
    pub proxy: Option<ForwardProxyConfig>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 2000,
            timeout_secs: 15,
            connect_timeout_secs: 5,
            block_markers: default_block_markers(),
            header_service: None,
            proxy: None,
        }
    }
}

/// Markers seen on storefront challenge pages.
pub fn default_block_markers() -> Vec<String> {
    [
        "captcha",
        "robot or human",
        "robot check",
        "are you a robot",
        "not a robot",
    ]
    .iter()
    .map(|m| m.to_string())
    .collect()
}

/// Header-rotation service configuration.
#[derive(Deserialize)]
pub struct HeaderServiceConfig {
    /// Service endpoint (e.g. "https://headers.scrapeops.io/v1/browser-headers").
    pub endpoint: String,

    /// API key sent as the `api_key` query parameter.
    #[serde(default = "empty_secret")]
    pub api_key: SecretString,

    /// Number of header sets requested per call.
    #[serde(default = "default_num_results")]
    pub num_results: u32,

    /// Timeout for the header lookup in seconds.
    #[serde(default = "default_side_timeout")]
    pub timeout_secs: u64,
}

impl std::fmt::Debug for HeaderServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeaderServiceConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &redacted(&self.api_key))
            .field("num_results", &self.num_results)
            .finish()
    }
}

/// Forwarding proxy configuration.
#[derive(Deserialize)]
pub struct ForwardProxyConfig {
    /// Proxy endpoint (e.g. "http://api.scraperapi.com").
    pub endpoint: String,

    /// API key sent as the `api_key` query parameter.
    #[serde(default = "empty_secret")]
    pub api_key: SecretString,

    /// Country hint sent as `country_code`.
    #[serde(default)]
    pub country: Option<String>,
}

impl std::fmt::Debug for ForwardProxyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForwardProxyConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &redacted(&self.api_key))
            .field("country", &self.country)
            .finish()
    }
}

fn empty_secret() -> SecretString {
    SecretString::new(String::new())
}

fn default_num_results() -> u32 {
    2
}

fn default_side_timeout() -> u64 {
    5
}

/// Field extraction configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Site-specific price rules, tried in order before the generic fallbacks.
    pub price_rules: Vec<PriceRuleConfig>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            price_rules: default_price_rules(),
        }
    }
}

/// A site-specific price rule.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct PriceRuleConfig {
    /// Rule name for logs and metrics.
    pub name: String,

    /// CSS selector for the element carrying the price.
    pub selector: String,

    /// Read this attribute instead of the element text.
    #[serde(default)]
    pub attribute: Option<String>,
}

impl PriceRuleConfig {
    pub fn text(name: &str, selector: &str) -> Self {
        Self {
            name: name.to_string(),
            selector: selector.to_string(),
            attribute: None,
        }
    }

    pub fn attr(name: &str, selector: &str, attribute: &str) -> Self {
        Self {
            name: name.to_string(),
            selector: selector.to_string(),
            attribute: Some(attribute.to_string()),
        }
    }
}

/// Storefront rules known to carry price text.
pub fn default_price_rules() -> Vec<PriceRuleConfig> {
    vec![
        PriceRuleConfig::attr("walmart-itemprop", "[itemprop=\"price\"]", "content"),
        PriceRuleConfig::text("walmart-price-wrap", "span[data-automation-id=\"product-price\"]"),
        PriceRuleConfig::text("target-product-price", "[data-test=\"product-price\"]"),
        PriceRuleConfig::text("amazon-offscreen", ".a-price .a-offscreen"),
        PriceRuleConfig::text("amazon-price-block", "#priceblock_ourprice"),
        PriceRuleConfig::text("generic-price-class", ".price"),
    ]
}

/// Product sync configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Enable the periodic sync loop in the worker.
    pub enabled: bool,

    /// Dashboard product endpoint receiving `{name, price}` posts.
    pub dashboard_url: String,

    /// Interval between sync passes in seconds.
    pub interval_secs: u64,

    /// Products fetched concurrently during one pass.
    pub concurrency: usize,

    /// Push attempts per product.
    pub push_attempts: u32,

    /// Base delay for push retries in milliseconds.
    pub push_base_delay_ms: u64,

    /// Maximum delay for push retries in milliseconds.
    pub push_max_delay_ms: u64,

    /// Products to watch.
    pub products: Vec<WatchedProduct>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dashboard_url: "http://127.0.0.1:5000/api/products".to_string(),
            interval_secs: 600,
            concurrency: 2,
            push_attempts: 3,
            push_base_delay_ms: 250,
            push_max_delay_ms: 4000,
            products: Vec::new(),
        }
    }
}

/// A product page watched by the sync loop.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct WatchedProduct {
    /// Dashboard product name.
    pub name: String,

    /// Storefront page URL.
    pub url: String,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of human-readable output.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

fn redacted(secret: &SecretString) -> &'static str {
    if secret.expose_secret().is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert!(!config.credential.enabled);
        assert_eq!(config.fetch.max_attempts, 3);
        assert_eq!(config.fetch.backoff_ms, 2000);
        assert_eq!(config.sync.interval_secs, 600);
        assert!(config.fetch.block_markers.iter().any(|m| m == "captcha"));
        assert!(!config.extract.price_rules.is_empty());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut config = CredentialConfig::default();
        config.client_secret = SecretString::new("super-secret".to_string());
        let printed = format!("{:?}", config);
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("<redacted>"));
        assert!(printed.contains("refresh_token: \"<unset>\""));
    }
}
