//! Retrying page fetcher.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use thiserror::Error;
use url::Url;
use uuid::Uuid;

use crate::config::schema::FetchConfig;
use crate::fetch::classify::{classify, Verdict};
use crate::fetch::headers::{HeaderSet, HeaderSource, RotatingHeaderService, StaticHeaders};
use crate::fetch::proxy::ForwardingProxy;
use crate::observability::metrics;
use crate::resilience::{bounded_client, Backoff, Timeouts};

/// How one attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    Blocked,
    NetworkError,
    ParseError,
}

impl AttemptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptOutcome::Success => "success",
            AttemptOutcome::Blocked => "blocked",
            AttemptOutcome::NetworkError => "network_error",
            AttemptOutcome::ParseError => "parse_error",
        }
    }
}

/// Record of one attempt.
#[derive(Debug, Clone, Serialize)]
pub struct FetchAttempt {
    pub attempt_number: u32,
    pub headers_used: HeaderSet,
    pub response_status: Option<u16>,
    pub elapsed_ms: u64,
    pub outcome: AttemptOutcome,
    /// Absent on success.
    pub error: Option<String>,
}

/// A usable page.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub url: String,
    pub status: u16,
    pub body: String,
    pub attempts: Vec<FetchAttempt>,
}

impl FetchResult {
    pub fn attempts_made(&self) -> u32 {
        self.attempts.len() as u32
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Giving up on {url} after {attempts_made} attempts: {last_error}")]
    ExhaustedRetries {
        url: String,
        last_error: String,
        attempts_made: u32,
        attempts: Vec<FetchAttempt>,
    },

    #[error("Failed to build fetch client: {0}")]
    Client(String),
}

pub type FetchOutcome = Result<FetchResult, FetchError>;

/// Fetches pages, rotating headers and retrying blocked or failed attempts.
pub struct ResilientFetcher {
    client: Client,
    headers: Arc<dyn HeaderSource>,
    fallback: StaticHeaders,
    proxy: Option<ForwardingProxy>,
    block_markers: Vec<String>,
    max_attempts: u32,
    backoff: Backoff,
}

impl ResilientFetcher {
    /// Fetcher with the default retry policy (3 attempts, fixed 2s).
    pub fn new(client: Client, headers: Arc<dyn HeaderSource>) -> Self {
        let defaults = FetchConfig::default();
        Self {
            client,
            headers,
            fallback: StaticHeaders::browser_pool(),
            proxy: None,
            block_markers: defaults.block_markers,
            max_attempts: defaults.max_attempts,
            backoff: Backoff::Fixed(Duration::from_millis(defaults.backoff_ms)),
        }
    }

    pub fn with_retry(mut self, max_attempts: u32, backoff: Backoff) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.backoff = backoff;
        self
    }

    pub fn with_proxy(mut self, proxy: ForwardingProxy) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn with_block_markers(mut self, markers: Vec<String>) -> Self {
        self.block_markers = markers.into_iter().map(|m| m.to_lowercase()).collect();
        self
    }

    pub fn from_config(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = bounded_client(Timeouts::from_secs(config.connect_timeout_secs, config.timeout_secs))
            .map_err(|e| FetchError::Client(e.to_string()))?;

        let headers: Arc<dyn HeaderSource> = match &config.header_service {
            Some(service) => {
                let side_client = bounded_client(Timeouts::from_secs(
                    config.connect_timeout_secs,
                    service.timeout_secs,
                ))
                .map_err(|e| FetchError::Client(e.to_string()))?;
                Arc::new(RotatingHeaderService::new(
                    side_client,
                    service.endpoint.clone(),
                    SecretString::new(service.api_key.expose_secret().clone()),
                    service.num_results,
                ))
            }
            None => Arc::new(StaticHeaders::browser_pool()),
        };

        let mut fetcher = Self::new(client, headers)
            .with_retry(
                config.max_attempts,
                Backoff::Fixed(Duration::from_millis(config.backoff_ms)),
            )
            .with_block_markers(config.block_markers.clone());

        if let Some(proxy) = &config.proxy {
            let proxy = ForwardingProxy::parse(
                &proxy.endpoint,
                SecretString::new(proxy.api_key.expose_secret().clone()),
                proxy.country.clone(),
            )
            .map_err(|e| FetchError::Client(format!("invalid proxy endpoint: {}", e)))?;
            fetcher = fetcher.with_proxy(proxy);
        }

        Ok(fetcher)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Fetch `url` with the configured retry policy.
    pub async fn fetch(&self, url: &str) -> FetchOutcome {
        self.fetch_with(url, self.max_attempts, self.backoff).await
    }

    /// Fetch `url` with an explicit retry policy.
    ///
    /// Returns as soon as one attempt yields a usable page. `max_attempts`
    /// of zero still makes one attempt.
    pub async fn fetch_with(&self, url: &str, max_attempts: u32, backoff: Backoff) -> FetchOutcome {
        let target = parse_target(url)?;
        let max_attempts = max_attempts.max(1);
        let fetch_id = Uuid::new_v4();
        let started = Instant::now();
        let mut attempts = Vec::with_capacity(max_attempts as usize);

        for attempt_number in 1..=max_attempts {
            let (record, body) = self.attempt(&target, attempt_number).await;
            metrics::record_fetch_attempt(record.outcome.as_str());

            if let (Some(body), Some(status)) = (body, record.response_status) {
                tracing::info!(
                    fetch_id = %fetch_id,
                    url = %target,
                    attempt = attempt_number,
                    status,
                    elapsed_ms = record.elapsed_ms,
                    "Fetched page"
                );
                attempts.push(record);
                metrics::record_fetch("success", started);
                return Ok(FetchResult {
                    url: target.to_string(),
                    status,
                    body,
                    attempts,
                });
            }

            tracing::warn!(
                fetch_id = %fetch_id,
                url = %target,
                attempt = attempt_number,
                max_attempts,
                outcome = record.outcome.as_str(),
                error = record.error.as_deref().unwrap_or("-"),
                "Fetch attempt failed"
            );
            attempts.push(record);

            if attempt_number < max_attempts {
                tokio::time::sleep(backoff.delay(attempt_number)).await;
            }
        }

        metrics::record_fetch("exhausted", started);
        let last_error = attempts
            .last()
            .and_then(|a| a.error.clone())
            .unwrap_or_else(|| "unknown error".to_string());
        tracing::error!(
            fetch_id = %fetch_id,
            url = %target,
            attempts = attempts.len(),
            last_error = %last_error,
            "Fetch exhausted retries"
        );

        Err(FetchError::ExhaustedRetries {
            url: target.to_string(),
            last_error,
            attempts_made: attempts.len() as u32,
            attempts,
        })
    }

    /// One GET. The body is returned only for a usable page.
    async fn attempt(&self, target: &Url, attempt_number: u32) -> (FetchAttempt, Option<String>) {
        let headers = self.resolve_headers(attempt_number).await;
        let request_url = match &self.proxy {
            Some(proxy) => proxy.wrap(target),
            None => target.clone(),
        };

        let started = Instant::now();
        let mut record = FetchAttempt {
            attempt_number,
            headers_used: headers,
            response_status: None,
            elapsed_ms: 0,
            outcome: AttemptOutcome::NetworkError,
            error: None,
        };

        let sent = self
            .client
            .get(request_url)
            .headers(record.headers_used.to_header_map())
            .send()
            .await;

        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                // The request URL may carry the proxy key.
                let e = e.without_url();
                record.elapsed_ms = started.elapsed().as_millis() as u64;
                record.error = Some(if e.is_timeout() {
                    "request timed out".to_string()
                } else {
                    format!("network error: {}", e)
                });
                return (record, None);
            }
        };

        let status = response.status();
        record.response_status = Some(status.as_u16());

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                record.elapsed_ms = started.elapsed().as_millis() as u64;
                record.outcome = AttemptOutcome::ParseError;
                record.error = Some(format!("unreadable body: {}", e.without_url()));
                return (record, None);
            }
        };
        record.elapsed_ms = started.elapsed().as_millis() as u64;

        match classify(status, &body, &self.block_markers) {
            Verdict::Usable => {
                record.outcome = AttemptOutcome::Success;
                (record, Some(body))
            }
            verdict => {
                record.outcome = AttemptOutcome::Blocked;
                record.error = verdict.reason();
                (record, None)
            }
        }
    }

    async fn resolve_headers(&self, attempt_number: u32) -> HeaderSet {
        match self.headers.headers_for(attempt_number).await {
            Ok(headers) => headers,
            Err(e) => {
                tracing::warn!(
                    attempt = attempt_number,
                    error = %e,
                    "Header source failed, using built-in profile"
                );
                self.fallback.next_profile()
            }
        }
    }
}

impl std::fmt::Debug for ResilientFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientFetcher")
            .field("proxy", &self.proxy)
            .field("max_attempts", &self.max_attempts)
            .field("backoff", &self.backoff)
            .finish()
    }
}

fn parse_target(url: &str) -> Result<Url, FetchError> {
    let invalid = |reason: String| FetchError::InvalidUrl {
        url: url.to_string(),
        reason,
    };
    let parsed = Url::parse(url).map_err(|e| invalid(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(invalid(format!("unsupported scheme '{}'", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher() -> ResilientFetcher {
        ResilientFetcher::new(Client::new(), Arc::new(StaticHeaders::browser_pool()))
    }

    #[tokio::test]
    async fn test_invalid_url_fails_fast() {
        let err = fetcher().fetch("not a url").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));

        let err = fetcher().fetch("ftp://example.com/file").await.unwrap_err();
        match err {
            FetchError::InvalidUrl { reason, .. } => assert!(reason.contains("ftp")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_zero_attempts_clamped() {
        let f = fetcher().with_retry(0, Backoff::NONE);
        assert_eq!(f.max_attempts(), 1);
    }

    #[test]
    fn test_markers_lowercased() {
        let f = fetcher().with_block_markers(vec!["Access DENIED".into()]);
        assert_eq!(f.block_markers, vec!["access denied".to_string()]);
    }

    #[test]
    fn test_from_config_defaults() {
        let f = ResilientFetcher::from_config(&FetchConfig::default()).unwrap();
        assert_eq!(f.max_attempts(), 3);
        assert_eq!(f.backoff, Backoff::Fixed(Duration::from_secs(2)));
        assert!(f.proxy.is_none());
    }

    #[tokio::test]
    async fn test_connection_refused_exhausts() {
        // Port 9 on localhost is closed in test environments.
        let f = fetcher().with_retry(2, Backoff::NONE);
        let err = f.fetch("http://127.0.0.1:9/").await.unwrap_err();
        match err {
            FetchError::ExhaustedRetries {
                attempts_made,
                attempts,
                ..
            } => {
                assert_eq!(attempts_made, 2);
                assert!(attempts
                    .iter()
                    .all(|a| a.outcome == AttemptOutcome::NetworkError && a.error.is_some()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
