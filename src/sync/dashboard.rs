//! Dashboard product API client.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;
use thiserror::Error;

use crate::config::schema::SyncConfig;
use crate::fetch::FetchError;
use crate::observability::metrics;
use crate::resilience::Backoff;

/// Body posted for one product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductUpdate {
    pub name: String,
    pub price: f64,
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Dashboard rejected update with HTTP {status}: {body}")]
    Push { status: u16, body: String },

    #[error("Dashboard request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl SyncError {
    fn is_retryable(&self) -> bool {
        match self {
            SyncError::Push { status, .. } => *status >= 500 || *status == 429,
            SyncError::Http(_) => true,
            SyncError::Fetch(_) => false,
        }
    }
}

/// Posts product updates; `201 Created` means stored.
#[derive(Debug, Clone)]
pub struct DashboardClient {
    client: Client,
    url: String,
    attempts: u32,
    backoff: Backoff,
}

impl DashboardClient {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            attempts: 1,
            backoff: Backoff::NONE,
        }
    }

    pub fn with_retry(mut self, attempts: u32, backoff: Backoff) -> Self {
        self.attempts = attempts.max(1);
        self.backoff = backoff;
        self
    }

    pub fn from_config(client: Client, config: &SyncConfig) -> Self {
        Self::new(client, config.dashboard_url.clone()).with_retry(
            config.push_attempts,
            Backoff::Exponential {
                base: Duration::from_millis(config.push_base_delay_ms),
                max: Duration::from_millis(config.push_max_delay_ms),
            },
        )
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Push one update. Server errors and transport failures are retried;
    /// other rejections are returned at once.
    pub async fn push(&self, update: &ProductUpdate) -> Result<(), SyncError> {
        let mut attempt = 1;
        loop {
            match self.push_once(update).await {
                Ok(()) => {
                    metrics::record_sync_push("stored");
                    tracing::info!(product = %update.name, price = update.price, "Dashboard updated");
                    return Ok(());
                }
                Err(e) if e.is_retryable() && attempt < self.attempts => {
                    let delay = self.backoff.delay(attempt);
                    tracing::warn!(
                        product = %update.name,
                        attempt,
                        error = %e,
                        delay_ms = delay.as_millis() as u64,
                        "Dashboard push failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    metrics::record_sync_push("failed");
                    return Err(e);
                }
            }
        }
    }

    async fn push_once(&self, update: &ProductUpdate) -> Result<(), SyncError> {
        let response = self.client.post(&self.url).json(update).send().await?;
        let status = response.status();
        if status == StatusCode::CREATED {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(SyncError::Push {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_wire_shape() {
        let update = ProductUpdate {
            name: "Test Product".into(),
            price: 12.99,
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json, serde_json::json!({"name": "Test Product", "price": 12.99}));
    }

    #[test]
    fn test_retryable_statuses() {
        let push = |status| SyncError::Push {
            status,
            body: String::new(),
        };
        assert!(push(503).is_retryable());
        assert!(push(429).is_retryable());
        assert!(!push(400).is_retryable());
        assert!(!push(200).is_retryable());
    }

    #[test]
    fn test_from_config_uses_exponential_backoff() {
        let config = SyncConfig::default();
        let client = DashboardClient::from_config(Client::new(), &config);
        assert_eq!(client.attempts, 3);
        assert!(matches!(client.backoff, Backoff::Exponential { .. }));
        assert_eq!(client.url(), config.dashboard_url);
    }
}
