//! Startup orchestration.
//!
//! # Responsibilities
//! - Build every component from a validated `AppConfig`
//! - Fail fast: any construction error is fatal
//! - Leave spawning to the caller (worker or CLI)

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::credential::{AuthorizedClient, CredentialError, CredentialManager};
use crate::extract::{ExtractorBuildError, FieldExtractor};
use crate::fetch::{FetchError, ResilientFetcher};
use crate::resilience::{bounded_client, Timeouts};
use crate::sync::{DashboardClient, ProductSync};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Credential setup failed: {0}")]
    Credential(#[from] CredentialError),

    #[error("Fetcher setup failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Extractor setup failed: {0}")]
    Extractor(#[from] ExtractorBuildError),

    #[error("HTTP client setup failed: {0}")]
    Client(#[from] reqwest::Error),
}

/// Everything the binaries need, wired together.
pub struct Services {
    /// Present when `credential.enabled`.
    pub credentials: Option<Arc<CredentialManager>>,
    pub authorized: Option<AuthorizedClient>,
    pub renewal_interval: Duration,
    pub fetcher: Arc<ResilientFetcher>,
    pub extractor: Arc<FieldExtractor>,
    pub sync: Arc<ProductSync>,
    pub sync_enabled: bool,
}

impl Services {
    pub fn build(config: AppConfig) -> Result<Self, StartupError> {
        let AppConfig {
            credential,
            fetch,
            extract,
            sync,
            ..
        } = config;

        let renewal_interval = Duration::from_secs(credential.renewal_interval_secs);
        let (credentials, authorized) = if credential.enabled {
            let timeouts = Timeouts::from_secs(credential.request_timeout_secs, credential.request_timeout_secs);
            let manager = Arc::new(CredentialManager::from_config(credential)?);
            let client = AuthorizedClient::new(bounded_client(timeouts)?, manager.clone());
            (Some(manager), Some(client))
        } else {
            tracing::info!("Credential management disabled");
            (None, None)
        };

        let fetcher = Arc::new(ResilientFetcher::from_config(&fetch)?);
        let extractor = Arc::new(FieldExtractor::from_config(&extract)?);

        let dashboard = DashboardClient::from_config(
            bounded_client(Timeouts::from_secs(fetch.connect_timeout_secs, fetch.timeout_secs))?,
            &sync,
        );
        let product_sync = Arc::new(ProductSync::from_config(
            &sync,
            fetcher.clone(),
            extractor.clone(),
            dashboard,
        ));

        tracing::info!(
            credential = credentials.is_some(),
            price_rules = extractor.rule_names().len(),
            max_attempts = fetcher.max_attempts(),
            watched_products = sync.products.len(),
            "Services initialised"
        );

        Ok(Self {
            credentials,
            authorized,
            renewal_interval,
            fetcher,
            extractor,
            sync: product_sync,
            sync_enabled: sync.enabled,
        })
    }
}
