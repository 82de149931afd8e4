//! Periodic product price sync.

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::time::{self, MissedTickBehavior};

use crate::config::schema::{SyncConfig, WatchedProduct};
use crate::extract::FieldExtractor;
use crate::fetch::ResilientFetcher;
use crate::sync::dashboard::{DashboardClient, ProductUpdate, SyncError};

/// Result of one product in a pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProductOutcome {
    Pushed { price: f64 },
    /// Page fetched but no price found; nothing was pushed.
    Skipped { reason: String },
    Failed { error: String },
}

/// Summary of one sync pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub results: Vec<(String, ProductOutcome)>,
}

impl SyncReport {
    pub fn pushed(&self) -> usize {
        self.count(|o| matches!(o, ProductOutcome::Pushed { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, ProductOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, ProductOutcome::Failed { .. }))
    }

    pub fn outcome(&self, name: &str) -> Option<&ProductOutcome> {
        self.results.iter().find(|(n, _)| n == name).map(|(_, o)| o)
    }

    fn count(&self, pred: impl Fn(&ProductOutcome) -> bool) -> usize {
        self.results.iter().filter(|(_, o)| pred(o)).count()
    }
}

/// Fetches watched products, extracts prices and pushes them to the dashboard.
pub struct ProductSync {
    fetcher: Arc<ResilientFetcher>,
    extractor: Arc<FieldExtractor>,
    dashboard: DashboardClient,
    products: Vec<WatchedProduct>,
    concurrency: usize,
    interval: Duration,
}

impl ProductSync {
    pub fn new(
        fetcher: Arc<ResilientFetcher>,
        extractor: Arc<FieldExtractor>,
        dashboard: DashboardClient,
        products: Vec<WatchedProduct>,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            dashboard,
            products,
            concurrency: 2,
            interval: Duration::from_secs(600),
        }
    }

    pub fn with_schedule(mut self, concurrency: usize, interval: Duration) -> Self {
        self.concurrency = concurrency.max(1);
        self.interval = interval;
        self
    }

    pub fn from_config(
        config: &SyncConfig,
        fetcher: Arc<ResilientFetcher>,
        extractor: Arc<FieldExtractor>,
        dashboard: DashboardClient,
    ) -> Self {
        Self::new(fetcher, extractor, dashboard, config.products.clone())
            .with_schedule(config.concurrency, Duration::from_secs(config.interval_secs))
    }

    /// One pass over every watched product.
    pub async fn sync_once(&self) -> SyncReport {
        let futures: Vec<_> = self
            .products
            .iter()
            .map(|product| async move {
                let outcome = match self.sync_product(product).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        tracing::warn!(product = %product.name, error = %e, "Product sync failed");
                        ProductOutcome::Failed {
                            error: e.to_string(),
                        }
                    }
                };
                (product.name.clone(), outcome)
            })
            .collect();
        let results: Vec<(String, ProductOutcome)> = stream::iter(futures)
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let report = SyncReport { results };
        tracing::info!(
            pushed = report.pushed(),
            skipped = report.skipped(),
            failed = report.failed(),
            "Sync pass complete"
        );
        report
    }

    async fn sync_product(&self, product: &WatchedProduct) -> Result<ProductOutcome, SyncError> {
        let page = self.fetcher.fetch(&product.url).await?;
        let extracted = self.extractor.extract(&page.body, &page.url);

        let Some(price) = extracted.price else {
            tracing::warn!(product = %product.name, url = %product.url, "No price extracted, skipping push");
            return Ok(ProductOutcome::Skipped {
                reason: "no price found on page".to_string(),
            });
        };

        self.dashboard
            .push(&ProductUpdate {
                name: product.name.clone(),
                price,
            })
            .await?;
        Ok(ProductOutcome::Pushed { price })
    }

    /// Run a pass immediately and then every interval until shutdown.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            products = self.products.len(),
            interval_secs = self.interval.as_secs(),
            dashboard = %self.dashboard.url(),
            "Product sync started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sync_once().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Product sync shutting down");
                    break;
                }
            }
        }
    }
}
