//! Product sync pass against mock storefront and dashboard servers.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dropship_core::config::schema::{default_price_rules, WatchedProduct};
use dropship_core::extract::FieldExtractor;
use dropship_core::fetch::{ResilientFetcher, StaticHeaders};
use dropship_core::lifecycle::Shutdown;
use dropship_core::resilience::Backoff;
use dropship_core::sync::{DashboardClient, ProductOutcome, ProductSync};
use reqwest::Client;

mod common;

const PRICED_PAGE: &str = r#"<html><body><h1>Desk Lamp</h1>
<span itemprop="price" content="24.88">$24.88</span></body></html>"#;

const UNPRICED_PAGE: &str = "<html><body><h1>Garden Hose</h1><p>Out of stock</p></body></html>";

async fn storefront() -> common::MockBackend {
    common::start_programmable_backend(|req| match req.path.as_str() {
        "/ip/lamp" => (200, PRICED_PAGE.to_string()),
        "/ip/hose" => (200, UNPRICED_PAGE.to_string()),
        _ => (404, "not found".to_string()),
    })
    .await
}

fn product_sync(site: &common::MockBackend, dashboard_url: String, products: &[(&str, &str)]) -> ProductSync {
    let fetcher = ResilientFetcher::new(Client::new(), Arc::new(StaticHeaders::browser_pool()))
        .with_retry(2, Backoff::NONE);
    let extractor = FieldExtractor::new(&default_price_rules()).unwrap();
    let dashboard = DashboardClient::new(Client::new(), dashboard_url).with_retry(3, Backoff::NONE);
    let products = products
        .iter()
        .map(|(name, path)| WatchedProduct {
            name: name.to_string(),
            url: site.url(path),
        })
        .collect();

    ProductSync::new(Arc::new(fetcher), Arc::new(extractor), dashboard, products)
}

#[tokio::test]
async fn test_sync_pushes_priced_and_skips_unpriced() {
    let site = storefront().await;
    let dashboard = common::start_mock_backend(201, r#"{"message":"Product added/updated"}"#).await;
    let sync = product_sync(
        &site,
        dashboard.url("/api/products"),
        &[("Desk Lamp", "/ip/lamp"), ("Garden Hose", "/ip/hose")],
    );

    let report = sync.sync_once().await;
    assert_eq!(report.pushed(), 1);
    assert_eq!(report.skipped(), 1);
    assert_eq!(report.failed(), 0);
    assert_eq!(
        report.outcome("Desk Lamp"),
        Some(&ProductOutcome::Pushed { price: 24.88 })
    );
    assert!(matches!(
        report.outcome("Garden Hose"),
        Some(ProductOutcome::Skipped { .. })
    ));

    // Only the priced product reaches the dashboard.
    let pushes = dashboard.requests();
    assert_eq!(pushes.len(), 1);
    assert_eq!(pushes[0].method, "POST");
    assert_eq!(pushes[0].path, "/api/products");
    assert_eq!(
        pushes[0].json(),
        serde_json::json!({"name": "Desk Lamp", "price": 24.88})
    );
}

#[tokio::test]
async fn test_push_retries_server_errors() {
    let site = storefront().await;
    let calls = AtomicU32::new(0);
    let dashboard = common::start_programmable_backend(move |_| {
        if calls.fetch_add(1, Ordering::SeqCst) == 0 {
            (503, "warming up".to_string())
        } else {
            (201, "{}".to_string())
        }
    })
    .await;
    let sync = product_sync(&site, dashboard.url("/api/products"), &[("Desk Lamp", "/ip/lamp")]);

    let report = sync.sync_once().await;
    assert_eq!(report.pushed(), 1);
    assert_eq!(dashboard.hits(), 2);
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let site = storefront().await;
    let dashboard = common::start_mock_backend(400, r#"{"error":"missing name"}"#).await;
    let sync = product_sync(&site, dashboard.url("/api/products"), &[("Desk Lamp", "/ip/lamp")]);

    let report = sync.sync_once().await;
    assert_eq!(report.failed(), 1);
    match report.outcome("Desk Lamp") {
        Some(ProductOutcome::Failed { error }) => assert!(error.contains("HTTP 400")),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(dashboard.hits(), 1);
}

#[tokio::test]
async fn test_unreachable_page_is_reported() {
    let site = storefront().await;
    let dashboard = common::start_mock_backend(201, "{}").await;
    let sync = product_sync(&site, dashboard.url("/api/products"), &[("Ghost", "/ip/missing")]);

    let report = sync.sync_once().await;
    assert_eq!(report.failed(), 1);
    assert_eq!(site.hits(), 2);
    assert_eq!(dashboard.hits(), 0);
}

#[tokio::test]
async fn test_run_syncs_then_stops_on_shutdown() {
    let site = storefront().await;
    let dashboard = common::start_mock_backend(201, "{}").await;
    let sync = Arc::new(
        product_sync(&site, dashboard.url("/api/products"), &[("Desk Lamp", "/ip/lamp")])
            .with_schedule(1, Duration::from_secs(3600)),
    );

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    let runner = sync.clone();
    let handle = tokio::spawn(async move { runner.run(rx).await });

    // First pass runs immediately.
    for _ in 0..100 {
        if dashboard.hits() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(dashboard.hits(), 1);

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("sync loop did not stop")
        .unwrap();
    assert_eq!(dashboard.hits(), 1);
}
