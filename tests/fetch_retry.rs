//! Fetch retry, block detection, header rotation and proxy wrapping.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dropship_core::fetch::{
    AttemptOutcome, FetchError, ForwardingProxy, HeaderSet, ResilientFetcher, RotatingHeaderService,
    StaticHeaders,
};
use dropship_core::resilience::Backoff;
use reqwest::Client;
use secrecy::SecretString;

mod common;

const PRODUCT_PAGE: &str = r#"<html><head><title>Desk Lamp | Store</title></head>
<body><h1>Desk Lamp</h1><span itemprop="price" content="24.88">$24.88</span></body></html>"#;

const CHALLENGE_PAGE: &str = r#"<html><head><title>Robot or human?</title></head>
<body><div id="px-captcha">Activate and hold the button</div></body></html>"#;

fn fetcher() -> ResilientFetcher {
    ResilientFetcher::new(Client::new(), Arc::new(StaticHeaders::browser_pool()))
        .with_retry(3, Backoff::Fixed(Duration::from_millis(10)))
}

#[tokio::test]
async fn test_succeeds_on_third_attempt() {
    let calls = AtomicU32::new(0);
    let server = common::start_programmable_backend(move |_| {
        if calls.fetch_add(1, Ordering::SeqCst) < 2 {
            (503, "Service Unavailable".to_string())
        } else {
            (200, PRODUCT_PAGE.to_string())
        }
    })
    .await;

    let page = fetcher().fetch(&server.url("/ip/12345")).await.unwrap();
    assert_eq!(page.body, PRODUCT_PAGE);
    assert_eq!(page.status, 200);
    assert_eq!(page.attempts_made(), 3);

    let outcomes: Vec<_> = page.attempts.iter().map(|a| a.outcome).collect();
    assert_eq!(
        outcomes,
        vec![AttemptOutcome::Blocked, AttemptOutcome::Blocked, AttemptOutcome::Success]
    );
    assert_eq!(page.attempts[0].response_status, Some(503));
    assert_eq!(page.attempts[0].error.as_deref(), Some("HTTP 503"));
    assert!(page.attempts[2].error.is_none());
    assert_eq!(server.hits(), 3);
}

#[tokio::test]
async fn test_challenge_page_exhausts_retries() {
    let server = common::start_mock_backend(200, CHALLENGE_PAGE).await;

    let err = fetcher().fetch(&server.url("/ip/999")).await.unwrap_err();
    match err {
        FetchError::ExhaustedRetries {
            url,
            last_error,
            attempts_made,
            attempts,
        } => {
            assert_eq!(attempts_made, 3);
            assert_eq!(attempts.len(), 3);
            assert!(url.ends_with("/ip/999"));
            assert!(last_error.contains("captcha"));
            assert!(attempts.iter().all(|a| a.outcome == AttemptOutcome::Blocked));
            assert!(attempts.iter().all(|a| a.response_status == Some(200)));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(server.hits(), 3);
}

#[tokio::test]
async fn test_fetch_with_overrides_attempts() {
    let server = common::start_mock_backend(500, "oops").await;

    let err = fetcher()
        .fetch_with(&server.url("/"), 5, Backoff::NONE)
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::ExhaustedRetries { attempts_made: 5, .. }));

    let err = fetcher()
        .fetch_with(&server.url("/"), 0, Backoff::NONE)
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::ExhaustedRetries { attempts_made: 1, .. }));
    assert_eq!(server.hits(), 6);
}

#[tokio::test]
async fn test_sends_browser_headers() {
    let server = common::start_mock_backend(200, PRODUCT_PAGE).await;
    let fixed = HeaderSet::browser("Mozilla/5.0 (X11; Linux x86_64) TestBrowser/1.0");
    let fetcher = ResilientFetcher::new(Client::new(), Arc::new(StaticHeaders::fixed(fixed)));

    let page = fetcher.fetch(&server.url("/p")).await.unwrap();
    let request = &server.requests()[0];
    assert_eq!(
        request.header("user-agent"),
        Some("Mozilla/5.0 (X11; Linux x86_64) TestBrowser/1.0")
    );
    assert_eq!(request.header("accept-language"), Some("en-US,en;q=0.9"));
    assert_eq!(
        page.attempts[0].headers_used.user_agent(),
        Some("Mozilla/5.0 (X11; Linux x86_64) TestBrowser/1.0")
    );
}

#[tokio::test]
async fn test_header_service_rotation() {
    let headers = common::start_programmable_backend(|req| {
        assert_eq!(req.query_param("api_key"), Some("hs-key"));
        assert_eq!(req.query_param("num_results"), Some("2"));
        (
            200,
            r#"{"result":[{"user-agent":"Rotated/1.0","accept-language":"en-GB"},{"user-agent":"Rotated/2.0"}]}"#
                .to_string(),
        )
    })
    .await;
    let site = common::start_mock_backend(200, PRODUCT_PAGE).await;

    let source = RotatingHeaderService::new(
        Client::new(),
        headers.url("/v1/browser-headers"),
        SecretString::new("hs-key".into()),
        2,
    );
    let fetcher = ResilientFetcher::new(Client::new(), Arc::new(source));

    fetcher.fetch(&site.url("/p")).await.unwrap();
    assert_eq!(headers.hits(), 1);
    assert_eq!(site.requests()[0].header("user-agent"), Some("Rotated/1.0"));
    assert_eq!(site.requests()[0].header("accept-language"), Some("en-GB"));
}

#[tokio::test]
async fn test_header_service_failure_falls_back() {
    let headers = common::start_mock_backend(500, "down").await;
    let site = common::start_mock_backend(200, PRODUCT_PAGE).await;

    let source = RotatingHeaderService::new(
        Client::new(),
        headers.url("/v1/browser-headers"),
        SecretString::new("hs-key".into()),
        1,
    );
    let fetcher = ResilientFetcher::new(Client::new(), Arc::new(source));

    let page = fetcher.fetch(&site.url("/p")).await.unwrap();
    assert_eq!(page.attempts_made(), 1);
    let ua = site.requests()[0].header("user-agent").unwrap_or_default().to_string();
    assert!(ua.starts_with("Mozilla/5.0"), "fallback profile expected, got {ua}");
}

#[tokio::test]
async fn test_forwarding_proxy_wraps_target() {
    let proxy_server = common::start_mock_backend(200, PRODUCT_PAGE).await;
    let proxy = ForwardingProxy::parse(
        &proxy_server.url("/"),
        SecretString::new("px-key".into()),
        Some("us".into()),
    )
    .unwrap();
    let fetcher = fetcher().with_proxy(proxy);

    let target = "https://www.walmart.com/ip/Desk-Lamp/12345";
    let page = fetcher.fetch(target).await.unwrap();
    assert_eq!(page.url, target);

    let request = &proxy_server.requests()[0];
    assert_eq!(request.query_param("api_key"), Some("px-key"));
    assert_eq!(request.query_param("url"), Some(target));
    assert_eq!(request.query_param("country_code"), Some("us"));
}
