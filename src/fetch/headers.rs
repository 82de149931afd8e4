//! Request header sources.
//!
//! # Responsibilities
//! - Provide a browser-like header set for every fetch attempt
//! - Vary the set between attempts so retries do not look identical
//! - Pull sets from a header-rotation service when one is configured

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Browser user agents rotated by [`StaticHeaders`].
pub const BROWSER_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:127.0) Gecko/20100101 Firefox/127.0",
];

/// An ordered set of request headers (lower-cased names).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderSet(BTreeMap<String, String>);

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: &str) {
        self.0.insert(name.to_ascii_lowercase(), value.to_string());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.get("user-agent")
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Browser profile built around `user_agent`.
    pub fn browser(user_agent: &str) -> Self {
        HeaderSet::new()
            .with("user-agent", user_agent)
            .with(
                "accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
            )
            .with("accept-language", "en-US,en;q=0.9")
            .with("cache-control", "no-cache")
            .with("upgrade-insecure-requests", "1")
    }

    /// Convert to a reqwest header map, skipping entries that are not valid
    /// HTTP header names or values.
    pub fn to_header_map(&self) -> HeaderMap {
        let mut map = HeaderMap::with_capacity(self.0.len());
        for (name, value) in &self.0 {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    map.insert(name, value);
                }
                _ => tracing::debug!(header = %name, "Skipping invalid header"),
            }
        }
        map
    }
}

impl FromIterator<(String, String)> for HeaderSet {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut set = HeaderSet::new();
        for (name, value) in iter {
            set.insert(&name, &value);
        }
        set
    }
}

/// Errors from a header source. Never escape a fetch; the fetcher falls back.
#[derive(Debug, Error)]
pub enum HeaderSourceError {
    #[error("Header service request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Header service returned HTTP {0}")]
    Status(u16),

    #[error("Header service returned no header sets")]
    Empty,
}

/// Supplies the headers for a given attempt (1-based).
#[async_trait]
pub trait HeaderSource: Send + Sync {
    async fn headers_for(&self, attempt: u32) -> Result<HeaderSet, HeaderSourceError>;
}

/// Rotates through a fixed pool of browser profiles.
#[derive(Debug)]
pub struct StaticHeaders {
    profiles: Vec<HeaderSet>,
    counter: AtomicUsize,
}

impl StaticHeaders {
    /// Pool of profiles built from [`BROWSER_USER_AGENTS`], starting at a
    /// random position.
    pub fn browser_pool() -> Self {
        let profiles = BROWSER_USER_AGENTS
            .iter()
            .map(|ua| HeaderSet::browser(ua))
            .collect::<Vec<_>>();
        let start = fastrand::usize(..profiles.len());
        Self {
            profiles,
            counter: AtomicUsize::new(start),
        }
    }

    /// Always the same headers.
    pub fn fixed(headers: HeaderSet) -> Self {
        Self {
            profiles: vec![headers],
            counter: AtomicUsize::new(0),
        }
    }

    /// Next profile in rotation.
    pub fn next_profile(&self) -> HeaderSet {
        if self.profiles.is_empty() {
            return HeaderSet::browser(BROWSER_USER_AGENTS[0]);
        }
        let index = self.counter.fetch_add(1, Ordering::Relaxed) % self.profiles.len();
        self.profiles[index].clone()
    }
}

#[async_trait]
impl HeaderSource for StaticHeaders {
    async fn headers_for(&self, _attempt: u32) -> Result<HeaderSet, HeaderSourceError> {
        Ok(self.next_profile())
    }
}

#[derive(Debug, Deserialize)]
struct HeaderServiceResponse {
    #[serde(default)]
    result: Vec<BTreeMap<String, String>>,
}

/// Header-rotation service client.
///
/// `GET <endpoint>?api_key=<key>&num_results=<n>`, answering
/// `{"result": [{header: value}, ...]}`. The first set is used.
pub struct RotatingHeaderService {
    client: Client,
    endpoint: String,
    api_key: SecretString,
    num_results: u32,
}

impl RotatingHeaderService {
    pub fn new(client: Client, endpoint: impl Into<String>, api_key: SecretString, num_results: u32) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key,
            num_results: num_results.max(1),
        }
    }
}

#[async_trait]
impl HeaderSource for RotatingHeaderService {
    async fn headers_for(&self, attempt: u32) -> Result<HeaderSet, HeaderSourceError> {
        let num_results = self.num_results.to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("api_key", self.api_key.expose_secret().as_str()),
                ("num_results", num_results.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(HeaderSourceError::Status(status.as_u16()));
        }

        let body: HeaderServiceResponse = response.json().await?;
        let first = body.result.into_iter().next().ok_or(HeaderSourceError::Empty)?;
        let headers: HeaderSet = first.into_iter().collect();
        if headers.is_empty() {
            return Err(HeaderSourceError::Empty);
        }

        tracing::debug!(
            attempt,
            user_agent = headers.user_agent().unwrap_or("-"),
            "Fetched rotated header set"
        );
        Ok(headers)
    }
}

impl std::fmt::Debug for RotatingHeaderService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RotatingHeaderService")
            .field("endpoint", &self.endpoint)
            .field("num_results", &self.num_results)
            .finish()
    }
}
