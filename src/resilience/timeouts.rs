//! Timeout enforcement for outbound HTTP.
//!
//! Every outbound call goes through a client built here, so no request can
//! wait without a deadline.

use std::time::Duration;

use reqwest::Client;

/// Connect and total-request deadlines for one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub connect: Duration,
    pub request: Duration,
}

impl Timeouts {
    pub fn from_secs(connect_secs: u64, request_secs: u64) -> Self {
        Self {
            connect: Duration::from_secs(connect_secs),
            request: Duration::from_secs(request_secs),
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::from_secs(5, 15)
    }
}

/// Build a reqwest client that enforces `timeouts` on every request.
pub fn bounded_client(timeouts: Timeouts) -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(timeouts.connect.min(timeouts.request))
        .timeout(timeouts.request)
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
}
