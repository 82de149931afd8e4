//! Forwarding proxy support.
//!
//! The proxy is an HTTP API, not a CONNECT proxy: the target URL travels as
//! a query parameter and the proxy answers with the target's body.

use secrecy::{ExposeSecret, SecretString};
use url::Url;

/// A GET-based forwarding proxy endpoint.
pub struct ForwardingProxy {
    endpoint: Url,
    api_key: SecretString,
    country: Option<String>,
}

impl ForwardingProxy {
    pub fn new(endpoint: Url, api_key: SecretString, country: Option<String>) -> Self {
        Self {
            endpoint,
            api_key,
            country,
        }
    }

    pub fn parse(endpoint: &str, api_key: SecretString, country: Option<String>) -> Result<Self, url::ParseError> {
        Ok(Self::new(Url::parse(endpoint)?, api_key, country))
    }

    /// URL that fetches `target` through the proxy.
    ///
    /// Contains the API key; never log it.
    pub fn wrap(&self, target: &Url) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            if !self.api_key.expose_secret().is_empty() {
                query.append_pair("api_key", self.api_key.expose_secret());
            }
            query.append_pair("url", target.as_str());
            if let Some(country) = &self.country {
                query.append_pair("country_code", country);
            }
        }
        url
    }
}

impl std::fmt::Debug for ForwardingProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForwardingProxy")
            .field("endpoint", &self.endpoint.as_str())
            .field("country", &self.country)
            .finish()
    }
}
