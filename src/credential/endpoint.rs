//! OAuth refresh-token grant exchange.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};

use crate::config::CredentialConfig;
use crate::credential::types::{CredentialError, CredentialResult, TokenGrant};
use crate::resilience::{bounded_client, Timeouts};

/// Source of fresh access tokens.
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    /// Perform one refresh-token exchange. Never retried internally.
    async fn exchange(&self) -> CredentialResult<TokenGrant>;
}

/// Provider token endpoint reached over HTTP.
pub struct OAuthTokenEndpoint {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: SecretString,
    refresh_token: SecretString,
    scope: String,
}

impl OAuthTokenEndpoint {
    pub fn new(
        client: Client,
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: SecretString,
        refresh_token: SecretString,
        scopes: &[String],
    ) -> Self {
        Self {
            client,
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret,
            refresh_token,
            scope: scopes.join(" "),
        }
    }

    /// Build from configuration, taking ownership of the secrets.
    pub fn from_config(config: CredentialConfig) -> CredentialResult<Self> {
        let timeouts = Timeouts::from_secs(config.request_timeout_secs, config.request_timeout_secs);
        let client = bounded_client(timeouts)
            .map_err(|e| CredentialError::InvalidConfig(format!("HTTP client: {}", e)))?;

        Ok(Self::new(
            client,
            config.token_url,
            config.client_id,
            config.client_secret,
            config.refresh_token,
            &config.scopes,
        ))
    }
}

#[async_trait]
impl TokenEndpoint for OAuthTokenEndpoint {
    async fn exchange(&self) -> CredentialResult<TokenGrant> {
        let mut form = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", self.refresh_token.expose_secret().as_str()),
        ];
        if !self.scope.is_empty() {
            form.push(("scope", self.scope.as_str()));
        }

        let response = self
            .client
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(self.client_secret.expose_secret()))
            .form(&form)
            .send()
            .await
            .map_err(|e| CredentialError::RefreshFailed {
                reason: if e.is_timeout() {
                    "token endpoint timed out".to_string()
                } else {
                    format!("token endpoint unreachable: {}", e)
                },
                status: None,
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| CredentialError::RefreshFailed {
            reason: format!("failed to read token response: {}", e),
            status: Some(status.as_u16()),
        })?;

        if status != StatusCode::OK {
            return Err(CredentialError::RefreshRejected {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str::<TokenGrant>(&body).map_err(|e| CredentialError::RefreshFailed {
            reason: format!("invalid token response: {}", e),
            status: Some(status.as_u16()),
        })
    }
}

impl std::fmt::Debug for OAuthTokenEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthTokenEndpoint")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("scope", &self.scope)
            .finish()
    }
}
