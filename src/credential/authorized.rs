//! Calls to the protected marketplace API.
//!
//! Attaches the bearer token and recovers from exactly one 401 by forcing a
//! refresh and replaying the request once.

use std::sync::Arc;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use thiserror::Error;

use crate::credential::manager::CredentialManager;
use crate::credential::types::{CredentialError, Token};

/// Errors from an authorized call.
#[derive(Debug, Error)]
pub enum AuthorizedError {
    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered 401 again after the forced refresh.
    #[error("Protected API still unauthorized after token refresh")]
    StillUnauthorized,
}

/// HTTP client bound to one credential.
#[derive(Clone)]
pub struct AuthorizedClient {
    client: Client,
    credentials: Arc<CredentialManager>,
}

impl AuthorizedClient {
    pub fn new(client: Client, credentials: Arc<CredentialManager>) -> Self {
        Self {
            client,
            credentials,
        }
    }

    /// Send a request built by `build`, authorized with the current token.
    ///
    /// `build` may be called twice (original and replay), so it must be
    /// side-effect free.
    pub async fn send<F>(&self, build: F) -> Result<Response, AuthorizedError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let token = self.credentials.get_valid_token().await?;
        let response = self.dispatch(&build, &token).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let token = self.credentials.on_unauthorized().await?;
        let response = self.dispatch(&build, &token).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::error!("Protected API rejected a freshly refreshed token");
            return Err(AuthorizedError::StillUnauthorized);
        }
        Ok(response)
    }

    /// GET `url` with bearer auth.
    pub async fn get(&self, url: &str) -> Result<Response, AuthorizedError> {
        self.send(|client| client.get(url)).await
    }

    async fn dispatch<F>(&self, build: &F, token: &Token) -> Result<Response, reqwest::Error>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        build(&self.client).bearer_auth(token.secret()).send().await
    }
}
