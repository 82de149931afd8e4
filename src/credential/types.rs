//! Credential types and error definitions.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::observability::logging::mask;

/// A bearer access token and the instant it stops being trusted.
///
/// Cheap to clone; `Debug` never prints the full token.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    value: Arc<str>,
    expires_at: DateTime<Utc>,
}

impl Token {
    pub fn new(value: impl Into<Arc<str>>, expires_at: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            expires_at,
        }
    }

    /// The raw token, for building an `Authorization` header.
    pub fn secret(&self) -> &str {
        &self.value
    }

    /// `Bearer <token>` header value.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.value)
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Masked form suitable for logs and terminals.
    pub fn masked(&self) -> String {
        mask(&self.value)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("value", &self.masked())
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Successful response body of the refresh-token grant.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    /// Lifetime in seconds.
    pub expires_in: i64,
}

/// Observable lifecycle state of a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialStatus {
    /// No refresh has completed yet.
    Uninitialized,
    /// Token is usable for at least the safety margin.
    Valid,
    /// Token exists but is inside the safety margin or expired.
    Stale,
    /// The most recent refresh failed; retried on the next tick or request.
    Error,
}

/// Errors that can occur while keeping a credential valid.
#[derive(Debug, Clone, Error)]
pub enum CredentialError {
    /// The token endpoint answered with a non-200 status.
    #[error("Token endpoint rejected refresh (HTTP {status}): {body}")]
    RefreshRejected { status: u16, body: String },

    /// The refresh could not produce a token (transport, timeout, bad body,
    /// or a rejection seen by a waiting caller).
    #[error("Token refresh failed: {reason}")]
    RefreshFailed { reason: String, status: Option<u16> },

    /// Forced refreshes exceeded their budget.
    #[error("Forced refresh throttled, retry in {retry_after:?}")]
    Throttled { retry_after: Duration },

    /// The credential could not be built from configuration.
    #[error("Invalid credential configuration: {0}")]
    InvalidConfig(String),
}

impl CredentialError {
    /// Fold a rejection into `RefreshFailed`, keeping the status.
    pub fn into_refresh_failed(self) -> Self {
        match self {
            CredentialError::RefreshRejected { status, body } => CredentialError::RefreshFailed {
                reason: format!("token endpoint rejected refresh: {}", body),
                status: Some(status),
            },
            other => other,
        }
    }

    /// Upstream HTTP status, if one was seen.
    pub fn status(&self) -> Option<u16> {
        match self {
            CredentialError::RefreshRejected { status, .. } => Some(*status),
            CredentialError::RefreshFailed { status, .. } => *status,
            _ => None,
        }
    }
}

/// Result type for credential operations.
pub type CredentialResult<T> = Result<T, CredentialError>;

/// Snapshot of the mutable credential fields, swapped atomically.
#[derive(Debug, Clone, Default)]
pub(crate) struct CredentialState {
    pub token: Option<Token>,
    pub last_error: Option<CredentialError>,
    /// Incremented by every completed refresh attempt, success or failure.
    pub generation: u64,
}

impl CredentialState {
    pub fn refreshed(&self, token: Token) -> Self {
        Self {
            token: Some(token),
            last_error: None,
            generation: self.generation + 1,
        }
    }

    pub fn failed(&self, error: CredentialError) -> Self {
        Self {
            token: self.token.clone(),
            last_error: Some(error),
            generation: self.generation + 1,
        }
    }

    /// The token if `now` is still outside the safety margin.
    pub fn usable_token(&self, now: DateTime<Utc>, margin: chrono::Duration) -> Option<Token> {
        self.token
            .as_ref()
            .filter(|t| now < t.expires_at() - margin)
            .cloned()
    }

    pub fn status(&self, now: DateTime<Utc>, margin: chrono::Duration) -> CredentialStatus {
        if self.last_error.is_some() {
            CredentialStatus::Error
        } else if self.token.is_none() {
            CredentialStatus::Uninitialized
        } else if self.usable_token(now, margin).is_some() {
            CredentialStatus::Valid
        } else {
            CredentialStatus::Stale
        }
    }
}
