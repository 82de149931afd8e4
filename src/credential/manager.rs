//! Access-token lifecycle.
//!
//! # Responsibilities
//! - Hand out a token that stays valid for at least the safety margin
//! - Serialize refreshes so at most one exchange is in flight
//! - Let concurrent callers share the outcome of that one exchange
//! - Force a refresh after a 401, within the forced-refresh budget

use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::Duration;
use tokio::sync::Mutex;

use crate::config::validation::MAX_DURATION_SECS;
use crate::config::CredentialConfig;
use crate::credential::clock::{Clock, SystemClock};
use crate::credential::endpoint::{OAuthTokenEndpoint, TokenEndpoint};
use crate::credential::types::{
    CredentialError, CredentialResult, CredentialState, CredentialStatus, Token, TokenGrant,
};
use crate::observability::metrics;
use crate::resilience::WindowBudget;

/// Tunables for expiry and forced refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    /// A token this close to expiry is refreshed before use.
    pub safety_margin: Duration,
    /// Window of the forced-refresh budget.
    pub forced_window: Duration,
    /// Forced refreshes allowed per window.
    pub max_forced: u32,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            safety_margin: Duration::seconds(60),
            forced_window: Duration::seconds(60),
            max_forced: 3,
        }
    }
}

impl RefreshPolicy {
    pub fn from_config(config: &CredentialConfig) -> Self {
        Self {
            safety_margin: bounded_seconds(config.safety_margin_secs),
            forced_window: bounded_seconds(config.forced_refresh_window_secs),
            max_forced: config.max_forced_refreshes,
        }
    }
}

fn bounded_seconds(secs: u64) -> Duration {
    Duration::seconds(secs.min(MAX_DURATION_SECS) as i64)
}

/// Owner of one OAuth credential.
///
/// Share it behind an `Arc`; every method takes `&self`.
pub struct CredentialManager {
    endpoint: Arc<dyn TokenEndpoint>,
    clock: Arc<dyn Clock>,
    policy: RefreshPolicy,
    state: ArcSwap<CredentialState>,
    refresh_lock: Mutex<()>,
    forced_budget: WindowBudget,
}

impl CredentialManager {
    /// Create a manager around any token endpoint and clock.
    pub fn new(endpoint: Arc<dyn TokenEndpoint>, clock: Arc<dyn Clock>, policy: RefreshPolicy) -> Self {
        Self {
            endpoint,
            clock,
            policy,
            state: ArcSwap::from_pointee(CredentialState::default()),
            refresh_lock: Mutex::new(()),
            forced_budget: WindowBudget::new(policy.forced_window, policy.max_forced as usize),
        }
    }

    /// Create a manager talking to the configured provider on the system clock.
    pub fn from_config(config: CredentialConfig) -> CredentialResult<Self> {
        let policy = RefreshPolicy::from_config(&config);
        let endpoint = OAuthTokenEndpoint::from_config(config)?;
        Ok(Self::new(Arc::new(endpoint), Arc::new(SystemClock), policy))
    }

    /// Return a token valid for at least the safety margin.
    ///
    /// The fast path is a lock-free read. When the token is stale the caller
    /// joins the refresh already in flight, or starts one.
    pub async fn get_valid_token(&self) -> CredentialResult<Token> {
        let snapshot = self.state.load();
        if let Some(token) = snapshot.usable_token(self.clock.now(), self.policy.safety_margin) {
            return Ok(token);
        }
        let observed = snapshot.generation;
        drop(snapshot);

        let _guard = self.refresh_lock.lock().await;

        // A refresh completed while we waited: share its outcome.
        let current = self.state.load_full();
        if current.generation != observed {
            if let Some(token) = current.usable_token(self.clock.now(), self.policy.safety_margin) {
                return Ok(token);
            }
            if let Some(err) = &current.last_error {
                return Err(err.clone().into_refresh_failed());
            }
            // Fresh from that refresh, even if the grant is shorter than the margin.
            if let Some(token) = &current.token {
                return Ok(token.clone());
            }
        }

        self.refresh_locked("on_demand")
            .await
            .map_err(CredentialError::into_refresh_failed)
    }

    /// Exchange the refresh token for a new access token now.
    ///
    /// Waits for any refresh already in flight, then performs its own.
    pub async fn refresh(&self) -> CredentialResult<Token> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked("scheduled").await
    }

    /// Force one refresh after the protected API answered 401.
    ///
    /// Ignores the cached expiry. Returns `Throttled` without contacting the
    /// provider once the forced-refresh budget for the window is spent.
    pub async fn on_unauthorized(&self) -> CredentialResult<Token> {
        if let Err(wait) = self.forced_budget.try_acquire(self.clock.now()) {
            let retry_after = wait.to_std().unwrap_or_default();
            tracing::warn!(retry_after = ?retry_after, "Forced token refresh throttled");
            metrics::record_token_refresh("unauthorized", "throttled");
            return Err(CredentialError::Throttled { retry_after });
        }

        tracing::info!("Protected API returned 401, forcing token refresh");
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked("unauthorized").await
    }

    /// Current lifecycle state.
    pub fn status(&self) -> CredentialStatus {
        self.state
            .load()
            .status(self.clock.now(), self.policy.safety_margin)
    }

    /// Cached token without any freshness check.
    pub fn current_token(&self) -> Option<Token> {
        self.state.load().token.clone()
    }

    pub fn policy(&self) -> RefreshPolicy {
        self.policy
    }

    /// Perform the exchange. Caller must hold `refresh_lock`.
    async fn refresh_locked(&self, trigger: &'static str) -> CredentialResult<Token> {
        let outcome = self
            .endpoint
            .exchange()
            .await
            .and_then(|grant| self.token_from_grant(grant));

        match outcome {
            Ok(token) => {
                let expires_at = token.expires_at();
                let next = self.state.load().refreshed(token.clone());
                self.state.store(Arc::new(next));

                metrics::record_token_refresh(trigger, "success");
                tracing::info!(
                    trigger,
                    token = %token.masked(),
                    expires_at = %expires_at,
                    "Access token refreshed"
                );
                Ok(token)
            }
            Err(e) => {
                let next = self.state.load().failed(e.clone());
                self.state.store(Arc::new(next));

                metrics::record_token_refresh(trigger, "failure");
                tracing::warn!(trigger, error = %e, "Access token refresh failed");
                Err(e)
            }
        }
    }
}

impl CredentialManager {
    /// `expires_at = now + expires_in`; a lifetime that overflows the
    /// calendar is a failed refresh.
    fn token_from_grant(&self, grant: TokenGrant) -> CredentialResult<Token> {
        let expires_at = Duration::try_seconds(grant.expires_in.max(0))
            .and_then(|lifetime| self.clock.now().checked_add_signed(lifetime))
            .ok_or_else(|| CredentialError::RefreshFailed {
                reason: format!("invalid expires_in: {}", grant.expires_in),
                status: None,
            })?;
        Ok(Token::new(grant.access_token, expires_at))
    }
}

impl std::fmt::Debug for CredentialManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialManager")
            .field("status", &self.status())
            .field("policy", &self.policy)
            .finish()
    }
}
