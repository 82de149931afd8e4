//! Credential lifecycle subsystem.
//!
//! # Data Flow
//! ```text
//! Caller needs a token:
//!     → manager.rs get_valid_token()
//!         fresh?  → cached Token (lock-free ArcSwap read)
//!         stale?  → refresh lock → endpoint.rs exchange() → swap state
//!
//! Background:
//!     renewal.rs ticks every interval → manager.refresh()
//!
//! Protected API call:
//!     authorized.rs → bearer token → 401? → manager.on_unauthorized() → replay once
//! ```
//!
//! # State Machine
//! ```text
//! Uninitialized → Valid → (time passes) → Stale → (refresh ok) → Valid
//!                                          Stale → (refresh fails) → Error
//! Error is retried on the next tick or the next get_valid_token().
//! ```

pub mod authorized;
pub mod clock;
pub mod endpoint;
pub mod manager;
pub mod renewal;
pub mod types;

pub use authorized::{AuthorizedClient, AuthorizedError};
pub use clock::{Clock, ManualClock, SystemClock};
pub use endpoint::{OAuthTokenEndpoint, TokenEndpoint};
pub use manager::{CredentialManager, RefreshPolicy};
pub use renewal::RenewalTask;
pub use types::{CredentialError, CredentialResult, CredentialStatus, Token, TokenGrant};
