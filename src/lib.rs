//! Dropship automation core: marketplace credential lifecycle and resilient
//! product page fetching.

// Core subsystems
pub mod config;
pub mod credential;
pub mod extract;
pub mod fetch;
pub mod sync;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::schema::AppConfig;
pub use credential::{AuthorizedClient, CredentialManager};
pub use extract::FieldExtractor;
pub use fetch::ResilientFetcher;
pub use lifecycle::{Services, Shutdown};
pub use sync::ProductSync;
