//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! .env (dotenvy, loaded by the binaries)
//! dropship.toml
//!     → loader.rs (parse & deserialize, apply env overrides)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → handed to lifecycle::startup to build services
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Secrets are `SecretString` and never printed

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::AppConfig;
pub use schema::CredentialConfig;
pub use schema::ExtractConfig;
pub use schema::FetchConfig;
pub use schema::ObservabilityConfig;
pub use schema::PriceRuleConfig;
pub use schema::SyncConfig;
pub use schema::WatchedProduct;
