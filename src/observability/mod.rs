//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! credential / fetch / extract / sync produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Each fetch carries a `fetch_id` field so its attempts can be correlated
//! - Secrets are masked before they reach a log line

pub mod logging;
pub mod metrics;
