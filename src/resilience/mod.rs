//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Outbound call (token exchange, page fetch, dashboard push):
//!     → timeouts.rs (client with connect/request deadline)
//!     → On failure: backoff.rs (fixed or exponential delay before retry)
//!     → budget.rs (cap forced refreshes per window)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Retry counts are small and bounded; callers are usually waiting
//! - Page fetches use a fixed delay, dashboard pushes use jittered exponential

pub mod backoff;
pub mod budget;
pub mod timeouts;

pub use backoff::Backoff;
pub use budget::WindowBudget;
pub use timeouts::{bounded_client, Timeouts};
