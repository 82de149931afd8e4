//! Product price sync subsystem.
//!
//! # Data Flow
//! ```text
//! every interval (job.rs):
//!     → for each watched product (bounded concurrency):
//!         fetch page → extract price
//!         no price?  → skipped, nothing pushed
//!         price      → dashboard.rs POST {name, price} (201 = stored, retried with backoff)
//!     → SyncReport
//! ```

pub mod dashboard;
pub mod job;

pub use dashboard::{DashboardClient, ProductUpdate, SyncError};
pub use job::{ProductOutcome, ProductSync, SyncReport};
