//! Resilient page fetch subsystem.
//!
//! # Data Flow
//! ```text
//! fetch(url):
//!     → parse URL (invalid → fail fast)
//!     → per attempt:
//!         headers.rs  header set (service, or built-in profile on failure)
//!         proxy.rs    optional forwarding wrap
//!         GET with bounded timeout
//!         classify.rs status + challenge markers
//!     → usable: return body + attempt history
//!     → otherwise: fixed backoff, next attempt (none after the last)
//!     → exhausted: ExhaustedRetries with full history
//! ```

pub mod classify;
pub mod fetcher;
pub mod headers;
pub mod proxy;

pub use classify::{classify, Verdict};
pub use fetcher::{AttemptOutcome, FetchAttempt, FetchError, FetchResult, ResilientFetcher};
pub use headers::{HeaderSet, HeaderSource, HeaderSourceError, RotatingHeaderService, StaticHeaders};
pub use proxy::ForwardingProxy;
