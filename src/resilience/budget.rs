//! Sliding-window budget for forced operations.
//!
//! Caps how often an expensive operation may be forced within a window.
//! Used to stop a provider outage from turning repeated 401s into a
//! refresh storm.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

/// Allows at most `max_events` acquisitions per `window`.
#[derive(Debug)]
pub struct WindowBudget {
    window: Duration,
    max_events: usize,
    events: Mutex<VecDeque<DateTime<Utc>>>,
}

impl WindowBudget {
    pub fn new(window: Duration, max_events: usize) -> Self {
        Self {
            window,
            max_events: max_events.max(1),
            events: Mutex::new(VecDeque::new()),
        }
    }

    /// Try to spend one unit at `now`.
    ///
    /// Returns `Err(wait)` with the time until the oldest event leaves the
    /// window when the budget is exhausted.
    pub fn try_acquire(&self, now: DateTime<Utc>) -> Result<(), Duration> {
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());

        while let Some(oldest) = events.front() {
            if now - *oldest >= self.window {
                events.pop_front();
            } else {
                break;
            }
        }

        if events.len() >= self.max_events {
            let oldest = events.front().copied().unwrap_or(now);
            return Err(oldest + self.window - now);
        }

        events.push_back(now);
        Ok(())
    }

    /// Units remaining at `now`.
    pub fn remaining(&self, now: DateTime<Utc>) -> usize {
        let events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        let live = events.iter().filter(|t| now - **t < self.window).count();
        self.max_events.saturating_sub(live)
    }
}
