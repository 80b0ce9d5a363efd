//! In-memory rate limiting for cursor updates.
//!
//! DESIGN
//! ======
//! Sliding-window counters backed by `HashMap<SessionId, VecDeque<Instant>>`,
//! one window per session. The limiter lives inside the canvas state and is
//! only touched under its write lock, so it needs no lock of its own.
//!
//! Presence is advisory: an update over the limit is simply not applied and
//! not broadcast. The next update that fits the window carries the latest
//! position anyway.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use crate::canvas::op::SessionId;
use crate::config::CursorRateLimit;

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RateLimitError {
    #[error("cursor rate limit exceeded (max {limit} updates/{window_ms}ms)")]
    CursorExceeded { limit: usize, window_ms: u128 },
}

// =============================================================================
// RATE LIMITER
// =============================================================================

#[derive(Debug)]
pub struct CursorRateLimiter {
    config: CursorRateLimit,
    /// Per-session update timestamps.
    sessions: HashMap<SessionId, VecDeque<Instant>>,
}

impl CursorRateLimiter {
    #[must_use]
    pub fn new(config: CursorRateLimit) -> Self {
        Self { config, sessions: HashMap::new() }
    }

    /// Check the session's window, then record the update.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError::CursorExceeded`] if the session already used
    /// its budget for the current window. Nothing is recorded in that case.
    pub fn check_and_record(&mut self, session_id: SessionId) -> Result<(), RateLimitError> {
        self.check_and_record_at(session_id, Instant::now())
    }

    /// Check + record with explicit timestamp (for testing).
    pub(crate) fn check_and_record_at(&mut self, session_id: SessionId, now: Instant) -> Result<(), RateLimitError> {
        let cfg = self.config;
        let deque = self.sessions.entry(session_id).or_default();
        prune_window(deque, now, cfg.window);
        if deque.len() >= cfg.limit {
            return Err(RateLimitError::CursorExceeded { limit: cfg.limit, window_ms: cfg.window.as_millis() });
        }
        deque.push_back(now);
        Ok(())
    }

    /// Drop the window of a session that disconnected.
    pub fn forget(&mut self, session_id: SessionId) {
        self.sessions.remove(&session_id);
    }

    #[must_use]
    pub fn tracked_sessions(&self) -> usize {
        self.sessions.len()
    }
}

impl Default for CursorRateLimiter {
    fn default() -> Self {
        Self::new(CursorRateLimit::default())
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn prune_window(deque: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&front) = deque.front() {
        if now.duration_since(front) >= window {
            deque.pop_front();
        } else {
            break;
        }
    }
}

#[cfg(test)]
#[path = "rate_limit_test.rs"]
mod tests;
