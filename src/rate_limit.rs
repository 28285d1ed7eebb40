//! Per-key request rate limiting.
//!
//! Handlers depend on the [`RateLimiter`] capability only. The bundled
//! [`InMemoryRateLimiter`] keeps its windows in process memory, so the cap
//! it enforces is best-effort: it resets on restart and applies per
//! instance, not across a multi-instance deployment.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Outcome of a [`RateLimiter::check`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// The hit was counted and is allowed.
    Allowed {
        /// Hits left in the current window.
        remaining: u32,
    },
    /// The window is exhausted.
    Denied {
        /// Time until the window resets.
        retry_after: Duration,
    },
}

impl RateDecision {
    /// `true` for [`RateDecision::Allowed`].
    #[must_use]
    pub const fn is_allowed(self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

/// Check-and-increment windowed limiter.
#[async_trait]
pub trait RateLimiter: std::fmt::Debug + Send + Sync {
    /// Counts one hit for `key` and reports whether it is allowed.
    async fn check(&self, key: &str) -> RateDecision;
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    reset_at: Instant,
}

/// Fixed-window limiter keyed by caller id.
///
/// The first hit opens a window of `window` length; up to `max_hits` hits
/// are allowed inside it; the first hit after `reset_at` opens a new one.
#[derive(Debug)]
pub struct InMemoryRateLimiter {
    max_hits: u32,
    window: Duration,
    windows: Mutex<HashMap<String, Window>>,
}

impl InMemoryRateLimiter {
    /// Creates a limiter allowing `max_hits` per `window`.
    #[must_use]
    pub fn new(max_hits: u32, window: Duration) -> Self {
        Self {
            max_hits,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Convenience constructor for a one-hour window.
    #[must_use]
    pub fn per_hour(max_hits: u32) -> Self {
        Self::new(max_hits, Duration::from_secs(3600))
    }

    /// Drops windows that have already closed. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        let before = windows.len();
        windows.retain(|_, w| w.reset_at > now);
        before - windows.len()
    }

    /// Number of tracked keys.
    pub async fn tracked_keys(&self) -> usize {
        self.windows.lock().await.len()
    }
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn check(&self, key: &str) -> RateDecision {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;

        match windows.get_mut(key) {
            Some(window) if now < window.reset_at => {
                if window.count >= self.max_hits {
                    return RateDecision::Denied {
                        retry_after: window.reset_at - now,
                    };
                }
                window.count += 1;
                RateDecision::Allowed {
                    remaining: self.max_hits - window.count,
                }
            }
            _ => {
                if self.max_hits == 0 {
                    return RateDecision::Denied {
                        retry_after: self.window,
                    };
                }
                windows.insert(
                    key.to_string(),
                    Window {
                        count: 1,
                        reset_at: now + self.window,
                    },
                );
                RateDecision::Allowed {
                    remaining: self.max_hits - 1,
                }
            }
        }
    }
}
