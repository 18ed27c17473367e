//! Rolling-window rate limiting for outbound provider requests.
//!
//! Each provider owns exactly one [`RateLimiter`]. The limiter keeps the start
//! times of recent requests and admits a new request only while fewer than
//! `max_requests` of them fall inside the trailing window.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

/// A request budget: at most `max_requests` per `window_ms` milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    /// Requests allowed inside one window.
    pub max_requests: u32,
    /// Window length in milliseconds.
    pub window_ms: u64,
}

impl RateLimit {
    /// Create a new budget.
    pub const fn new(max_requests: u32, window_ms: u64) -> Self {
        Self {
            max_requests,
            window_ms,
        }
    }

    /// Window length as a [`Duration`].
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

impl std::str::FromStr for RateLimit {
    type Err = String;

    /// Parse `"<max_requests>/<window_ms>"`, e.g. `"40/10000"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (max, window) = s
            .split_once('/')
            .ok_or_else(|| format!("Invalid rate limit (expected max/window_ms): {}", s))?;
        let max_requests = max
            .trim()
            .parse::<u32>()
            .map_err(|_| format!("Invalid rate limit request count: {}", s))?;
        let window_ms = window
            .trim()
            .parse::<u64>()
            .map_err(|_| format!("Invalid rate limit window: {}", s))?;
        if max_requests == 0 || window_ms == 0 {
            return Err(format!("Rate limit must be non-zero: {}", s));
        }
        Ok(Self::new(max_requests, window_ms))
    }
}

/// Rolling-window limiter shared by every request to one provider.
///
/// The timestamp sequence is only touched while the internal lock is held and
/// the lock is never held across an await point, so a waiter that is cancelled
/// mid-sleep leaves no trace behind.
pub struct RateLimiter {
    provider: String,
    max_requests: usize,
    window: Duration,
    timestamps: Mutex<VecDeque<Instant>>,
    throttled: AtomicU64,
}

impl RateLimiter {
    /// Create a limiter for `provider` enforcing `limit`.
    ///
    /// A zero request count is treated as one so that waiting always ends.
    pub fn new(provider: impl Into<String>, limit: RateLimit) -> Self {
        let max_requests = limit.max_requests.max(1) as usize;
        Self {
            provider: provider.into(),
            max_requests,
            window: limit.window(),
            timestamps: Mutex::new(VecDeque::with_capacity(max_requests)),
            throttled: AtomicU64::new(0),
        }
    }

    /// Suspend until another request fits in the budget, then claim a slot.
    pub async fn wait_if_needed(&self) {
        loop {
            let delay = {
                let mut timestamps = self.timestamps.lock();
                let now = Instant::now();

                while let Some(oldest) = timestamps.front() {
                    if now.duration_since(*oldest) >= self.window {
                        timestamps.pop_front();
                    } else {
                        break;
                    }
                }

                if timestamps.len() < self.max_requests {
                    timestamps.push_back(now);
                    return;
                }

                match timestamps.front() {
                    Some(oldest) => (*oldest + self.window).saturating_duration_since(now),
                    None => Duration::ZERO,
                }
            };

            debug!(
                provider = %self.provider,
                delay_ms = delay.as_millis() as u64,
                "Rate limit reached, waiting"
            );
            sleep(delay).await;
        }
    }

    /// Record that the provider answered HTTP 429.
    ///
    /// The window math is unchanged; the counter only surfaces a budget that
    /// is set higher than the provider actually allows.
    pub fn record_throttle(&self) {
        let count = self.throttled.fetch_add(1, Ordering::Relaxed) + 1;
        warn!(
            provider = %self.provider,
            max_requests = self.max_requests,
            window_ms = self.window.as_millis() as u64,
            throttled = count,
            "Provider throttled a request; configured rate limit may be too high"
        );
    }

    /// Number of HTTP 429 responses recorded so far.
    pub fn throttle_count(&self) -> u64 {
        self.throttled.load(Ordering::Relaxed)
    }

    /// Requests currently counted against the window.
    pub fn in_flight_window(&self) -> usize {
        let now = Instant::now();
        self.timestamps
            .lock()
            .iter()
            .filter(|t| now.duration_since(**t) < self.window)
            .count()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("provider", &self.provider)
            .field("max_requests", &self.max_requests)
            .field("window", &self.window)
            .finish()
    }
}
