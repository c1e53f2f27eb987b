//! Shared request-rate limiter
//!
//! A fixed-window permit counter: at most `max_requests` permits are handed
//! out per `period`, and the counter resets when a new window starts.
//! Callers that find the window exhausted sleep until it rolls over, so
//! under contention requests queue instead of failing.

use std::sync::Mutex;
use tokio::time::{Instant, sleep};
use tracing::debug;

use crate::config::RateLimit;

#[derive(Debug)]
struct Window {
    started: Instant,
    used: u32,
}

/// Process-wide permit counter shared by every request on an engine
#[derive(Debug)]
pub struct RateLimiter {
    limit: RateLimit,
    window: Mutex<Window>,
}

impl RateLimiter {
    pub fn new(limit: RateLimit) -> Self {
        Self {
            limit,
            window: Mutex::new(Window {
                started: Instant::now(),
                used: 0,
            }),
        }
    }

    pub fn limit(&self) -> RateLimit {
        self.limit
    }

    /// Wait until a permit is available, then consume it
    ///
    /// The lock is released before sleeping.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut window = self.window.lock().expect("rate limiter lock poisoned");
                let now = Instant::now();

                if now.duration_since(window.started) >= self.limit.period {
                    window.started = now;
                    window.used = 0;
                }

                if window.used < self.limit.max_requests {
                    window.used += 1;
                    return;
                }

                (window.started + self.limit.period).saturating_duration_since(now)
            };

            debug!("Rate limit reached, waiting {:?} for next window", wait);
            sleep(wait).await;
        }
    }

    /// Permits left in the current window
    pub fn available(&self) -> u32 {
        let window = self.window.lock().expect("rate limiter lock poisoned");
        if Instant::now().duration_since(window.started) >= self.limit.period {
            self.limit.max_requests
        } else {
            self.limit.max_requests - window.used
        }
    }
}
