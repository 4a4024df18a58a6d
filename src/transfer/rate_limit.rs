//! Sliding-window request limiter, one per platform adapter.
//!
//! Callers await [`RateLimiter::wait_for_slot`] before each outbound request.
//! Requests are only ever delayed, never rejected.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Allows at most `max_requests` slot grants in any `window`.
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    granted: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Limiter over a one-second window.
    pub fn per_second(max_requests: u32) -> Self {
        Self::new(max_requests, Duration::from_secs(1))
    }

    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            // A zero budget would block forever
            max_requests: max_requests.max(1) as usize,
            window,
            granted: Mutex::new(VecDeque::new()),
        }
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    /// Suspend until the window has capacity, then claim a slot.
    pub async fn wait_for_slot(&self) {
        loop {
            let wait = {
                let mut granted = self.granted.lock().await;
                let now = Instant::now();
                while let Some(&oldest) = granted.front() {
                    if now.duration_since(oldest) >= self.window {
                        granted.pop_front();
                    } else {
                        break;
                    }
                }

                if granted.len() < self.max_requests {
                    granted.push_back(now);
                    return;
                }

                match granted.front() {
                    Some(&oldest) => self.window.saturating_sub(now.duration_since(oldest)),
                    None => Duration::ZERO,
                }
            };

            tracing::debug!("Rate limiting: waiting {:?}", wait);
            tokio::time::sleep(wait).await;
        }
    }
}
