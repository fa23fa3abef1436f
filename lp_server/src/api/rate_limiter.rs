//! Rate limiter for inbound WebSocket frames.
//!
//! Limits how many frames a client can send within a time window, using a
//! sliding window over recent timestamps.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct RateLimiter {
    timestamps: VecDeque<Instant>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: VecDeque::with_capacity(max_requests),
            max_requests,
            window,
        }
    }

    /// Burst protection: 10 frames per second.
    pub fn burst() -> Self {
        Self::new(10, Duration::from_secs(1))
    }

    /// Sustained protection: 100 frames per minute.
    pub fn sustained() -> Self {
        Self::new(100, Duration::from_secs(60))
    }

    /// Record a request; returns false when the limit is exceeded.
    pub fn check(&mut self) -> bool {
        let now = Instant::now();
        while let Some(ts) = self.timestamps.front() {
            if now.duration_since(*ts) > self.window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
        if self.timestamps.len() >= self.max_requests {
            return false;
        }
        self.timestamps.push_back(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_the_limit() {
        let mut limiter = RateLimiter::new(5, Duration::from_secs(1));
        for _ in 0..5 {
            assert!(limiter.check());
        }
        assert!(!limiter.check());
    }

    #[test]
    fn window_expiry_frees_slots() {
        let mut limiter = RateLimiter::new(2, Duration::from_millis(0));
        assert!(limiter.check());
        std::thread::sleep(Duration::from_millis(5));
        assert!(limiter.check());
        std::thread::sleep(Duration::from_millis(5));
        assert!(limiter.check());
    }
}
