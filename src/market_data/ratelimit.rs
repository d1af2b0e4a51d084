use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Rolling-window request counter, one per configured quote source. Uses `parking_lot::Mutex`
/// over `std::sync::Mutex` for small, frequently-locked shared state, matching the provider's
/// own cache.
///
/// A sliding window rather than a fixed bucket is used so that a burst at the boundary of two
/// buckets cannot double the effective rate, per §4.2.
pub struct RollingWindowLimiter {
    window: Duration,
    max_requests: usize,
    timestamps: Mutex<VecDeque<Instant>>,
}

impl RollingWindowLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            window,
            max_requests,
            timestamps: Mutex::new(VecDeque::with_capacity(max_requests)),
        }
    }

    fn evict_stale(&self, timestamps: &mut VecDeque<Instant>, now: Instant) {
        while let Some(&front) = timestamps.front() {
            if now.duration_since(front) > self.window {
                timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    /// Returns `Ok(())` and records the request if under the limit, or `Err(retry_after)` with
    /// the duration until the oldest in-window request expires.
    pub fn try_acquire(&self) -> Result<(), Duration> {
        let now = Instant::now();
        let mut timestamps = self.timestamps.lock();
        self.evict_stale(&mut timestamps, now);

        if timestamps.len() >= self.max_requests {
            let oldest = *timestamps.front().expect("len >= max_requests > 0 implies non-empty");
            return Err(self.window - now.duration_since(oldest));
        }

        timestamps.push_back(now);
        Ok(())
    }

    /// Requests currently counted within the window, without mutating state.
    pub fn current_count(&self) -> usize {
        let now = Instant::now();
        let mut timestamps = self.timestamps.lock();
        self.evict_stale(&mut timestamps, now);
        timestamps.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_requests_under_the_limit() {
        let limiter = RollingWindowLimiter::new(3, Duration::from_secs(60));
        assert!(limiter.try_acquire().is_ok());
        assert!(limiter.try_acquire().is_ok());
        assert!(limiter.try_acquire().is_ok());
    }

    #[test]
    fn rejects_requests_over_the_limit() {
        let limiter = RollingWindowLimiter::new(2, Duration::from_secs(60));
        assert!(limiter.try_acquire().is_ok());
        assert!(limiter.try_acquire().is_ok());
        assert!(limiter.try_acquire().is_err());
    }

    #[test]
    fn current_count_reflects_in_window_requests() {
        let limiter = RollingWindowLimiter::new(5, Duration::from_secs(60));
        limiter.try_acquire().unwrap();
        limiter.try_acquire().unwrap();
        assert_eq!(limiter.current_count(), 2);
    }
}
