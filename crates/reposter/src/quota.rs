//! Daily publish quota.

use chrono::{DateTime, Duration, Utc};

/// Default number of posts allowed per quota window.
pub const DEFAULT_DAILY_CAP: u32 = 10;

/// Length of the quota window in seconds.
pub const QUOTA_WINDOW_SECS: i64 = 86_400;

/// Posts made in the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaState {
    pub posts_today: u32,
    pub window_start: DateTime<Utc>,
}

impl QuotaState {
    /// Fresh window starting at `now`.
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            posts_today: 0,
            window_start: now,
        }
    }
}

/// Caps publishes per rolling 24h window.
#[derive(Debug, Clone, Copy)]
pub struct RateLimiter {
    cap: u32,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_DAILY_CAP)
    }
}

impl RateLimiter {
    #[must_use]
    pub fn new(cap: u32) -> Self {
        Self { cap }
    }

    pub fn cap(&self) -> u32 {
        self.cap
    }

    /// Start a new window if the current one is older than 24h.
    ///
    /// Returns true when the window was reset.
    pub fn maybe_reset(&self, state: &mut QuotaState, now: DateTime<Utc>) -> bool {
        if now - state.window_start > Duration::seconds(QUOTA_WINDOW_SECS) {
            tracing::debug!(
                posts = state.posts_today,
                window_start = %state.window_start,
                "Quota window expired, resetting"
            );
            *state = QuotaState::new(now);
            true
        } else {
            false
        }
    }

    /// Whether the cap has been reached for the (possibly reset) window.
    pub fn should_skip(&self, state: &mut QuotaState, now: DateTime<Utc>) -> bool {
        self.maybe_reset(state, now);
        state.posts_today >= self.cap
    }

    /// Count one successful publish.
    pub fn record_post(&self, state: &mut QuotaState) {
        state.posts_today = state.posts_today.saturating_add(1);
    }

    /// Posts left in the current window.
    pub fn remaining(&self, state: &QuotaState) -> u32 {
        self.cap.saturating_sub(state.posts_today)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_under_cap_does_not_skip() {
        let limiter = RateLimiter::new(10);
        let now = Utc::now();
        let mut state = QuotaState {
            posts_today: 9,
            window_start: now,
        };
        assert!(!limiter.should_skip(&mut state, now));
    }

    #[test]
    fn test_at_cap_skips() {
        let limiter = RateLimiter::new(10);
        let now = Utc::now();
        let mut state = QuotaState {
            posts_today: 10,
            window_start: now - Duration::hours(3),
        };
        assert!(limiter.should_skip(&mut state, now));
        assert_eq!(state.posts_today, 10);
    }

    #[test]
    fn test_expired_window_resets_before_cap_check() {
        let limiter = RateLimiter::new(10);
        let now = Utc::now();
        let mut state = QuotaState {
            posts_today: 10,
            window_start: now - Duration::seconds(QUOTA_WINDOW_SECS) - Duration::seconds(1),
        };

        assert!(!limiter.should_skip(&mut state, now));
        assert_eq!(state.posts_today, 0);
        assert_eq!(state.window_start, now);
    }

    #[test]
    fn test_exactly_one_window_does_not_reset() {
        let limiter = RateLimiter::new(10);
        let now = Utc::now();
        let mut state = QuotaState {
            posts_today: 4,
            window_start: now - Duration::seconds(QUOTA_WINDOW_SECS),
        };

        assert!(!limiter.maybe_reset(&mut state, now));
        assert_eq!(state.posts_today, 4);
    }

    #[test]
    fn test_cap_never_exceeded_within_window() {
        let limiter = RateLimiter::new(3);
        let start = Utc::now();
        let mut state = QuotaState::new(start);
        let mut published = 0;

        for minute in 0..60 {
            let now = start + Duration::minutes(minute);
            if limiter.should_skip(&mut state, now) {
                continue;
            }
            limiter.record_post(&mut state);
            published += 1;
            assert!(state.posts_today <= limiter.cap());
        }

        assert_eq!(published, 3);
        assert_eq!(limiter.remaining(&state), 0);
    }
}
