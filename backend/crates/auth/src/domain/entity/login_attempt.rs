//! Login Attempt Counter Entity
//!
//! Failure tracking per (account, origin bucket). One row per pair; the
//! counter resets when the window rolls over, the streak survives to
//! drive backoff.

use kernel::id::AccountId;
use platform::rate_limit::{LockoutConfig, LockoutStatus};

/// Windowed failure counter with lockout state
#[derive(Debug, Clone)]
pub struct LoginAttempt {
    pub account_id: AccountId,
    pub origin_bucket: String,
    /// Failures inside the current window
    pub failure_count: u32,
    /// Window anchor (epoch ms)
    pub window_start_ms: i64,
    /// Active lockout end, if any (epoch ms)
    pub locked_until_ms: Option<i64>,
    /// Consecutive lockouts served; drives exponential backoff
    pub lockout_streak: u32,
}

impl LoginAttempt {
    /// Lockout status as of `now_ms`
    pub fn status(&self, now_ms: i64) -> LockoutStatus {
        match self.locked_until_ms {
            Some(until) if until > now_ms => LockoutStatus::Locked { until_ms: until },
            _ => LockoutStatus::Clear,
        }
    }

    /// Whether the counting window has rolled over
    pub fn window_expired(&self, now_ms: i64, config: &LockoutConfig) -> bool {
        now_ms - self.window_start_ms >= config.window_ms()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel::id::Id;

    fn attempt(locked_until_ms: Option<i64>) -> LoginAttempt {
        LoginAttempt {
            account_id: Id::new(),
            origin_bucket: "203.0.113.0/24".to_string(),
            failure_count: 3,
            window_start_ms: 1_000,
            locked_until_ms,
            lockout_streak: 0,
        }
    }

    #[test]
    fn test_status_clear_without_lock() {
        assert_eq!(attempt(None).status(5_000), LockoutStatus::Clear);
    }

    #[test]
    fn test_status_locked_until_future() {
        let a = attempt(Some(10_000));
        assert_eq!(a.status(5_000), LockoutStatus::Locked { until_ms: 10_000 });
        // Lock in the past no longer applies
        assert_eq!(a.status(10_001), LockoutStatus::Clear);
    }

    #[test]
    fn test_window_expired() {
        let config = LockoutConfig::default();
        let a = attempt(None);
        assert!(!a.window_expired(1_000 + config.window_ms() - 1, &config));
        assert!(a.window_expired(1_000 + config.window_ms(), &config));
    }
}
