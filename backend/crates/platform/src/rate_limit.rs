//! Lockout / Rate Limiting Infrastructure
//!
//! Failure-counting lockout primitives for authentication endpoints.
//! Storage lives with the caller; this module defines the policy types
//! and the backoff arithmetic.

use std::time::Duration;

/// Lockout policy for failed authentication attempts
#[derive(Debug, Clone)]
pub struct LockoutConfig {
    /// Failures allowed inside one window before the account locks
    pub max_failures: u32,
    /// Sliding window over which failures are counted
    pub window: Duration,
    /// Base lockout duration, doubled per consecutive lockout
    pub backoff_base: Duration,
    /// Exponent cap for the backoff doubling
    pub max_backoff_exponent: u32,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            max_failures: 5,
            window: Duration::from_secs(15 * 60),
            backoff_base: Duration::from_secs(15 * 60),
            max_backoff_exponent: 6,
        }
    }
}

impl LockoutConfig {
    pub fn window_ms(&self) -> i64 {
        self.window.as_millis() as i64
    }

    /// Lockout duration for the given consecutive-lockout streak
    ///
    /// `base * 2^min(streak, cap)`, so repeat offenders wait longer but
    /// the duration stays bounded.
    pub fn lockout_duration_ms(&self, streak: u32) -> i64 {
        let exponent = streak.min(self.max_backoff_exponent);
        let base_ms = self.backoff_base.as_millis() as i64;
        base_ms.saturating_mul(1i64 << exponent)
    }
}

/// Result of checking whether a key is currently locked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockoutStatus {
    /// Attempts may proceed
    Clear,
    /// Locked until the given epoch-millisecond timestamp
    Locked { until_ms: i64 },
}

impl LockoutStatus {
    /// Remaining lockout time relative to `now_ms`, if locked
    pub fn retry_after(&self, now_ms: i64) -> Option<Duration> {
        match self {
            LockoutStatus::Clear => None,
            LockoutStatus::Locked { until_ms } => {
                let remaining_ms = until_ms.saturating_sub(now_ms).max(0);
                Some(Duration::from_millis(remaining_ms as u64))
            }
        }
    }
}

/// Counter state returned by the store after recording one failure
#[derive(Debug, Clone)]
pub struct AttemptOutcome {
    /// Failure count inside the current window, including this failure
    pub failure_count: u32,
    /// Consecutive lockouts already served for this key
    pub lockout_streak: u32,
}

impl AttemptOutcome {
    /// Whether this failure crosses the lockout threshold
    pub fn should_lock(&self, config: &LockoutConfig) -> bool {
        self.failure_count >= config.max_failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubling() {
        let config = LockoutConfig::default();
        let base = 15 * 60 * 1000;

        assert_eq!(config.lockout_duration_ms(0), base);
        assert_eq!(config.lockout_duration_ms(1), base * 2);
        assert_eq!(config.lockout_duration_ms(3), base * 8);
    }

    #[test]
    fn test_backoff_cap() {
        let config = LockoutConfig::default();
        // Streaks past the cap all yield the same duration
        assert_eq!(
            config.lockout_duration_ms(6),
            config.lockout_duration_ms(100)
        );
    }

    #[test]
    fn test_should_lock_at_threshold() {
        let config = LockoutConfig::default();

        let below = AttemptOutcome {
            failure_count: 4,
            lockout_streak: 0,
        };
        assert!(!below.should_lock(&config));

        let at = AttemptOutcome {
            failure_count: 5,
            lockout_streak: 0,
        };
        assert!(at.should_lock(&config));
    }

    #[test]
    fn test_retry_after() {
        let status = LockoutStatus::Locked { until_ms: 10_000 };
        assert_eq!(
            status.retry_after(4_000),
            Some(Duration::from_millis(6_000))
        );

        // Already expired lock reports zero, not negative
        assert_eq!(status.retry_after(20_000), Some(Duration::ZERO));

        assert_eq!(LockoutStatus::Clear.retry_after(0), None);
    }
}
