//! OTP Challenge Entity
//!
//! A one-time code delivered to the account email. Single-use with a
//! short TTL; issuing a new challenge supersedes older unconsumed ones.

use chrono::{DateTime, Utc};
use kernel::id::{AccountId, OtpChallengeId};
use rand::Rng;
use std::time::Duration;

/// Number of decimal digits in an emailed code
pub const OTP_CODE_DIGITS: u32 = 6;

/// Emailed one-time code challenge
#[derive(Debug, Clone)]
pub struct OtpChallenge {
    pub otp_challenge_id: OtpChallengeId,
    pub account_id: AccountId,
    /// Zero-padded decimal code
    pub code: String,
    /// Expiry (epoch ms)
    pub expires_at_ms: i64,
    /// Set exactly once, by the conditional consume
    pub consumed: bool,
    pub created_at: DateTime<Utc>,
}

impl OtpChallenge {
    /// Issue a fresh challenge with a random code
    pub fn issue(account_id: AccountId, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            otp_challenge_id: OtpChallengeId::new(),
            account_id,
            code: generate_code(),
            expires_at_ms: now.timestamp_millis() + ttl.as_millis() as i64,
            consumed: false,
            created_at: now,
        }
    }

    /// Whether the validity window has passed
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at_ms <= now_ms
    }

    /// Constant-time code comparison
    pub fn code_matches(&self, submitted: &str) -> bool {
        platform::crypto::constant_time_eq(self.code.as_bytes(), submitted.as_bytes())
    }
}

/// Zero-padded decimal code, uniform over the full range
fn generate_code() -> String {
    let max = 10u32.pow(OTP_CODE_DIGITS);
    let n: u32 = rand::rng().random_range(0..max);
    format!("{:0width$}", n, width = OTP_CODE_DIGITS as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel::id::Id;

    #[test]
    fn test_code_format() {
        for _ in 0..32 {
            let code = generate_code();
            assert_eq!(code.len(), OTP_CODE_DIGITS as usize);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_issue_and_match() {
        let challenge = OtpChallenge::issue(Id::new(), Duration::from_secs(300));
        assert!(!challenge.consumed);

        let code = challenge.code.clone();
        assert!(challenge.code_matches(&code));

        let wrong = if code == "000000" { "000001" } else { "000000" };
        assert!(!challenge.code_matches(wrong));
    }

    #[test]
    fn test_expiry_boundary() {
        let challenge = OtpChallenge::issue(Id::new(), Duration::from_secs(300));
        assert!(!challenge.is_expired(challenge.expires_at_ms - 1));
        // Boundary counts as expired
        assert!(challenge.is_expired(challenge.expires_at_ms));
    }

    #[test]
    fn test_code_matches_rejects_wrong_length() {
        let challenge = OtpChallenge::issue(Id::new(), Duration::from_secs(300));
        assert!(!challenge.code_matches(&challenge.code[..5]));
    }
}
