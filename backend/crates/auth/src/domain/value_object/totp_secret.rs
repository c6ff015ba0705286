//! TOTP Secret Value Object
//!
//! Wraps a TOTP secret for the authenticator-app second factor.
//! Uses Google Authenticator compatible settings (SHA-1, 6 digits, 30 s
//! step). Verification walks the previous, current, and next step and
//! reports which step matched so the caller can enforce single use per
//! step.

use kernel::error::app_error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use totp_rs::{Algorithm, Secret, TOTP};

/// TOTP configuration constants
const TOTP_DIGITS: usize = 6;
const TOTP_STEP: u64 = 30;
const TOTP_ISSUER: &str = "AdminConsole";

/// TOTP Secret for the second factor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotpSecret {
    /// Base32-encoded secret
    secret_base32: String,
}

impl TotpSecret {
    /// Generate a new random TOTP secret (160-bit)
    pub fn generate() -> Self {
        let secret = Secret::generate_secret();
        Self {
            secret_base32: secret.to_encoded().to_string(),
        }
    }

    /// Create from a base32-encoded string (from database)
    pub fn from_base32(secret: impl Into<String>) -> AppResult<Self> {
        let secret_str = secret.into();
        // Validate by trying to decode
        Secret::Encoded(secret_str.clone())
            .to_bytes()
            .map_err(|e| AppError::internal(format!("Invalid TOTP secret: {}", e)))?;

        Ok(Self {
            secret_base32: secret_str,
        })
    }

    /// Get the base32-encoded secret for storage
    pub fn as_base32(&self) -> &str {
        &self.secret_base32
    }

    /// Create a TOTP instance for this secret
    fn to_totp(&self, account_name: &str) -> AppResult<TOTP> {
        let secret = Secret::Encoded(self.secret_base32.clone());

        TOTP::new(
            Algorithm::SHA1,
            TOTP_DIGITS,
            1, // skew (allow 1 step before/after)
            TOTP_STEP,
            secret
                .to_bytes()
                .map_err(|e| AppError::internal(format!("Invalid TOTP secret: {}", e)))?,
            Some(TOTP_ISSUER.to_string()),
            account_name.to_string(),
        )
        .map_err(|e| AppError::internal(format!("Failed to create TOTP: {}", e)))
    }

    /// Verify a code against the window around `now_unix` (seconds).
    ///
    /// Returns the matched time step (`time / 30`) so the caller can
    /// record it and reject a second presentation of the same code.
    /// Comparison is constant-time per candidate.
    pub fn verify_at(
        &self,
        code: &str,
        account_name: &str,
        now_unix: u64,
    ) -> AppResult<Option<u64>> {
        let totp = self.to_totp(account_name)?;

        for offset in [-1i64, 0, 1] {
            let t = now_unix as i64 + offset * TOTP_STEP as i64;
            if t < 0 {
                continue;
            }
            let t = t as u64;
            let expected = totp.generate(t);
            if platform::crypto::constant_time_eq(expected.as_bytes(), code.as_bytes()) {
                return Ok(Some(t / TOTP_STEP));
            }
        }

        Ok(None)
    }

    /// Generate the code for a given unix time (for testing)
    #[cfg(test)]
    pub fn generate_at(&self, account_name: &str, time: u64) -> AppResult<String> {
        let totp = self.to_totp(account_name)?;
        Ok(totp.generate(time))
    }

    /// Generate QR code as base64-encoded PNG
    pub fn generate_qr_code(&self, account_name: &str) -> AppResult<String> {
        let totp = self.to_totp(account_name)?;
        totp.get_qr_base64()
            .map_err(|e| AppError::internal(format!("Failed to generate QR code: {}", e)))
    }

    /// Get the otpauth:// URL for manual entry
    pub fn get_otpauth_url(&self, account_name: &str) -> AppResult<String> {
        let totp = self.to_totp(account_name)?;
        Ok(totp.get_url())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCOUNT: &str = "admin@example.com";

    #[test]
    fn test_totp_secret_generate() {
        let secret = TotpSecret::generate();
        assert!(!secret.as_base32().is_empty());
    }

    #[test]
    fn test_verify_current_step() {
        let secret = TotpSecret::generate();
        let now = 1_700_000_000u64;

        let code = secret.generate_at(ACCOUNT, now).unwrap();
        let step = secret.verify_at(&code, ACCOUNT, now).unwrap();
        assert_eq!(step, Some(now / 30));
    }

    #[test]
    fn test_verify_adjacent_steps() {
        let secret = TotpSecret::generate();
        let now = 1_700_000_000u64;

        // Code from the previous step is still accepted, and reports
        // the step it was generated for
        let prev_code = secret.generate_at(ACCOUNT, now - 30).unwrap();
        let step = secret.verify_at(&prev_code, ACCOUNT, now).unwrap();
        assert_eq!(step, Some((now - 30) / 30));

        let next_code = secret.generate_at(ACCOUNT, now + 30).unwrap();
        let step = secret.verify_at(&next_code, ACCOUNT, now).unwrap();
        assert_eq!(step, Some((now + 30) / 30));
    }

    #[test]
    fn test_verify_outside_window() {
        let secret = TotpSecret::generate();
        let now = 1_700_000_000u64;

        let old_code = secret.generate_at(ACCOUNT, now - 90).unwrap();
        // Codes two or more steps away are rejected (unless the digits
        // happen to collide, which six digits makes unlikely but possible;
        // regenerate far enough away to avoid flaking on a same-code pair)
        let current = secret.generate_at(ACCOUNT, now).unwrap();
        let prev = secret.generate_at(ACCOUNT, now - 30).unwrap();
        let next = secret.generate_at(ACCOUNT, now + 30).unwrap();
        if old_code != current && old_code != prev && old_code != next {
            assert_eq!(secret.verify_at(&old_code, ACCOUNT, now).unwrap(), None);
        }
    }

    #[test]
    fn test_verify_wrong_code() {
        let secret = TotpSecret::generate();
        let now = 1_700_000_000u64;
        let valid = secret.generate_at(ACCOUNT, now).unwrap();
        let wrong = if valid == "000000" { "000001" } else { "000000" };
        assert_eq!(secret.verify_at(wrong, ACCOUNT, now).unwrap(), None);
    }

    #[test]
    fn test_totp_secret_from_base32() {
        let secret = TotpSecret::generate();
        let base32 = secret.as_base32().to_string();

        let restored = TotpSecret::from_base32(base32).unwrap();
        assert_eq!(secret.as_base32(), restored.as_base32());
    }

    #[test]
    fn test_otpauth_url() {
        let secret = TotpSecret::generate();
        let url = secret.get_otpauth_url(ACCOUNT).unwrap();
        assert!(url.starts_with("otpauth://totp/"));
        assert!(url.contains("AdminConsole"));
    }

    #[test]
    fn test_totp_qr_code() {
        let secret = TotpSecret::generate();
        let qr = secret.generate_qr_code(ACCOUNT).unwrap();
        assert!(!qr.is_empty());
    }
}
