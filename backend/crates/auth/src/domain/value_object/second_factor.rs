//! Second Factor Mode
//!
//! Which second factor an account uses. Chosen at provisioning time and
//! mutually exclusive per account; there is no runtime fallback between
//! the two.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum SecondFactor {
    /// Authenticator-app TOTP; enrollment happens in-band on first login
    #[default]
    Totp = 0,
    /// One-time code delivered to the account email (legacy accounts)
    EmailOtp = 1,
}

impl SecondFactor {
    #[inline]
    pub const fn id(&self) -> i16 {
        *self as i16
    }

    #[inline]
    pub const fn code(&self) -> &'static str {
        match self {
            SecondFactor::Totp => "totp",
            SecondFactor::EmailOtp => "email_otp",
        }
    }

    #[inline]
    pub fn from_id(id: i16) -> Self {
        match id {
            0 => SecondFactor::Totp,
            1 => SecondFactor::EmailOtp,
            _ => {
                tracing::error!("Invalid SecondFactor id: {}", id);
                unreachable!("Invalid SecondFactor id: {}", id)
            }
        }
    }
}

impl fmt::Display for SecondFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_factor_ids() {
        assert_eq!(SecondFactor::from_id(0), SecondFactor::Totp);
        assert_eq!(SecondFactor::from_id(1), SecondFactor::EmailOtp);
        assert_eq!(SecondFactor::Totp.id(), 0);
        assert_eq!(SecondFactor::EmailOtp.id(), 1);
    }

    #[test]
    fn test_second_factor_display() {
        assert_eq!(SecondFactor::Totp.to_string(), "totp");
        assert_eq!(SecondFactor::EmailOtp.to_string(), "email_otp");
    }
}
