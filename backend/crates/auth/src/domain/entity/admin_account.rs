//! Admin Account Entity
//!
//! A provisioned administrator account: login key, credential, role, and
//! second-factor state in one record. There is no self-service signup;
//! rows are created out of band.

use chrono::{DateTime, Utc};
use kernel::id::AccountId;
use platform::password::HashedPassword;
use std::time::Duration;

use crate::domain::value_object::{
    admin_role::AdminRole, email::Email, second_factor::SecondFactor, totp_secret::TotpSecret,
};

/// Which step the account needs after a successful password check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactorBranch {
    /// TOTP enrolled; ask for a code
    TotpCode,
    /// TOTP account without an enrolled secret; provision one
    TotpEnrollment,
    /// Legacy account; email a one-time code
    EmailOtp,
}

/// Admin account entity
#[derive(Debug, Clone)]
pub struct AdminAccount {
    /// Opaque, immutable identifier
    pub account_id: AccountId,
    /// Login key, unique, stored lowercase
    pub email: Email,
    /// Argon2id PHC hash
    pub password_hash: HashedPassword,
    /// Role carried into issued sessions
    pub role: AdminRole,
    /// Provisioning-time second-factor choice
    pub second_factor: SecondFactor,
    /// Enrolled TOTP secret; present iff enrollment completed
    pub totp_secret: Option<TotpSecret>,
    /// Pending secret awaiting enrollment verification
    pub totp_pending_secret: Option<TotpSecret>,
    /// Pending secret TTL (epoch ms)
    pub totp_pending_expires_at_ms: Option<i64>,
    /// Last consumed TOTP time step (replay guard)
    pub totp_last_step: Option<i64>,
    /// Last observed country code; advisory only, never gates decisions
    pub country_code: Option<String>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl AdminAccount {
    /// Create a new account (provisioning path)
    pub fn new(
        email: Email,
        password_hash: HashedPassword,
        role: AdminRole,
        second_factor: SecondFactor,
    ) -> Self {
        let now = Utc::now();
        Self {
            account_id: AccountId::new(),
            email,
            password_hash,
            role,
            second_factor,
            totp_secret: None,
            totp_pending_secret: None,
            totp_pending_expires_at_ms: None,
            totp_last_step: None,
            country_code: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether TOTP enrollment has completed
    pub fn is_totp_enrolled(&self) -> bool {
        self.totp_secret.is_some()
    }

    /// Pending secret, if one exists and has not expired
    pub fn valid_pending_secret(&self, now_ms: i64) -> Option<&TotpSecret> {
        let secret = self.totp_pending_secret.as_ref()?;
        match self.totp_pending_expires_at_ms {
            Some(expires) if expires > now_ms => Some(secret),
            _ => None,
        }
    }

    /// Start (or restart) TOTP enrollment: a fresh pending secret replaces
    /// any previous one. Promotion to the enrolled slot happens only after
    /// a verified code, in storage, atomically.
    pub fn begin_totp_enrollment(&mut self, ttl: Duration) -> TotpSecret {
        let secret = TotpSecret::generate();
        self.totp_pending_secret = Some(secret.clone());
        self.totp_pending_expires_at_ms =
            Some(Utc::now().timestamp_millis() + ttl.as_millis() as i64);
        self.updated_at = Utc::now();
        secret
    }

    /// Determine which second-factor step this account needs next.
    ///
    /// Called only after the password check succeeded, so the branch never
    /// leaks enrollment state to unauthenticated callers.
    pub fn factor_branch(&self) -> FactorBranch {
        match self.second_factor {
            SecondFactor::EmailOtp => FactorBranch::EmailOtp,
            SecondFactor::Totp if self.is_totp_enrolled() => FactorBranch::TotpCode,
            SecondFactor::Totp => FactorBranch::TotpEnrollment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform::password::ClearTextPassword;

    fn account(second_factor: SecondFactor) -> AdminAccount {
        let password = ClearTextPassword::new("CorrectHorse#42".to_string()).unwrap();
        AdminAccount::new(
            Email::new("admin@example.com").unwrap(),
            password.hash(None).unwrap(),
            AdminRole::Admin,
            second_factor,
        )
    }

    #[test]
    fn test_factor_branch_email_otp() {
        let acct = account(SecondFactor::EmailOtp);
        assert_eq!(acct.factor_branch(), FactorBranch::EmailOtp);
    }

    #[test]
    fn test_factor_branch_totp_unenrolled() {
        let acct = account(SecondFactor::Totp);
        assert_eq!(acct.factor_branch(), FactorBranch::TotpEnrollment);
    }

    #[test]
    fn test_factor_branch_totp_enrolled() {
        let mut acct = account(SecondFactor::Totp);
        acct.totp_secret = Some(TotpSecret::generate());
        assert_eq!(acct.factor_branch(), FactorBranch::TotpCode);
    }

    #[test]
    fn test_enrollment_replaces_pending() {
        let mut acct = account(SecondFactor::Totp);
        let ttl = Duration::from_secs(600);

        let first = acct.begin_totp_enrollment(ttl);
        let second = acct.begin_totp_enrollment(ttl);

        assert_ne!(first.as_base32(), second.as_base32());
        assert_eq!(
            acct.totp_pending_secret.as_ref().unwrap().as_base32(),
            second.as_base32()
        );
        // Enrollment never touches the enrolled slot directly
        assert!(acct.totp_secret.is_none());
    }

    #[test]
    fn test_pending_secret_expiry() {
        let mut acct = account(SecondFactor::Totp);
        acct.begin_totp_enrollment(Duration::from_secs(600));

        let now_ms = Utc::now().timestamp_millis();
        assert!(acct.valid_pending_secret(now_ms).is_some());

        let after_expiry = acct.totp_pending_expires_at_ms.unwrap() + 1;
        assert!(acct.valid_pending_secret(after_expiry).is_none());
    }
}
