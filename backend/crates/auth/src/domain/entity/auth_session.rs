//! Auth Session Entity
//!
//! An issued administrator session. Immutable once created: no activity
//! extension, no attribute updates. Revocation is a row delete or expiry.

use chrono::{DateTime, Duration, Utc};
use kernel::id::AccountId;
use uuid::Uuid;

use crate::domain::value_object::admin_role::AdminRole;

/// Auth session entity
#[derive(Debug, Clone)]
pub struct AuthSession {
    /// Session ID (UUID v4); the cookie token wraps this with an HMAC
    pub session_id: Uuid,
    /// Account the session belongs to
    pub account_id: AccountId,
    /// Role at issuance; authorization reads this, not the account row
    pub role: AdminRole,
    /// Session expiration (epoch ms)
    pub expires_at_ms: i64,
    /// Client IP at issuance (audit only)
    pub client_ip: Option<String>,
    /// Country code at issuance (audit only)
    pub country_code: Option<String>,
    /// Issued timestamp
    pub created_at: DateTime<Utc>,
}

impl AuthSession {
    /// Issue a new session
    ///
    /// TTL is provided by the application layer (config), not hard-coded here.
    pub fn issue(
        account_id: AccountId,
        role: AdminRole,
        client_ip: Option<String>,
        country_code: Option<String>,
        ttl: Duration,
    ) -> Self {
        let now = Utc::now();

        Self {
            session_id: Uuid::new_v4(),
            account_id,
            role,
            expires_at_ms: (now + ttl).timestamp_millis(),
            client_ip,
            country_code,
            created_at: now,
        }
    }

    /// Check if session has expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp_millis() > self.expires_at_ms
    }

    /// Get remaining time until expiration
    pub fn remaining_ms(&self) -> i64 {
        let now_ms = Utc::now().timestamp_millis();
        (self.expires_at_ms - now_ms).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel::id::Id;

    #[test]
    fn test_issue_sets_expiry() {
        let session = AuthSession::issue(
            Id::new(),
            AdminRole::Admin,
            Some("203.0.113.7".to_string()),
            Some("JP".to_string()),
            Duration::hours(8),
        );

        assert!(!session.is_expired());
        let remaining = session.remaining_ms();
        assert!(remaining > 0 && remaining <= 8 * 3600 * 1000);
    }

    #[test]
    fn test_expired_session() {
        let mut session = AuthSession::issue(Id::new(), AdminRole::Admin, None, None, Duration::hours(8));
        session.expires_at_ms = Utc::now().timestamp_millis() - 1;
        assert!(session.is_expired());
        assert_eq!(session.remaining_ms(), 0);
    }
}
