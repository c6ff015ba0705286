//! Login Flow Entity
//!
//! Server-held continuation between login steps. The client echoes back
//! only the opaque flow id; every decision re-derives from the account
//! row, and the stored state cross-checks that the client is on the step
//! the server expects.

use chrono::{DateTime, Utc};
use kernel::id::{AccountId, LoginFlowId};
use std::time::Duration;

/// Which second-factor step the flow is waiting on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i16)]
pub enum FlowState {
    AwaitingTotpCode = 0,
    AwaitingTotpEnrollment = 1,
    AwaitingOtpCode = 2,
}

impl FlowState {
    #[inline]
    pub const fn id(&self) -> i16 {
        *self as i16
    }

    #[inline]
    pub const fn code(&self) -> &'static str {
        match self {
            FlowState::AwaitingTotpCode => "awaiting_totp_code",
            FlowState::AwaitingTotpEnrollment => "awaiting_totp_enrollment",
            FlowState::AwaitingOtpCode => "awaiting_otp_code",
        }
    }

    #[inline]
    pub fn from_id(id: i16) -> Self {
        match id {
            0 => FlowState::AwaitingTotpCode,
            1 => FlowState::AwaitingTotpEnrollment,
            2 => FlowState::AwaitingOtpCode,
            _ => {
                tracing::error!("Invalid FlowState id: {}", id);
                unreachable!("Invalid FlowState id: {}", id)
            }
        }
    }
}

/// Persisted login flow continuation
#[derive(Debug, Clone)]
pub struct LoginFlow {
    pub flow_id: LoginFlowId,
    pub account_id: AccountId,
    pub state: FlowState,
    /// Expiry (epoch ms); expired flows force a restart from the password
    pub expires_at_ms: i64,
    pub created_at: DateTime<Utc>,
}

impl LoginFlow {
    /// Open a flow after first-factor success
    pub fn open(account_id: AccountId, state: FlowState, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            flow_id: LoginFlowId::new(),
            account_id,
            state,
            expires_at_ms: now.timestamp_millis() + ttl.as_millis() as i64,
            created_at: now,
        }
    }

    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at_ms <= now_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel::id::Id;

    #[test]
    fn test_flow_state_ids() {
        assert_eq!(FlowState::from_id(0), FlowState::AwaitingTotpCode);
        assert_eq!(FlowState::from_id(1), FlowState::AwaitingTotpEnrollment);
        assert_eq!(FlowState::from_id(2), FlowState::AwaitingOtpCode);
    }

    #[test]
    fn test_open_and_expiry() {
        let flow = LoginFlow::open(
            Id::new(),
            FlowState::AwaitingTotpCode,
            Duration::from_secs(300),
        );

        let now_ms = Utc::now().timestamp_millis();
        assert!(!flow.is_expired(now_ms));
        assert!(flow.is_expired(flow.expires_at_ms));
    }
}
