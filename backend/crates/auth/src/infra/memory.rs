//! In-Memory Repository Implementation
//!
//! Mutex-protected maps with the same atomicity contracts as the
//! PostgreSQL implementation. Locks are never held across an await.
//! Used by tests and local development without a database.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::entity::{
    admin_account::AdminAccount, auth_session::AuthSession, login_attempt::LoginAttempt,
    login_flow::LoginFlow, otp_challenge::OtpChallenge,
};
use crate::domain::repository::{
    AccountRepository, AttemptRepository, LoginFlowRepository, OtpChallengeRepository,
    SessionRepository,
};
use crate::domain::value_object::{email::Email, totp_secret::TotpSecret};
use crate::error::{AuthError, AuthResult};
use kernel::id::{AccountId, LoginFlowId, OtpChallengeId};
use platform::rate_limit::{AttemptOutcome, LockoutConfig, LockoutStatus};

/// In-memory auth repository
#[derive(Default)]
pub struct MemoryAuthRepository {
    accounts: Mutex<HashMap<Uuid, AdminAccount>>,
    attempts: Mutex<HashMap<(Uuid, String), LoginAttempt>>,
    challenges: Mutex<HashMap<Uuid, OtpChallenge>>,
    flows: Mutex<HashMap<Uuid, LoginFlow>>,
    sessions: Mutex<HashMap<Uuid, AuthSession>>,
}

impl MemoryAuthRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock<'a, T>(mutex: &'a Mutex<T>) -> AuthResult<std::sync::MutexGuard<'a, T>> {
    mutex
        .lock()
        .map_err(|_| AuthError::Internal("Repository lock poisoned".to_string()))
}

impl AccountRepository for MemoryAuthRepository {
    async fn create(&self, account: &AdminAccount) -> AuthResult<()> {
        lock(&self.accounts)?.insert(account.account_id.into_uuid(), account.clone());
        Ok(())
    }

    async fn find_by_id(&self, account_id: &AccountId) -> AuthResult<Option<AdminAccount>> {
        Ok(lock(&self.accounts)?.get(account_id.as_uuid()).cloned())
    }

    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<AdminAccount>> {
        Ok(lock(&self.accounts)?
            .values()
            .find(|a| a.email == *email)
            .cloned())
    }

    async fn set_pending_totp(
        &self,
        account_id: &AccountId,
        secret: &TotpSecret,
        expires_at_ms: i64,
    ) -> AuthResult<()> {
        let mut accounts = lock(&self.accounts)?;
        if let Some(account) = accounts.get_mut(account_id.as_uuid()) {
            account.totp_pending_secret = Some(secret.clone());
            account.totp_pending_expires_at_ms = Some(expires_at_ms);
            account.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn promote_pending_totp(
        &self,
        account_id: &AccountId,
        expected: &TotpSecret,
        step: i64,
    ) -> AuthResult<bool> {
        let mut accounts = lock(&self.accounts)?;
        let Some(account) = accounts.get_mut(account_id.as_uuid()) else {
            return Ok(false);
        };

        if account.totp_pending_secret.as_ref() != Some(expected) {
            return Ok(false);
        }

        account.totp_secret = account.totp_pending_secret.take();
        account.totp_pending_expires_at_ms = None;
        // The enrollment code's step is consumed by the promotion
        account.totp_last_step = Some(step);
        account.updated_at = Utc::now();
        Ok(true)
    }

    async fn commit_totp_step(&self, account_id: &AccountId, step: i64) -> AuthResult<bool> {
        let mut accounts = lock(&self.accounts)?;
        let Some(account) = accounts.get_mut(account_id.as_uuid()) else {
            return Ok(false);
        };

        match account.totp_last_step {
            Some(last) if last >= step => Ok(false),
            _ => {
                account.totp_last_step = Some(step);
                account.updated_at = Utc::now();
                Ok(true)
            }
        }
    }

    async fn record_country(
        &self,
        account_id: &AccountId,
        country_code: Option<&str>,
    ) -> AuthResult<()> {
        let mut accounts = lock(&self.accounts)?;
        if let Some(account) = accounts.get_mut(account_id.as_uuid()) {
            account.country_code = country_code.map(str::to_string);
            account.updated_at = Utc::now();
        }
        Ok(())
    }
}

impl AttemptRepository for MemoryAuthRepository {
    async fn check(
        &self,
        account_id: &AccountId,
        origin_bucket: &str,
    ) -> AuthResult<LockoutStatus> {
        let attempts = lock(&self.attempts)?;
        let key = (account_id.into_uuid(), origin_bucket.to_string());
        let now_ms = Utc::now().timestamp_millis();

        Ok(attempts
            .get(&key)
            .map(|a| a.status(now_ms))
            .unwrap_or(LockoutStatus::Clear))
    }

    async fn record_failure(
        &self,
        account_id: &AccountId,
        origin_bucket: &str,
        config: &LockoutConfig,
    ) -> AuthResult<AttemptOutcome> {
        let mut attempts = lock(&self.attempts)?;
        let key = (account_id.into_uuid(), origin_bucket.to_string());
        let now_ms = Utc::now().timestamp_millis();

        let entry = attempts.entry(key).or_insert_with(|| LoginAttempt {
            account_id: *account_id,
            origin_bucket: origin_bucket.to_string(),
            failure_count: 0,
            window_start_ms: now_ms,
            locked_until_ms: None,
            lockout_streak: 0,
        });

        if entry.window_expired(now_ms, config) {
            entry.failure_count = 1;
            entry.window_start_ms = now_ms;
        } else {
            entry.failure_count += 1;
        }

        Ok(AttemptOutcome {
            failure_count: entry.failure_count,
            lockout_streak: entry.lockout_streak,
        })
    }

    async fn lock(
        &self,
        account_id: &AccountId,
        origin_bucket: &str,
        until_ms: i64,
    ) -> AuthResult<()> {
        let mut attempts = lock(&self.attempts)?;
        let key = (account_id.into_uuid(), origin_bucket.to_string());

        if let Some(entry) = attempts.get_mut(&key) {
            entry.locked_until_ms = Some(until_ms);
            entry.lockout_streak += 1;
            entry.failure_count = 0;
        }
        Ok(())
    }

    async fn clear(&self, account_id: &AccountId) -> AuthResult<()> {
        lock(&self.attempts)?.retain(|(id, _), _| id != account_id.as_uuid());
        Ok(())
    }
}

impl OtpChallengeRepository for MemoryAuthRepository {
    async fn create(&self, challenge: &OtpChallenge) -> AuthResult<()> {
        let mut challenges = lock(&self.challenges)?;
        challenges.retain(|_, c| c.account_id != challenge.account_id || c.consumed);
        challenges.insert(challenge.otp_challenge_id.into_uuid(), challenge.clone());
        Ok(())
    }

    async fn find_latest(&self, account_id: &AccountId) -> AuthResult<Option<OtpChallenge>> {
        Ok(lock(&self.challenges)?
            .values()
            .filter(|c| c.account_id == *account_id && !c.consumed)
            .max_by_key(|c| c.created_at)
            .cloned())
    }

    async fn consume(&self, challenge_id: &OtpChallengeId) -> AuthResult<bool> {
        let mut challenges = lock(&self.challenges)?;
        match challenges.get_mut(challenge_id.as_uuid()) {
            Some(c) if !c.consumed => {
                c.consumed = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        let mut challenges = lock(&self.challenges)?;
        let now_ms = Utc::now().timestamp_millis();
        let before = challenges.len();
        challenges.retain(|_, c| c.expires_at_ms >= now_ms);
        Ok((before - challenges.len()) as u64)
    }
}

impl LoginFlowRepository for MemoryAuthRepository {
    async fn create(&self, flow: &LoginFlow) -> AuthResult<()> {
        lock(&self.flows)?.insert(flow.flow_id.into_uuid(), flow.clone());
        Ok(())
    }

    async fn find(&self, flow_id: &LoginFlowId) -> AuthResult<Option<LoginFlow>> {
        Ok(lock(&self.flows)?.get(flow_id.as_uuid()).cloned())
    }

    async fn delete(&self, flow_id: &LoginFlowId) -> AuthResult<()> {
        lock(&self.flows)?.remove(flow_id.as_uuid());
        Ok(())
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        let mut flows = lock(&self.flows)?;
        let now_ms = Utc::now().timestamp_millis();
        let before = flows.len();
        flows.retain(|_, f| f.expires_at_ms >= now_ms);
        Ok((before - flows.len()) as u64)
    }
}

impl SessionRepository for MemoryAuthRepository {
    async fn create(&self, session: &AuthSession) -> AuthResult<()> {
        lock(&self.sessions)?.insert(session.session_id, session.clone());
        Ok(())
    }

    async fn find_by_id(&self, session_id: Uuid) -> AuthResult<Option<AuthSession>> {
        let now_ms = Utc::now().timestamp_millis();
        Ok(lock(&self.sessions)?
            .get(&session_id)
            .filter(|s| s.expires_at_ms > now_ms)
            .cloned())
    }

    async fn delete(&self, session_id: Uuid) -> AuthResult<()> {
        lock(&self.sessions)?.remove(&session_id);
        Ok(())
    }

    async fn delete_all_for_account(&self, account_id: &AccountId) -> AuthResult<u64> {
        let mut sessions = lock(&self.sessions)?;
        let before = sessions.len();
        sessions.retain(|_, s| s.account_id != *account_id);
        Ok((before - sessions.len()) as u64)
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        let mut sessions = lock(&self.sessions)?;
        let now_ms = Utc::now().timestamp_millis();
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at_ms >= now_ms);
        Ok((before - sessions.len()) as u64)
    }
}
