//! Repository Traits
//!
//! Interfaces for data persistence and outbound delivery. Implementations
//! live in the infrastructure layer. Operations marked atomic must hold
//! their contract under concurrent callers; the use cases rely on it.

use kernel::id::{AccountId, LoginFlowId};
use uuid::Uuid;

use crate::domain::entity::{
    admin_account::AdminAccount, auth_session::AuthSession, login_flow::LoginFlow,
    otp_challenge::OtpChallenge,
};
use crate::domain::value_object::{email::Email, totp_secret::TotpSecret};
use crate::error::AuthResult;
use platform::rate_limit::{AttemptOutcome, LockoutConfig, LockoutStatus};

/// Admin account repository trait
#[trait_variant::make(AccountRepository: Send)]
pub trait LocalAccountRepository {
    /// Create a new account (provisioning)
    async fn create(&self, account: &AdminAccount) -> AuthResult<()>;

    /// Find account by ID
    async fn find_by_id(&self, account_id: &AccountId) -> AuthResult<Option<AdminAccount>>;

    /// Find account by lowercased email
    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<AdminAccount>>;

    /// Store a pending TOTP secret, replacing any previous pending one
    async fn set_pending_totp(
        &self,
        account_id: &AccountId,
        secret: &TotpSecret,
        expires_at_ms: i64,
    ) -> AuthResult<()>;

    /// Promote the pending secret to the enrolled slot and clear pending,
    /// atomically, only if the stored pending secret still equals
    /// `expected`. `step` is the time step the enrollment code matched;
    /// it is recorded so the same code cannot log in again. Returns false
    /// if another enrollment won the race.
    async fn promote_pending_totp(
        &self,
        account_id: &AccountId,
        expected: &TotpSecret,
        step: i64,
    ) -> AuthResult<bool>;

    /// Record a consumed TOTP step, only if it is strictly greater than
    /// the last recorded one. Returns false on a replayed or older step.
    async fn commit_totp_step(&self, account_id: &AccountId, step: i64) -> AuthResult<bool>;

    /// Update the advisory country code (audit only)
    async fn record_country(
        &self,
        account_id: &AccountId,
        country_code: Option<&str>,
    ) -> AuthResult<()>;
}

/// Login attempt counter repository trait
#[trait_variant::make(AttemptRepository: Send)]
pub trait LocalAttemptRepository {
    /// Current lockout status for (account, bucket). Must be consulted
    /// before any credential comparison.
    async fn check(&self, account_id: &AccountId, origin_bucket: &str)
    -> AuthResult<LockoutStatus>;

    /// Record one failure: atomic increment-or-reset of the windowed
    /// counter, returning the post-increment state. Two concurrent
    /// failures observe distinct counts.
    async fn record_failure(
        &self,
        account_id: &AccountId,
        origin_bucket: &str,
        config: &LockoutConfig,
    ) -> AuthResult<AttemptOutcome>;

    /// Escalate to a lockout: set the lock end, bump the streak, reset
    /// the window counter.
    async fn lock(
        &self,
        account_id: &AccountId,
        origin_bucket: &str,
        until_ms: i64,
    ) -> AuthResult<()>;

    /// Clear all buckets for the account (full authentication success)
    async fn clear(&self, account_id: &AccountId) -> AuthResult<()>;
}

/// OTP challenge repository trait
#[trait_variant::make(OtpChallengeRepository: Send)]
pub trait LocalOtpChallengeRepository {
    /// Persist a fresh challenge, superseding (removing) unconsumed ones
    /// for the same account
    async fn create(&self, challenge: &OtpChallenge) -> AuthResult<()>;

    /// Newest unconsumed challenge for the account, expired or not
    /// (the caller distinguishes expired from wrong)
    async fn find_latest(&self, account_id: &AccountId) -> AuthResult<Option<OtpChallenge>>;

    /// Flip `consumed` exactly once. Returns false if another caller
    /// already consumed it.
    async fn consume(&self, challenge_id: &kernel::id::OtpChallengeId) -> AuthResult<bool>;

    /// Remove expired challenges (hygiene only)
    async fn cleanup_expired(&self) -> AuthResult<u64>;
}

/// Login flow repository trait
#[trait_variant::make(LoginFlowRepository: Send)]
pub trait LocalLoginFlowRepository {
    /// Persist a new flow continuation
    async fn create(&self, flow: &LoginFlow) -> AuthResult<()>;

    /// Find a flow by ID
    async fn find(&self, flow_id: &LoginFlowId) -> AuthResult<Option<LoginFlow>>;

    /// Delete a flow (terminal transition or expiry)
    async fn delete(&self, flow_id: &LoginFlowId) -> AuthResult<()>;

    /// Remove expired flows (hygiene only)
    async fn cleanup_expired(&self) -> AuthResult<u64>;
}

/// Auth session repository trait
#[trait_variant::make(SessionRepository: Send)]
pub trait LocalSessionRepository {
    /// Persist a new session
    async fn create(&self, session: &AuthSession) -> AuthResult<()>;

    /// Find an unexpired session by ID
    async fn find_by_id(&self, session_id: Uuid) -> AuthResult<Option<AuthSession>>;

    /// Revoke a session
    async fn delete(&self, session_id: Uuid) -> AuthResult<()>;

    /// Revoke every session for an account
    async fn delete_all_for_account(&self, account_id: &AccountId) -> AuthResult<u64>;

    /// Remove expired sessions (hygiene only)
    async fn cleanup_expired(&self) -> AuthResult<u64>;
}

/// Outbound code delivery failure
///
/// Distinct from a wrong code: delivery problems are retryable and never
/// count against the caller.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct DeliveryError(pub String);

/// Outbound port for emailing one-time codes
///
/// The real channel is an external collaborator; the binary wires a
/// tracing-only implementation for development.
#[trait_variant::make(CodeDelivery: Send)]
pub trait LocalCodeDelivery {
    async fn send(&self, email: &Email, code: &str) -> Result<(), DeliveryError>;
}
