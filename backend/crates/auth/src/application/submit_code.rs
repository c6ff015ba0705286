//! Submit Code Use Case
//!
//! Second-factor resolution: resolves the flow continuation, re-gates the
//! lockout guard, re-derives the factor branch from the account row, and
//! dispatches to the TOTP or OTP verification path. Issues the session
//! exactly once, on the success path only.

use std::sync::Arc;

use chrono::Utc;
use platform::client::ClientOrigin;

use crate::application::config::AuthConfig;
use crate::application::session;
use crate::domain::entity::admin_account::{AdminAccount, FactorBranch};
use crate::domain::entity::auth_session::AuthSession;
use crate::domain::entity::login_flow::{FlowState, LoginFlow};
use crate::domain::repository::{
    AccountRepository, AttemptRepository, LoginFlowRepository, OtpChallengeRepository,
    SessionRepository,
};
use crate::domain::value_object::admin_role::AdminRole;
use crate::error::{AuthError, AuthResult};
use kernel::id::{AccountId, LoginFlowId};

/// Submit code input
pub struct SubmitCodeInput {
    pub flow_id: LoginFlowId,
    pub code: String,
}

/// Submit code output: the issued session
#[derive(Debug)]
pub struct SubmitCodeOutput {
    pub session_token: String,
    pub role: AdminRole,
    pub expires_at_ms: i64,
}

/// Submit code use case
pub struct SubmitCodeUseCase<A, T, O, F, S>
where
    A: AccountRepository,
    T: AttemptRepository,
    O: OtpChallengeRepository,
    F: LoginFlowRepository,
    S: SessionRepository,
{
    account_repo: Arc<A>,
    attempt_repo: Arc<T>,
    otp_repo: Arc<O>,
    flow_repo: Arc<F>,
    session_repo: Arc<S>,
    config: Arc<AuthConfig>,
}

impl<A, T, O, F, S> SubmitCodeUseCase<A, T, O, F, S>
where
    A: AccountRepository,
    T: AttemptRepository,
    O: OtpChallengeRepository,
    F: LoginFlowRepository,
    S: SessionRepository,
{
    pub fn new(
        account_repo: Arc<A>,
        attempt_repo: Arc<T>,
        otp_repo: Arc<O>,
        flow_repo: Arc<F>,
        session_repo: Arc<S>,
        config: Arc<AuthConfig>,
    ) -> Self {
        Self {
            account_repo,
            attempt_repo,
            otp_repo,
            flow_repo,
            session_repo,
            config,
        }
    }

    pub async fn execute(
        &self,
        input: SubmitCodeInput,
        origin: ClientOrigin,
    ) -> AuthResult<SubmitCodeOutput> {
        let now_ms = Utc::now().timestamp_millis();

        let flow = self
            .flow_repo
            .find(&input.flow_id)
            .await?
            .ok_or(AuthError::FlowInvalid)?;

        if flow.is_expired(now_ms) {
            self.flow_repo.delete(&flow.flow_id).await?;
            return Err(AuthError::FlowInvalid);
        }

        let account = self
            .account_repo
            .find_by_id(&flow.account_id)
            .await?
            .ok_or(AuthError::FlowInvalid)?;

        // Lockout gate runs before any code comparison; a lockout earned
        // during the flow window applies here too
        let status = self
            .attempt_repo
            .check(&account.account_id, &origin.bucket)
            .await?;
        if let Some(retry_after) = status.retry_after(now_ms) {
            return Err(AuthError::LockedOut { retry_after });
        }

        // The account row is the authority; the stored flow state only
        // cross-checks that the client is on the expected step
        let branch = account.factor_branch();
        if !branch_matches_state(branch, flow.state) {
            tracing::warn!(
                flow_id = %flow.flow_id,
                stored_state = %flow.state.code(),
                "Flow state no longer matches account state"
            );
            self.flow_repo.delete(&flow.flow_id).await?;
            return Err(AuthError::FlowInvalid);
        }

        match branch {
            FactorBranch::TotpCode => {
                self.verify_totp_login(&account, &input.code, &origin)
                    .await?
            }
            FactorBranch::TotpEnrollment => {
                self.verify_totp_enrollment(&account, &input.code, &origin, now_ms)
                    .await?
            }
            FactorBranch::EmailOtp => {
                self.verify_email_otp(&account, &input.code, &origin, now_ms)
                    .await?
            }
        }

        self.finish(&account, &flow, &origin).await
    }

    /// Verify a TOTP login code against the enrolled secret.
    ///
    /// The matched time step is committed in the same storage statement
    /// that accepts the login; a non-increasing step means the code was
    /// already used and fails closed.
    async fn verify_totp_login(
        &self,
        account: &AdminAccount,
        code: &str,
        origin: &ClientOrigin,
    ) -> AuthResult<()> {
        let secret = account.totp_secret.as_ref().ok_or(AuthError::NotEnrolled)?;

        let now_unix = Utc::now().timestamp() as u64;
        let matched = secret.verify_at(code, account.email.as_str(), now_unix)?;

        let Some(step) = matched else {
            self.record_failure(&account.account_id, &origin.bucket)
                .await?;
            return Err(AuthError::InvalidCode);
        };

        let committed = self
            .account_repo
            .commit_totp_step(&account.account_id, step as i64)
            .await?;

        if !committed {
            // Replay: this step (or a later one) was already consumed
            tracing::warn!(
                account_id = %account.account_id,
                "Replayed TOTP code rejected"
            );
            self.record_failure(&account.account_id, &origin.bucket)
                .await?;
            return Err(AuthError::InvalidCode);
        }

        Ok(())
    }

    /// Verify the first code against the pending enrollment secret and
    /// promote it. Success doubles as the login.
    async fn verify_totp_enrollment(
        &self,
        account: &AdminAccount,
        code: &str,
        origin: &ClientOrigin,
        now_ms: i64,
    ) -> AuthResult<()> {
        let Some(pending) = account.valid_pending_secret(now_ms) else {
            // Pending secret expired or missing; restart from the password
            return Err(AuthError::FlowInvalid);
        };

        let now_unix = Utc::now().timestamp() as u64;
        let matched = pending.verify_at(code, account.email.as_str(), now_unix)?;

        let Some(step) = matched else {
            // Wrong code: the pending secret stays so the user can retry
            self.record_failure(&account.account_id, &origin.bucket)
                .await?;
            return Err(AuthError::InvalidCode);
        };

        // Promotion also consumes the matched step, so the enrollment
        // code cannot double as a later login code
        let promoted = self
            .account_repo
            .promote_pending_totp(&account.account_id, pending, step as i64)
            .await?;

        if !promoted {
            // A concurrent login replaced the pending secret; only the
            // secret that is still stored can be promoted
            tracing::warn!(
                account_id = %account.account_id,
                "TOTP enrollment promotion lost a race"
            );
            self.record_failure(&account.account_id, &origin.bucket)
                .await?;
            return Err(AuthError::InvalidCode);
        }

        tracing::info!(account_id = %account.account_id, "TOTP enrollment completed");
        Ok(())
    }

    /// Verify and consume an emailed one-time code
    async fn verify_email_otp(
        &self,
        account: &AdminAccount,
        code: &str,
        origin: &ClientOrigin,
        now_ms: i64,
    ) -> AuthResult<()> {
        let challenge = match self.otp_repo.find_latest(&account.account_id).await? {
            Some(c) => c,
            None => {
                self.record_failure(&account.account_id, &origin.bucket)
                    .await?;
                return Err(AuthError::InvalidCode);
            }
        };

        if challenge.is_expired(now_ms) {
            return Err(AuthError::CodeExpired);
        }

        if !challenge.code_matches(code) {
            self.record_failure(&account.account_id, &origin.bucket)
                .await?;
            return Err(AuthError::InvalidCode);
        }

        // Conditional consume: losing the race counts as a wrong code
        let consumed = self.otp_repo.consume(&challenge.otp_challenge_id).await?;
        if !consumed {
            tracing::warn!(
                account_id = %account.account_id,
                "One-time code already consumed"
            );
            self.record_failure(&account.account_id, &origin.bucket)
                .await?;
            return Err(AuthError::InvalidCode);
        }

        Ok(())
    }

    /// Terminal success transition: clear counters, consume the flow,
    /// issue the session exactly once
    async fn finish(
        &self,
        account: &AdminAccount,
        flow: &LoginFlow,
        origin: &ClientOrigin,
    ) -> AuthResult<SubmitCodeOutput> {
        self.attempt_repo.clear(&account.account_id).await?;
        self.flow_repo.delete(&flow.flow_id).await?;

        let ttl = chrono::Duration::from_std(self.config.session_ttl)
            .map_err(|e| AuthError::Internal(format!("Invalid session TTL: {e}")))?;

        let session = AuthSession::issue(
            account.account_id,
            account.role,
            origin.ip_string(),
            origin.country_code.clone(),
            ttl,
        );
        self.session_repo.create(&session).await?;

        let session_token = session::mint_token(&self.config.session_secret, session.session_id);

        tracing::info!(
            account_id = %account.account_id,
            session_id = %session.session_id,
            role = %account.role,
            "Administrator authenticated"
        );

        Ok(SubmitCodeOutput {
            session_token,
            role: account.role,
            expires_at_ms: session.expires_at_ms,
        })
    }

    /// Record a failure and escalate to a lockout when the count crosses
    /// the threshold (same discipline as the first-factor step)
    async fn record_failure(&self, account_id: &AccountId, bucket: &str) -> AuthResult<()> {
        let outcome = self
            .attempt_repo
            .record_failure(account_id, bucket, &self.config.lockout)
            .await?;

        if outcome.should_lock(&self.config.lockout) {
            let now_ms = Utc::now().timestamp_millis();
            let duration_ms = self
                .config
                .lockout
                .lockout_duration_ms(outcome.lockout_streak);
            self.attempt_repo
                .lock(account_id, bucket, now_ms + duration_ms)
                .await?;

            tracing::warn!(
                account_id = %account_id,
                origin_bucket = %bucket,
                lockout_ms = duration_ms,
                "Account locked after repeated failures"
            );
        }

        Ok(())
    }
}

/// Whether the stored flow step still matches the branch the account row
/// dictates
fn branch_matches_state(branch: FactorBranch, state: FlowState) -> bool {
    matches!(
        (branch, state),
        (FactorBranch::TotpCode, FlowState::AwaitingTotpCode)
            | (FactorBranch::TotpEnrollment, FlowState::AwaitingTotpEnrollment)
            | (FactorBranch::EmailOtp, FlowState::AwaitingOtpCode)
    )
}
