//! Resend One-Time Code Use Case
//!
//! Issues a fresh emailed code for an open email-OTP flow. The new
//! challenge supersedes the previous one, so at most one code is live
//! per account.

use std::sync::Arc;

use chrono::Utc;
use platform::client::ClientOrigin;

use crate::application::config::AuthConfig;
use crate::domain::entity::admin_account::FactorBranch;
use crate::domain::entity::login_flow::FlowState;
use crate::domain::entity::otp_challenge::OtpChallenge;
use crate::domain::repository::{
    AccountRepository, AttemptRepository, CodeDelivery, LoginFlowRepository,
    OtpChallengeRepository,
};
use crate::error::{AuthError, AuthResult};
use kernel::id::LoginFlowId;

/// Resend OTP input
pub struct ResendOtpInput {
    pub flow_id: LoginFlowId,
}

/// Resend OTP output
pub struct ResendOtpOutput {
    pub masked_email: String,
}

/// Resend OTP use case
pub struct ResendOtpUseCase<A, T, O, F, D>
where
    A: AccountRepository,
    T: AttemptRepository,
    O: OtpChallengeRepository,
    F: LoginFlowRepository,
    D: CodeDelivery,
{
    account_repo: Arc<A>,
    attempt_repo: Arc<T>,
    otp_repo: Arc<O>,
    flow_repo: Arc<F>,
    delivery: Arc<D>,
    config: Arc<AuthConfig>,
}

impl<A, T, O, F, D> ResendOtpUseCase<A, T, O, F, D>
where
    A: AccountRepository,
    T: AttemptRepository,
    O: OtpChallengeRepository,
    F: LoginFlowRepository,
    D: CodeDelivery,
{
    pub fn new(
        account_repo: Arc<A>,
        attempt_repo: Arc<T>,
        otp_repo: Arc<O>,
        flow_repo: Arc<F>,
        delivery: Arc<D>,
        config: Arc<AuthConfig>,
    ) -> Self {
        Self {
            account_repo,
            attempt_repo,
            otp_repo,
            flow_repo,
            delivery,
            config,
        }
    }

    pub async fn execute(
        &self,
        input: ResendOtpInput,
        origin: ClientOrigin,
    ) -> AuthResult<ResendOtpOutput> {
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

        // Resend only applies to the email-OTP step
        if flow.state != FlowState::AwaitingOtpCode {
            return Err(AuthError::FlowInvalid);
        }

        let account = self
            .account_repo
            .find_by_id(&flow.account_id)
            .await?
            .ok_or(AuthError::FlowInvalid)?;

        if account.factor_branch() != FactorBranch::EmailOtp {
            return Err(AuthError::FlowInvalid);
        }

        // A locked origin cannot mint fresh codes either
        let status = self
            .attempt_repo
            .check(&account.account_id, &origin.bucket)
            .await?;
        if let Some(retry_after) = status.retry_after(now_ms) {
            return Err(AuthError::LockedOut { retry_after });
        }

        let challenge = OtpChallenge::issue(account.account_id, self.config.otp_ttl);
        self.otp_repo.create(&challenge).await?;
        self.delivery.send(&account.email, &challenge.code).await?;

        tracing::info!(
            account_id = %account.account_id,
            flow_id = %flow.flow_id,
            "One-time code resent"
        );

        Ok(ResendOtpOutput {
            masked_email: account.email.masked(),
        })
    }
}
