//! Begin Login Use Case
//!
//! First-factor gate: verifies email + password, then branches into the
//! second-factor step the account needs and opens a login flow
//! continuation. Never issues a session; that happens only in the code
//! submission step.

use std::sync::Arc;

use chrono::Utc;
use platform::client::ClientOrigin;
use platform::password::{ClearTextPassword, dummy_verify};

use crate::application::config::AuthConfig;
use crate::domain::entity::admin_account::FactorBranch;
use crate::domain::entity::login_flow::{FlowState, LoginFlow};
use crate::domain::entity::otp_challenge::OtpChallenge;
use crate::domain::repository::{
    AccountRepository, AttemptRepository, CodeDelivery, LoginFlowRepository,
    OtpChallengeRepository,
};
use crate::domain::value_object::email::Email;
use crate::error::{AuthError, AuthResult};
use kernel::id::{AccountId, LoginFlowId};

/// Begin login input
pub struct BeginLoginInput {
    pub email: String,
    pub password: String,
}

/// Begin login output: the continuation handed back to the client
#[derive(Debug)]
pub enum BeginLoginOutput {
    /// TOTP enrolled; submit a code from the authenticator app
    AwaitingTotpCode { flow_id: LoginFlowId },
    /// TOTP not yet enrolled; provision the authenticator with this
    /// payload and submit the first code
    AwaitingTotpEnrollment {
        flow_id: LoginFlowId,
        secret_base32: String,
        otpauth_url: String,
        qr_code_base64: String,
    },
    /// A one-time code was emailed to the account address
    AwaitingOtpCode {
        flow_id: LoginFlowId,
        masked_email: String,
    },
}

/// Begin login use case
pub struct BeginLoginUseCase<A, T, O, F, D>
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

impl<A, T, O, F, D> BeginLoginUseCase<A, T, O, F, D>
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
        input: BeginLoginInput,
        origin: ClientOrigin,
    ) -> AuthResult<BeginLoginOutput> {
        // Malformed input is indistinguishable from wrong credentials;
        // run the dummy verification first so every rejection path does
        // comparable work.
        let password = match ClearTextPassword::new(input.password) {
            Ok(p) => p,
            Err(_) => return Err(self.reject_with_uniform_timing()),
        };

        let email = match Email::new(input.email.as_str()) {
            Ok(e) => e,
            Err(_) => {
                dummy_verify(&password, self.config.pepper());
                return Err(AuthError::InvalidCredentials);
            }
        };

        let account = match self.account_repo.find_by_email(&email).await? {
            Some(a) => a,
            None => {
                // No existence oracle: burn the same Argon2 work as a
                // real verification before rejecting
                dummy_verify(&password, self.config.pepper());
                return Err(AuthError::InvalidCredentials);
            }
        };

        // Lockout gate runs before any password comparison
        let now_ms = Utc::now().timestamp_millis();
        let status = self
            .attempt_repo
            .check(&account.account_id, &origin.bucket)
            .await?;
        if let Some(retry_after) = status.retry_after(now_ms) {
            return Err(AuthError::LockedOut { retry_after });
        }

        if !account.password_hash.verify(&password, self.config.pepper()) {
            self.record_failure(&account.account_id, &origin.bucket)
                .await?;
            return Err(AuthError::InvalidCredentials);
        }

        // Country code is audit annotation only
        self.account_repo
            .record_country(&account.account_id, origin.country_code.as_deref())
            .await?;

        // Branch on the account's second-factor state. This happens only
        // after password success, so enrollment state never leaks.
        match account.factor_branch() {
            FactorBranch::TotpCode => {
                let flow = LoginFlow::open(
                    account.account_id,
                    FlowState::AwaitingTotpCode,
                    self.config.flow_ttl,
                );
                self.flow_repo.create(&flow).await?;

                tracing::info!(
                    account_id = %account.account_id,
                    flow_id = %flow.flow_id,
                    "First factor verified, awaiting TOTP code"
                );

                Ok(BeginLoginOutput::AwaitingTotpCode {
                    flow_id: flow.flow_id,
                })
            }
            FactorBranch::TotpEnrollment => {
                let secret = crate::domain::value_object::totp_secret::TotpSecret::generate();
                let expires_at_ms =
                    now_ms + self.config.totp_pending_ttl.as_millis() as i64;
                self.account_repo
                    .set_pending_totp(&account.account_id, &secret, expires_at_ms)
                    .await?;

                let account_name = account.email.as_str();
                let otpauth_url = secret.get_otpauth_url(account_name)?;
                let qr_code_base64 = secret.generate_qr_code(account_name)?;

                let flow = LoginFlow::open(
                    account.account_id,
                    FlowState::AwaitingTotpEnrollment,
                    self.config.flow_ttl,
                );
                self.flow_repo.create(&flow).await?;

                tracing::info!(
                    account_id = %account.account_id,
                    flow_id = %flow.flow_id,
                    "First factor verified, TOTP enrollment started"
                );

                Ok(BeginLoginOutput::AwaitingTotpEnrollment {
                    flow_id: flow.flow_id,
                    secret_base32: secret.as_base32().to_string(),
                    otpauth_url,
                    qr_code_base64,
                })
            }
            FactorBranch::EmailOtp => {
                let flow = LoginFlow::open(
                    account.account_id,
                    FlowState::AwaitingOtpCode,
                    self.config.flow_ttl,
                );
                self.flow_repo.create(&flow).await?;

                self.issue_otp(&account.account_id, &account.email).await?;

                tracing::info!(
                    account_id = %account.account_id,
                    flow_id = %flow.flow_id,
                    "First factor verified, one-time code emailed"
                );

                Ok(BeginLoginOutput::AwaitingOtpCode {
                    flow_id: flow.flow_id,
                    masked_email: account.email.masked(),
                })
            }
        }
    }

    /// Issue and deliver an emailed one-time code
    async fn issue_otp(&self, account_id: &AccountId, email: &Email) -> AuthResult<()> {
        let challenge = OtpChallenge::issue(*account_id, self.config.otp_ttl);
        self.otp_repo.create(&challenge).await?;
        self.delivery.send(email, &challenge.code).await?;
        Ok(())
    }

    /// Record a failure and escalate to a lockout when the count crosses
    /// the threshold. Each caller acts on the count its own atomic
    /// increment returned, so two racing failures cannot both slip past.
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

    /// Reject with the same Argon2 cost as a real verification
    fn reject_with_uniform_timing(&self) -> AuthError {
        // The submitted password failed policy checks and cannot be
        // hashed as-is; verify a fixed placeholder instead
        if let Ok(placeholder) = ClearTextPassword::new("placeholder-timing".to_string()) {
            dummy_verify(&placeholder, self.config.pepper());
        }
        AuthError::InvalidCredentials
    }
}
