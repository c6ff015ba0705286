//! PostgreSQL Repository Implementations
//!
//! One pool-backed type implements every repository trait. The operations
//! the traits mark atomic are single guarded statements here; the guard
//! lives in the WHERE clause (or the upsert), never in application code.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entity::{
    admin_account::AdminAccount, auth_session::AuthSession, login_attempt::LoginAttempt,
    login_flow::{FlowState, LoginFlow}, otp_challenge::OtpChallenge,
};
use crate::domain::repository::{
    AccountRepository, AttemptRepository, LoginFlowRepository, OtpChallengeRepository,
    SessionRepository,
};
use crate::domain::value_object::{
    admin_role::AdminRole, email::Email, second_factor::SecondFactor, totp_secret::TotpSecret,
};
use crate::error::{AuthError, AuthResult};
use kernel::id::{AccountId, LoginFlowId, OtpChallengeId};
use platform::password::HashedPassword;
use platform::rate_limit::{AttemptOutcome, LockoutConfig, LockoutStatus};

/// PostgreSQL-backed auth repository
#[derive(Clone)]
pub struct PgAuthRepository {
    pool: PgPool,
}

impl PgAuthRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Remove everything past its TTL: flows, challenges, sessions
    pub async fn cleanup_expired(&self) -> AuthResult<u64> {
        let flows = LoginFlowRepository::cleanup_expired(self).await?;
        let challenges = OtpChallengeRepository::cleanup_expired(self).await?;
        let sessions = SessionRepository::cleanup_expired(self).await?;

        tracing::info!(
            flows_deleted = flows,
            challenges_deleted = challenges,
            sessions_deleted = sessions,
            "Cleaned up expired auth records"
        );

        Ok(flows + challenges + sessions)
    }
}

// ============================================================================
// Account Repository Implementation
// ============================================================================

impl AccountRepository for PgAuthRepository {
    async fn create(&self, account: &AdminAccount) -> AuthResult<()> {
        sqlx::query(
            r#"
            INSERT INTO admin_accounts (
                account_id,
                email,
                password_hash,
                role,
                second_factor,
                totp_secret,
                totp_pending_secret,
                totp_pending_expires_at_ms,
                totp_last_step,
                country_code,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(account.account_id.as_uuid())
        .bind(account.email.as_str())
        .bind(account.password_hash.as_phc_string())
        .bind(account.role.id())
        .bind(account.second_factor.id())
        .bind(account.totp_secret.as_ref().map(|s| s.as_base32()))
        .bind(account.totp_pending_secret.as_ref().map(|s| s.as_base32()))
        .bind(account.totp_pending_expires_at_ms)
        .bind(account.totp_last_step)
        .bind(&account.country_code)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, account_id: &AccountId) -> AuthResult<Option<AdminAccount>> {
        let row = sqlx::query_as::<_, AdminAccountRow>(
            r#"
            SELECT
                account_id,
                email,
                password_hash,
                role,
                second_factor,
                totp_secret,
                totp_pending_secret,
                totp_pending_expires_at_ms,
                totp_last_step,
                country_code,
                created_at,
                updated_at
            FROM admin_accounts
            WHERE account_id = $1
            "#,
        )
        .bind(account_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_account()).transpose()
    }

    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<AdminAccount>> {
        let row = sqlx::query_as::<_, AdminAccountRow>(
            r#"
            SELECT
                account_id,
                email,
                password_hash,
                role,
                second_factor,
                totp_secret,
                totp_pending_secret,
                totp_pending_expires_at_ms,
                totp_last_step,
                country_code,
                created_at,
                updated_at
            FROM admin_accounts
            WHERE email = $1
            "#,
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_account()).transpose()
    }

    async fn set_pending_totp(
        &self,
        account_id: &AccountId,
        secret: &TotpSecret,
        expires_at_ms: i64,
    ) -> AuthResult<()> {
        sqlx::query(
            r#"
            UPDATE admin_accounts SET
                totp_pending_secret = $2,
                totp_pending_expires_at_ms = $3,
                updated_at = $4
            WHERE account_id = $1
            "#,
        )
        .bind(account_id.as_uuid())
        .bind(secret.as_base32())
        .bind(expires_at_ms)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn promote_pending_totp(
        &self,
        account_id: &AccountId,
        expected: &TotpSecret,
        step: i64,
    ) -> AuthResult<bool> {
        // Only the pending secret that is still stored can win promotion;
        // a concurrent re-enrollment makes the guard fail. The enrollment
        // step is consumed here, so the same code cannot log in again.
        let promoted = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE admin_accounts SET
                totp_secret = totp_pending_secret,
                totp_pending_secret = NULL,
                totp_pending_expires_at_ms = NULL,
                totp_last_step = $3,
                updated_at = $4
            WHERE account_id = $1 AND totp_pending_secret = $2
            RETURNING account_id
            "#,
        )
        .bind(account_id.as_uuid())
        .bind(expected.as_base32())
        .bind(step)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        Ok(promoted.is_some())
    }

    async fn commit_totp_step(&self, account_id: &AccountId, step: i64) -> AuthResult<bool> {
        // Strictly increasing; an equal or older step is a replay
        let committed = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE admin_accounts SET
                totp_last_step = $2,
                updated_at = $3
            WHERE account_id = $1
              AND (totp_last_step IS NULL OR totp_last_step < $2)
            RETURNING account_id
            "#,
        )
        .bind(account_id.as_uuid())
        .bind(step)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        Ok(committed.is_some())
    }

    async fn record_country(
        &self,
        account_id: &AccountId,
        country_code: Option<&str>,
    ) -> AuthResult<()> {
        sqlx::query(
            r#"
            UPDATE admin_accounts SET
                country_code = $2,
                updated_at = $3
            WHERE account_id = $1
            "#,
        )
        .bind(account_id.as_uuid())
        .bind(country_code)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// ============================================================================
// Attempt Repository Implementation
// ============================================================================

impl AttemptRepository for PgAuthRepository {
    async fn check(
        &self,
        account_id: &AccountId,
        origin_bucket: &str,
    ) -> AuthResult<LockoutStatus> {
        let row = sqlx::query_as::<_, LoginAttemptRow>(
            r#"
            SELECT
                account_id,
                origin_bucket,
                failure_count,
                window_start_ms,
                locked_until_ms,
                lockout_streak
            FROM login_attempts
            WHERE account_id = $1 AND origin_bucket = $2
            "#,
        )
        .bind(account_id.as_uuid())
        .bind(origin_bucket)
        .fetch_optional(&self.pool)
        .await?;

        let now_ms = Utc::now().timestamp_millis();
        Ok(row
            .map(|r| r.into_attempt().status(now_ms))
            .unwrap_or(LockoutStatus::Clear))
    }

    async fn record_failure(
        &self,
        account_id: &AccountId,
        origin_bucket: &str,
        config: &LockoutConfig,
    ) -> AuthResult<AttemptOutcome> {
        let now_ms = Utc::now().timestamp_millis();
        let window_cutoff_ms = now_ms - config.window_ms();

        // Increment-or-reset in one statement so concurrent failures each
        // observe a distinct post-increment count
        let (failure_count, lockout_streak) = sqlx::query_as::<_, (i32, i32)>(
            r#"
            INSERT INTO login_attempts (
                account_id,
                origin_bucket,
                failure_count,
                window_start_ms,
                locked_until_ms,
                lockout_streak
            ) VALUES ($1, $2, 1, $3, NULL, 0)
            ON CONFLICT (account_id, origin_bucket) DO UPDATE SET
                failure_count = CASE
                    WHEN login_attempts.window_start_ms <= $4 THEN 1
                    ELSE login_attempts.failure_count + 1
                END,
                window_start_ms = CASE
                    WHEN login_attempts.window_start_ms <= $4 THEN $3
                    ELSE login_attempts.window_start_ms
                END
            RETURNING failure_count, lockout_streak
            "#,
        )
        .bind(account_id.as_uuid())
        .bind(origin_bucket)
        .bind(now_ms)
        .bind(window_cutoff_ms)
        .fetch_one(&self.pool)
        .await?;

        Ok(AttemptOutcome {
            failure_count: failure_count as u32,
            lockout_streak: lockout_streak as u32,
        })
    }

    async fn lock(
        &self,
        account_id: &AccountId,
        origin_bucket: &str,
        until_ms: i64,
    ) -> AuthResult<()> {
        sqlx::query(
            r#"
            UPDATE login_attempts SET
                locked_until_ms = $3,
                lockout_streak = lockout_streak + 1,
                failure_count = 0
            WHERE account_id = $1 AND origin_bucket = $2
            "#,
        )
        .bind(account_id.as_uuid())
        .bind(origin_bucket)
        .bind(until_ms)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn clear(&self, account_id: &AccountId) -> AuthResult<()> {
        sqlx::query("DELETE FROM login_attempts WHERE account_id = $1")
            .bind(account_id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

// ============================================================================
// OTP Challenge Repository Implementation
// ============================================================================

impl OtpChallengeRepository for PgAuthRepository {
    async fn create(&self, challenge: &OtpChallenge) -> AuthResult<()> {
        let mut tx = self.pool.begin().await?;

        // A fresh challenge supersedes any live one for the account
        sqlx::query("DELETE FROM otp_challenges WHERE account_id = $1 AND consumed = FALSE")
            .bind(challenge.account_id.as_uuid())
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO otp_challenges (
                otp_challenge_id,
                account_id,
                code,
                expires_at_ms,
                consumed,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(challenge.otp_challenge_id.as_uuid())
        .bind(challenge.account_id.as_uuid())
        .bind(&challenge.code)
        .bind(challenge.expires_at_ms)
        .bind(challenge.consumed)
        .bind(challenge.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn find_latest(&self, account_id: &AccountId) -> AuthResult<Option<OtpChallenge>> {
        let row = sqlx::query_as::<_, OtpChallengeRow>(
            r#"
            SELECT
                otp_challenge_id,
                account_id,
                code,
                expires_at_ms,
                consumed,
                created_at
            FROM otp_challenges
            WHERE account_id = $1 AND consumed = FALSE
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(account_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_challenge()))
    }

    async fn consume(&self, challenge_id: &OtpChallengeId) -> AuthResult<bool> {
        // Flips exactly once; the second caller sees zero rows
        let consumed = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE otp_challenges SET consumed = TRUE
            WHERE otp_challenge_id = $1 AND consumed = FALSE
            RETURNING otp_challenge_id
            "#,
        )
        .bind(challenge_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(consumed.is_some())
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        let now_ms = Utc::now().timestamp_millis();

        let deleted = sqlx::query("DELETE FROM otp_challenges WHERE expires_at_ms < $1")
            .bind(now_ms)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(deleted)
    }
}

// ============================================================================
// Login Flow Repository Implementation
// ============================================================================

impl LoginFlowRepository for PgAuthRepository {
    async fn create(&self, flow: &LoginFlow) -> AuthResult<()> {
        sqlx::query(
            r#"
            INSERT INTO login_flows (
                flow_id,
                account_id,
                state,
                expires_at_ms,
                created_at
            ) VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(flow.flow_id.as_uuid())
        .bind(flow.account_id.as_uuid())
        .bind(flow.state.id())
        .bind(flow.expires_at_ms)
        .bind(flow.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find(&self, flow_id: &LoginFlowId) -> AuthResult<Option<LoginFlow>> {
        let row = sqlx::query_as::<_, LoginFlowRow>(
            r#"
            SELECT
                flow_id,
                account_id,
                state,
                expires_at_ms,
                created_at
            FROM login_flows
            WHERE flow_id = $1
            "#,
        )
        .bind(flow_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_flow()))
    }

    async fn delete(&self, flow_id: &LoginFlowId) -> AuthResult<()> {
        sqlx::query("DELETE FROM login_flows WHERE flow_id = $1")
            .bind(flow_id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        let now_ms = Utc::now().timestamp_millis();

        let deleted = sqlx::query("DELETE FROM login_flows WHERE expires_at_ms < $1")
            .bind(now_ms)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(deleted)
    }
}

// ============================================================================
// Session Repository Implementation
// ============================================================================

impl SessionRepository for PgAuthRepository {
    async fn create(&self, session: &AuthSession) -> AuthResult<()> {
        sqlx::query(
            r#"
            INSERT INTO auth_sessions (
                session_id,
                account_id,
                role,
                expires_at_ms,
                client_ip,
                country_code,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(session.session_id)
        .bind(session.account_id.as_uuid())
        .bind(session.role.id())
        .bind(session.expires_at_ms)
        .bind(&session.client_ip)
        .bind(&session.country_code)
        .bind(session.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, session_id: Uuid) -> AuthResult<Option<AuthSession>> {
        let now_ms = Utc::now().timestamp_millis();

        let row = sqlx::query_as::<_, AuthSessionRow>(
            r#"
            SELECT
                session_id,
                account_id,
                role,
                expires_at_ms,
                client_ip,
                country_code,
                created_at
            FROM auth_sessions
            WHERE session_id = $1 AND expires_at_ms > $2
            "#,
        )
        .bind(session_id)
        .bind(now_ms)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_session()))
    }

    async fn delete(&self, session_id: Uuid) -> AuthResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE session_id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_all_for_account(&self, account_id: &AccountId) -> AuthResult<u64> {
        let deleted = sqlx::query("DELETE FROM auth_sessions WHERE account_id = $1")
            .bind(account_id.as_uuid())
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(deleted)
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        let now_ms = Utc::now().timestamp_millis();

        let deleted = sqlx::query("DELETE FROM auth_sessions WHERE expires_at_ms < $1")
            .bind(now_ms)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(deleted)
    }
}

// ============================================================================
// Row Types for sqlx mapping
// ============================================================================

#[derive(sqlx::FromRow)]
struct AdminAccountRow {
    account_id: Uuid,
    email: String,
    password_hash: String,
    role: i16,
    second_factor: i16,
    totp_secret: Option<String>,
    totp_pending_secret: Option<String>,
    totp_pending_expires_at_ms: Option<i64>,
    totp_last_step: Option<i64>,
    country_code: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AdminAccountRow {
    fn into_account(self) -> AuthResult<AdminAccount> {
        let password_hash = HashedPassword::from_phc_string(self.password_hash)
            .map_err(|e| AuthError::Internal(format!("Invalid password hash: {}", e)))?;

        let totp_secret = self
            .totp_secret
            .map(TotpSecret::from_base32)
            .transpose()
            .map_err(|e| AuthError::Internal(format!("Invalid TOTP secret: {}", e)))?;

        let totp_pending_secret = self
            .totp_pending_secret
            .map(TotpSecret::from_base32)
            .transpose()
            .map_err(|e| AuthError::Internal(format!("Invalid pending TOTP secret: {}", e)))?;

        Ok(AdminAccount {
            account_id: AccountId::from_uuid(self.account_id),
            email: Email::from_db(self.email),
            password_hash,
            role: AdminRole::from_id(self.role),
            second_factor: SecondFactor::from_id(self.second_factor),
            totp_secret,
            totp_pending_secret,
            totp_pending_expires_at_ms: self.totp_pending_expires_at_ms,
            totp_last_step: self.totp_last_step,
            country_code: self.country_code,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct LoginAttemptRow {
    account_id: Uuid,
    origin_bucket: String,
    failure_count: i32,
    window_start_ms: i64,
    locked_until_ms: Option<i64>,
    lockout_streak: i32,
}

impl LoginAttemptRow {
    fn into_attempt(self) -> LoginAttempt {
        LoginAttempt {
            account_id: AccountId::from_uuid(self.account_id),
            origin_bucket: self.origin_bucket,
            failure_count: self.failure_count as u32,
            window_start_ms: self.window_start_ms,
            locked_until_ms: self.locked_until_ms,
            lockout_streak: self.lockout_streak as u32,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OtpChallengeRow {
    otp_challenge_id: Uuid,
    account_id: Uuid,
    code: String,
    expires_at_ms: i64,
    consumed: bool,
    created_at: DateTime<Utc>,
}

impl OtpChallengeRow {
    fn into_challenge(self) -> OtpChallenge {
        OtpChallenge {
            otp_challenge_id: OtpChallengeId::from_uuid(self.otp_challenge_id),
            account_id: AccountId::from_uuid(self.account_id),
            code: self.code,
            expires_at_ms: self.expires_at_ms,
            consumed: self.consumed,
            created_at: self.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct LoginFlowRow {
    flow_id: Uuid,
    account_id: Uuid,
    state: i16,
    expires_at_ms: i64,
    created_at: DateTime<Utc>,
}

impl LoginFlowRow {
    fn into_flow(self) -> LoginFlow {
        LoginFlow {
            flow_id: LoginFlowId::from_uuid(self.flow_id),
            account_id: AccountId::from_uuid(self.account_id),
            state: FlowState::from_id(self.state),
            expires_at_ms: self.expires_at_ms,
            created_at: self.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct AuthSessionRow {
    session_id: Uuid,
    account_id: Uuid,
    role: i16,
    expires_at_ms: i64,
    client_ip: Option<String>,
    country_code: Option<String>,
    created_at: DateTime<Utc>,
}

impl AuthSessionRow {
    fn into_session(self) -> AuthSession {
        AuthSession {
            session_id: self.session_id,
            account_id: AccountId::from_uuid(self.account_id),
            role: AdminRole::from_id(self.role),
            expires_at_ms: self.expires_at_ms,
            client_ip: self.client_ip,
            country_code: self.country_code,
            created_at: self.created_at,
        }
    }
}
