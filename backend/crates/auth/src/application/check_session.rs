//! Check Session Use Case
//!
//! Validates the session cookie token: signature first, then the stored
//! row, then expiry. Expired rows are deleted on sight.

use std::sync::Arc;

use crate::application::config::AuthConfig;
use crate::application::session;
use crate::domain::repository::SessionRepository;
use crate::domain::value_object::admin_role::AdminRole;
use crate::error::{AuthError, AuthResult};
use kernel::id::AccountId;

/// Authenticated session info
pub struct SessionInfoOutput {
    pub account_id: AccountId,
    pub role: AdminRole,
    pub expires_at_ms: i64,
}

/// Check session use case
pub struct CheckSessionUseCase<S>
where
    S: SessionRepository,
{
    session_repo: Arc<S>,
    config: Arc<AuthConfig>,
}

impl<S> CheckSessionUseCase<S>
where
    S: SessionRepository,
{
    pub fn new(session_repo: Arc<S>, config: Arc<AuthConfig>) -> Self {
        Self {
            session_repo,
            config,
        }
    }

    pub async fn execute(&self, token: &str) -> AuthResult<SessionInfoOutput> {
        let session_id = session::parse_token(&self.config.session_secret, token)?;

        let session = self
            .session_repo
            .find_by_id(session_id)
            .await?
            .ok_or(AuthError::SessionInvalid)?;

        if session.is_expired() {
            self.session_repo.delete(session.session_id).await?;
            return Err(AuthError::SessionInvalid);
        }

        Ok(SessionInfoOutput {
            account_id: session.account_id,
            role: session.role,
            expires_at_ms: session.expires_at_ms,
        })
    }

    /// Convenience check that swallows the reason
    pub async fn is_valid(&self, token: &str) -> bool {
        self.execute(token).await.is_ok()
    }
}
