//! Sign Out Use Case
//!
//! Revokes the presented session, or every session an account holds.
//! Both are idempotent; revoking an already-gone session succeeds.

use std::sync::Arc;

use crate::application::config::AuthConfig;
use crate::application::session;
use crate::domain::repository::SessionRepository;
use crate::error::AuthResult;
use kernel::id::AccountId;

/// Sign out use case
pub struct SignOutUseCase<S>
where
    S: SessionRepository,
{
    session_repo: Arc<S>,
    config: Arc<AuthConfig>,
}

impl<S> SignOutUseCase<S>
where
    S: SessionRepository,
{
    pub fn new(session_repo: Arc<S>, config: Arc<AuthConfig>) -> Self {
        Self {
            session_repo,
            config,
        }
    }

    /// Revoke the session the token names
    pub async fn execute(&self, token: &str) -> AuthResult<()> {
        // An unparseable token has nothing to revoke; sign-out still
        // succeeds so the client can always drop its cookie
        let Ok(session_id) = session::parse_token(&self.config.session_secret, token) else {
            return Ok(());
        };

        self.session_repo.delete(session_id).await?;
        tracing::info!(session_id = %session_id, "Session revoked");
        Ok(())
    }

    /// Revoke every session the account holds
    pub async fn execute_all(&self, account_id: &AccountId) -> AuthResult<u64> {
        let revoked = self.session_repo.delete_all_for_account(account_id).await?;
        tracing::info!(
            account_id = %account_id,
            revoked,
            "All sessions revoked for account"
        );
        Ok(revoked)
    }
}
