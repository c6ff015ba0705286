//! Auth Error Types
//!
//! This module provides auth-specific error variants that integrate
//! with the unified `kernel::error::AppError` system.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

use crate::domain::repository::DeliveryError;

/// Auth-specific result type alias
pub type AuthResult<T> = Result<T, AuthError>;

/// Auth-specific error variants
///
/// Rejection messages are deliberately generic: callers cannot tell a
/// missing account from a wrong password, or a wrong code from a replayed
/// one.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Wrong email or password (also covers unknown accounts)
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Wrong, replayed, or already-consumed second-factor code
    #[error("Invalid verification code")]
    InvalidCode,

    /// Second-factor code exists but its validity window has passed
    #[error("Verification code has expired")]
    CodeExpired,

    /// TOTP required but the account has no enrolled secret
    #[error("Second factor is not enrolled")]
    NotEnrolled,

    /// Too many failed attempts; locked for the given duration
    #[error("Too many failed attempts, try again later")]
    LockedOut { retry_after: Duration },

    /// Outbound code delivery failed (retryable)
    #[error("Could not deliver verification code")]
    DeliveryFailed(#[from] DeliveryError),

    /// Login flow continuation is unknown, expired, or on the wrong step
    #[error("Login flow is no longer valid")]
    FlowInvalid,

    /// Session not found, expired, or token signature invalid
    #[error("Session not found or expired")]
    SessionInvalid,

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials | AuthError::InvalidCode => StatusCode::UNAUTHORIZED,
            AuthError::CodeExpired => StatusCode::GONE,
            AuthError::NotEnrolled => StatusCode::PRECONDITION_FAILED,
            AuthError::LockedOut { .. } => StatusCode::LOCKED,
            AuthError::DeliveryFailed(_) => StatusCode::BAD_GATEWAY,
            AuthError::FlowInvalid => StatusCode::GONE,
            AuthError::SessionInvalid => StatusCode::UNAUTHORIZED,
            AuthError::Database(_) | AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::InvalidCredentials | AuthError::InvalidCode | AuthError::SessionInvalid => {
                ErrorKind::Unauthorized
            }
            AuthError::CodeExpired | AuthError::FlowInvalid => ErrorKind::Gone,
            AuthError::NotEnrolled => ErrorKind::PreconditionFailed,
            AuthError::LockedOut { .. } => ErrorKind::Locked,
            AuthError::DeliveryFailed(_) => ErrorKind::BadGateway,
            AuthError::Database(_) | AuthError::Internal(_) => ErrorKind::InternalServerError,
        }
    }

    /// Convert to AppError
    pub fn to_app_error(&self) -> AppError {
        match self {
            AuthError::LockedOut { retry_after } => AppError::new(self.kind(), self.to_string())
                .with_action(format!("Retry after {} seconds", retry_after.as_secs())),
            _ => AppError::new(self.kind(), self.to_string()),
        }
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            AuthError::Database(e) => {
                tracing::error!(error = %e, "Auth database error");
            }
            AuthError::Internal(msg) => {
                tracing::error!(message = %msg, "Auth internal error");
            }
            AuthError::DeliveryFailed(e) => {
                tracing::error!(error = %e, "Verification code delivery failed");
            }
            AuthError::InvalidCredentials => {
                tracing::warn!("Invalid login attempt");
            }
            AuthError::InvalidCode => {
                tracing::warn!("Invalid second-factor code");
            }
            AuthError::LockedOut { retry_after } => {
                tracing::warn!(
                    retry_after_secs = retry_after.as_secs(),
                    "Attempt on locked account"
                );
            }
            _ => {
                tracing::debug!(error = %self, "Auth error");
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        self.log();

        // Locked responses carry a Retry-After so clients can back off
        if let AuthError::LockedOut { retry_after } = &self {
            let retry_secs = retry_after.as_secs().max(1).to_string();
            let mut response = self.to_app_error().into_response();
            if let Ok(value) = retry_secs.parse::<axum::http::HeaderValue>() {
                response
                    .headers_mut()
                    .insert(axum::http::header::RETRY_AFTER, value);
            }
            return response;
        }

        self.to_app_error().into_response()
    }
}

impl From<AppError> for AuthError {
    fn from(err: AppError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AuthError::InvalidCredentials.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AuthError::InvalidCode.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::CodeExpired.status_code(), StatusCode::GONE);
        assert_eq!(
            AuthError::NotEnrolled.status_code(),
            StatusCode::PRECONDITION_FAILED
        );
        assert_eq!(
            AuthError::LockedOut {
                retry_after: Duration::from_secs(60)
            }
            .status_code(),
            StatusCode::LOCKED
        );
        assert_eq!(AuthError::FlowInvalid.status_code(), StatusCode::GONE);
        assert_eq!(
            AuthError::SessionInvalid.status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_generic_messages() {
        // Credential rejections must not reveal which part failed
        let msg = AuthError::InvalidCredentials.to_string();
        assert!(!msg.to_lowercase().contains("password"));
        assert!(!msg.to_lowercase().contains("email"));
        assert!(!msg.to_lowercase().contains("account"));
    }

    #[test]
    fn test_locked_out_action_hint() {
        let err = AuthError::LockedOut {
            retry_after: Duration::from_secs(900),
        };
        let app = err.to_app_error();
        assert_eq!(app.status_code(), 423);
        assert!(app.action().unwrap().contains("900"));
    }
}
