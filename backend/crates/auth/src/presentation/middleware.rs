//! Auth Middleware
//!
//! Middleware for requiring an administrator session on protected routes.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

use crate::application::CheckSessionUseCase;
use crate::application::config::AuthConfig;
use crate::domain::repository::SessionRepository;
use crate::domain::value_object::admin_role::AdminRole;
use kernel::id::AccountId;

/// Middleware state
#[derive(Clone)]
pub struct AuthMiddlewareState<S>
where
    S: SessionRepository + Send + Sync + 'static,
{
    pub repo: Arc<S>,
    pub config: Arc<AuthConfig>,
}

/// The authenticated admin, stored in request extensions for downstream
/// handlers
#[derive(Clone, Copy)]
pub struct AuthenticatedAdmin {
    pub account_id: AccountId,
    pub role: AdminRole,
}

/// Middleware that requires a valid admin session
pub async fn require_admin_session<S>(
    state: AuthMiddlewareState<S>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, Response>
where
    S: SessionRepository + Send + Sync + 'static,
{
    let token =
        platform::cookie::extract_cookie(req.headers(), &state.config.session_cookie_name);

    let use_case = CheckSessionUseCase::new(state.repo.clone(), state.config.clone());

    let info = match token {
        Some(token) => use_case.execute(&token).await.ok(),
        None => None,
    };

    let Some(info) = info else {
        return Err((StatusCode::UNAUTHORIZED, [("X-Auth-Required", "true")]).into_response());
    };

    req.extensions_mut().insert(AuthenticatedAdmin {
        account_id: info.account_id,
        role: info.role,
    });

    Ok(next.run(req).await)
}

/// Middleware that additionally requires the super-admin role
pub async fn require_super_admin<S>(
    state: AuthMiddlewareState<S>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, Response>
where
    S: SessionRepository + Send + Sync + 'static,
{
    let token =
        platform::cookie::extract_cookie(req.headers(), &state.config.session_cookie_name);

    let use_case = CheckSessionUseCase::new(state.repo.clone(), state.config.clone());

    let info = match token {
        Some(token) => use_case.execute(&token).await.ok(),
        None => None,
    };

    let Some(info) = info else {
        return Err((StatusCode::UNAUTHORIZED, [("X-Auth-Required", "true")]).into_response());
    };

    if !info.role.is_super_admin() {
        return Err(StatusCode::FORBIDDEN.into_response());
    }

    req.extensions_mut().insert(AuthenticatedAdmin {
        account_id: info.account_id,
        role: info.role,
    });

    Ok(next.run(req).await)
}
