//! Auth Router

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

use crate::application::config::AuthConfig;
use crate::domain::repository::{
    AccountRepository, AttemptRepository, CodeDelivery, LoginFlowRepository,
    OtpChallengeRepository, SessionRepository,
};
use crate::infra::delivery::TracingCodeDelivery;
use crate::infra::postgres::PgAuthRepository;
use crate::presentation::handlers::{self, AuthAppState};

/// Create the Auth router with the PostgreSQL repository and the
/// development delivery channel
pub fn auth_router(repo: PgAuthRepository, config: AuthConfig) -> Router {
    auth_router_generic(repo, TracingCodeDelivery, config)
}

/// Create the Auth router for any repository and delivery implementation
pub fn auth_router_generic<R, D>(repo: R, delivery: D, config: AuthConfig) -> Router
where
    R: AccountRepository
        + AttemptRepository
        + OtpChallengeRepository
        + LoginFlowRepository
        + SessionRepository
        + Send
        + Sync
        + 'static,
    D: CodeDelivery + Send + Sync + 'static,
{
    let state = AuthAppState {
        repo: Arc::new(repo),
        delivery: Arc::new(delivery),
        config: Arc::new(config),
    };

    Router::new()
        .route("/login", post(handlers::login::<R, D>))
        .route("/code", post(handlers::submit_code::<R, D>))
        .route("/otp/resend", post(handlers::resend_otp::<R, D>))
        .route("/logout", post(handlers::logout::<R, D>))
        .route("/status", get(handlers::session_status::<R, D>))
        .with_state(state)
}
