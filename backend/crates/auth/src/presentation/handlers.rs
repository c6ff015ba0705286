//! HTTP Handlers

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use std::sync::Arc;
use uuid::Uuid;

use platform::client::ClientOrigin;
use platform::cookie::CookieConfig;

use crate::application::config::AuthConfig;
use crate::application::{
    BeginLoginInput, BeginLoginOutput, BeginLoginUseCase, CheckSessionUseCase, ResendOtpInput,
    ResendOtpUseCase, SignOutUseCase, SubmitCodeInput, SubmitCodeUseCase,
};
use crate::domain::repository::{
    AccountRepository, AttemptRepository, CodeDelivery, LoginFlowRepository,
    OtpChallengeRepository, SessionRepository,
};
use crate::error::{AuthError, AuthResult};
use crate::presentation::dto::{
    LoginRequest, LoginResponse, ResendOtpRequest, ResendOtpResponse, SessionStatusResponse,
    SubmitCodeRequest, SubmitCodeResponse, TotpProvisioning,
};
use kernel::id::LoginFlowId;

/// Shared state for auth handlers
pub struct AuthAppState<R, D>
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
    pub repo: Arc<R>,
    pub delivery: Arc<D>,
    pub config: Arc<AuthConfig>,
}

impl<R, D> Clone for AuthAppState<R, D>
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
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            delivery: self.delivery.clone(),
            config: self.config.clone(),
        }
    }
}

// ============================================================================
// Login (first factor)
// ============================================================================

/// POST /api/auth/login
pub async fn login<R, D>(
    State(state): State<AuthAppState<R, D>>,
    headers: HeaderMap,
    axum::extract::ConnectInfo(addr): axum::extract::ConnectInfo<std::net::SocketAddr>,
    Json(req): Json<LoginRequest>,
) -> AuthResult<Json<LoginResponse>>
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
    let origin = ClientOrigin::resolve(&headers, Some(addr.ip()));

    let use_case = BeginLoginUseCase::new(
        state.repo.clone(),
        state.repo.clone(),
        state.repo.clone(),
        state.repo.clone(),
        state.delivery.clone(),
        state.config.clone(),
    );

    let input = BeginLoginInput {
        email: req.email,
        password: req.password,
    };

    let output = use_case.execute(input, origin).await?;

    let response = match output {
        BeginLoginOutput::AwaitingTotpCode { flow_id } => LoginResponse {
            state: "awaiting_totp_code".to_string(),
            flow_id: flow_id.to_string(),
            provisioning: None,
            masked_email: None,
        },
        BeginLoginOutput::AwaitingTotpEnrollment {
            flow_id,
            secret_base32,
            otpauth_url,
            qr_code_base64,
        } => LoginResponse {
            state: "awaiting_totp_enrollment".to_string(),
            flow_id: flow_id.to_string(),
            provisioning: Some(TotpProvisioning {
                secret: secret_base32,
                otpauth_url,
                qr_code: qr_code_base64,
            }),
            masked_email: None,
        },
        BeginLoginOutput::AwaitingOtpCode {
            flow_id,
            masked_email,
        } => LoginResponse {
            state: "awaiting_otp_code".to_string(),
            flow_id: flow_id.to_string(),
            provisioning: None,
            masked_email: Some(masked_email),
        },
    };

    Ok(Json(response))
}

// ============================================================================
// Code submission (second factor)
// ============================================================================

/// POST /api/auth/code
pub async fn submit_code<R, D>(
    State(state): State<AuthAppState<R, D>>,
    headers: HeaderMap,
    axum::extract::ConnectInfo(addr): axum::extract::ConnectInfo<std::net::SocketAddr>,
    Json(req): Json<SubmitCodeRequest>,
) -> AuthResult<impl IntoResponse>
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
    let origin = ClientOrigin::resolve(&headers, Some(addr.ip()));
    let flow_id = parse_flow_id(&req.flow_id)?;

    let use_case = SubmitCodeUseCase::new(
        state.repo.clone(),
        state.repo.clone(),
        state.repo.clone(),
        state.repo.clone(),
        state.repo.clone(),
        state.config.clone(),
    );

    let input = SubmitCodeInput {
        flow_id,
        code: req.code,
    };

    let output = use_case.execute(input, origin).await?;

    let cookie = session_cookie_config(&state.config).build_set_cookie(&output.session_token);

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(SubmitCodeResponse {
            role: output.role.code().to_string(),
            expires_at_ms: output.expires_at_ms,
        }),
    ))
}

// ============================================================================
// One-time code resend
// ============================================================================

/// POST /api/auth/otp/resend
pub async fn resend_otp<R, D>(
    State(state): State<AuthAppState<R, D>>,
    headers: HeaderMap,
    axum::extract::ConnectInfo(addr): axum::extract::ConnectInfo<std::net::SocketAddr>,
    Json(req): Json<ResendOtpRequest>,
) -> AuthResult<Json<ResendOtpResponse>>
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
    let origin = ClientOrigin::resolve(&headers, Some(addr.ip()));
    let flow_id = parse_flow_id(&req.flow_id)?;

    let use_case = ResendOtpUseCase::new(
        state.repo.clone(),
        state.repo.clone(),
        state.repo.clone(),
        state.repo.clone(),
        state.delivery.clone(),
        state.config.clone(),
    );

    let output = use_case.execute(ResendOtpInput { flow_id }, origin).await?;

    Ok(Json(ResendOtpResponse {
        masked_email: output.masked_email,
    }))
}

// ============================================================================
// Logout
// ============================================================================

/// POST /api/auth/logout
pub async fn logout<R, D>(
    State(state): State<AuthAppState<R, D>>,
    headers: HeaderMap,
) -> AuthResult<impl IntoResponse>
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
    let token = extract_session_cookie(&headers, &state.config.session_cookie_name);

    if let Some(token) = token {
        let use_case = SignOutUseCase::new(state.repo.clone(), state.config.clone());
        // Revocation failure still clears the cookie
        let _ = use_case.execute(&token).await;
    }

    let cookie = session_cookie_config(&state.config).build_delete_cookie();

    Ok((StatusCode::NO_CONTENT, [(header::SET_COOKIE, cookie)]))
}

// ============================================================================
// Session Status
// ============================================================================

/// GET /api/auth/status
pub async fn session_status<R, D>(
    State(state): State<AuthAppState<R, D>>,
    headers: HeaderMap,
) -> AuthResult<Json<SessionStatusResponse>>
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
    let token = extract_session_cookie(&headers, &state.config.session_cookie_name);

    let use_case = CheckSessionUseCase::new(state.repo.clone(), state.config.clone());

    let session_info = if let Some(token) = token {
        use_case.execute(&token).await.ok()
    } else {
        None
    };

    match session_info {
        Some(info) => Ok(Json(SessionStatusResponse {
            authenticated: true,
            account_id: Some(info.account_id.to_string()),
            role: Some(info.role.code().to_string()),
            expires_at_ms: Some(info.expires_at_ms),
        })),
        None => Ok(Json(SessionStatusResponse {
            authenticated: false,
            account_id: None,
            role: None,
            expires_at_ms: None,
        })),
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn parse_flow_id(raw: &str) -> AuthResult<LoginFlowId> {
    Uuid::parse_str(raw)
        .map(LoginFlowId::from_uuid)
        .map_err(|_| AuthError::FlowInvalid)
}

fn extract_session_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    platform::cookie::extract_cookie(headers, name)
}

fn session_cookie_config(config: &AuthConfig) -> CookieConfig {
    CookieConfig {
        name: config.session_cookie_name.clone(),
        secure: config.cookie_secure,
        http_only: true,
        same_site: config.cookie_same_site,
        path: "/".to_string(),
        max_age_secs: Some(config.session_ttl.as_secs() as i64),
    }
}
