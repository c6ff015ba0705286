//! API DTOs (Data Transfer Objects)

use serde::{Deserialize, Serialize};

// ============================================================================
// Login (first factor)
// ============================================================================

/// Login request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response: the second-factor step the client must complete next
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// "awaiting_totp_code" | "awaiting_totp_enrollment" | "awaiting_otp_code"
    pub state: String,
    /// Opaque continuation id, echoed back on code submission
    pub flow_id: String,
    /// Present only in the enrollment state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning: Option<TotpProvisioning>,
    /// Present only in the email-code state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub masked_email: Option<String>,
}

/// Authenticator provisioning payload, shown exactly once
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TotpProvisioning {
    /// Secret for manual entry
    pub secret: String,
    /// otpauth:// URL
    pub otpauth_url: String,
    /// QR code as base64-encoded PNG
    pub qr_code: String,
}

// ============================================================================
// Code submission (second factor)
// ============================================================================

/// Code submission request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitCodeRequest {
    pub flow_id: String,
    pub code: String,
}

/// Code submission response; the session token travels in the cookie
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitCodeResponse {
    pub role: String,
    pub expires_at_ms: i64,
}

// ============================================================================
// One-time code resend
// ============================================================================

/// Resend request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResendOtpRequest {
    pub flow_id: String,
}

/// Resend response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResendOtpResponse {
    pub masked_email: String,
}

// ============================================================================
// Session Status
// ============================================================================

/// Session status response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusResponse {
    pub authenticated: bool,
    pub account_id: Option<String>,
    pub role: Option<String>,
    pub expires_at_ms: Option<i64>,
}
