//! Entity Module

pub mod admin_account;
pub mod auth_session;
pub mod login_attempt;
pub mod login_flow;
pub mod otp_challenge;
