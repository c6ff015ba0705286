//! Value Object Module

pub mod admin_role;
pub mod email;
pub mod second_factor;
pub mod totp_secret;
