//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Cryptographic utilities (token encoding, constant-time compare)
//! - Password hashing (Argon2id, NIST SP 800-63B compliant)
//! - Cookie management
//! - Client origin identification
//! - Lockout / rate limiting primitives

pub mod client;
pub mod cookie;
pub mod crypto;
pub mod password;
pub mod rate_limit;
