//! Auth (Administrator Authentication) Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Business logic, entities, repository traits
//! - `application/` - Use cases and application services
//! - `infra/` - Database implementations, delivery adapters
//! - `presentation/` - HTTP handlers, DTOs, router
//!
//! ## Features
//! - Email + password first factor for provisioned admin accounts
//! - Mandatory second factor: TOTP (with in-band enrollment) or emailed OTP
//! - Server-side login flow continuations between factor steps
//! - Server-side sessions with HMAC-signed cookie tokens
//! - Automatic lockout with exponential backoff after failed attempts
//!
//! ## Security Model
//! - Passwords hashed with Argon2id (NIST SP 800-63B compliant)
//! - Unknown accounts and wrong passwords are indistinguishable to callers
//! - Lockout check happens before any credential comparison
//! - TOTP codes are single-use per time step (replay guard)
//! - Emailed OTP codes are single-use with a short TTL

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;


// Re-exports for convenience
pub use application::config::AuthConfig;
pub use error::{AuthError, AuthResult};
pub use infra::postgres::PgAuthRepository;
pub use presentation::router::auth_router;

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

// Convenience re-exports
pub mod config {
    pub use crate::application::config::*;
}

pub mod models {
    pub use crate::domain::entity::*;
    pub use crate::domain::value_object::*;
    pub use crate::presentation::dto::*;
}

pub mod handlers {
    pub use crate::presentation::handlers::*;
}

pub mod router {
    pub use crate::presentation::router::*;
}

pub mod middleware {
    pub use crate::presentation::middleware::*;
}
