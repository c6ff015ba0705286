//! Domain Layer
//!
//! Contains entities, value objects, and repository traits.

pub mod entity;
pub mod repository;
pub mod value_object;

// Re-exports
pub use entity::{
    admin_account::AdminAccount, auth_session::AuthSession, login_flow::LoginFlow,
    otp_challenge::OtpChallenge,
};
pub use repository::{
    AccountRepository, AttemptRepository, CodeDelivery, LoginFlowRepository,
    OtpChallengeRepository, SessionRepository,
};
