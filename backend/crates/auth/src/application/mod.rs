//! Application Layer
//!
//! Use cases and application services.

pub mod begin_login;
pub mod check_session;
pub mod config;
pub mod resend_otp;
pub mod session;
pub mod sign_out;
pub mod submit_code;

// Re-exports
pub use begin_login::{BeginLoginInput, BeginLoginOutput, BeginLoginUseCase};
pub use check_session::{CheckSessionUseCase, SessionInfoOutput};
pub use config::AuthConfig;
pub use resend_otp::{ResendOtpInput, ResendOtpOutput, ResendOtpUseCase};
pub use sign_out::SignOutUseCase;
pub use submit_code::{SubmitCodeInput, SubmitCodeOutput, SubmitCodeUseCase};
