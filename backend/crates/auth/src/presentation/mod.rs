//! Presentation Layer
//!
//! HTTP surface: DTOs, handlers, router, and session middleware.

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod router;

pub use handlers::AuthAppState;
pub use middleware::{AuthMiddlewareState, AuthenticatedAdmin};
pub use router::{auth_router, auth_router_generic};
