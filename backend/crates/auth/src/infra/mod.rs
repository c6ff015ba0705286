//! Infrastructure Layer
//!
//! Repository implementations and outbound adapters.

pub mod delivery;
pub mod memory;
pub mod postgres;

pub use delivery::{RecordingCodeDelivery, TracingCodeDelivery};
pub use memory::MemoryAuthRepository;
pub use postgres::PgAuthRepository;
