//! Code Delivery Adapters
//!
//! Outbound channel implementations. The real mail channel lives outside
//! this crate; development wires the tracing adapter, tests the recording
//! one.

use std::sync::Mutex;

use crate::domain::repository::{CodeDelivery, DeliveryError};
use crate::domain::value_object::email::Email;

/// Logs the delivery instead of sending it. Development only; the code
/// itself is never logged.
#[derive(Default)]
pub struct TracingCodeDelivery;

impl CodeDelivery for TracingCodeDelivery {
    async fn send(&self, email: &Email, _code: &str) -> Result<(), DeliveryError> {
        tracing::info!(recipient = %email.masked(), "One-time code dispatched");
        Ok(())
    }
}

/// Captures every delivery for test assertions
#[derive(Default)]
pub struct RecordingCodeDelivery {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingCodeDelivery {
    pub fn new() -> Self {
        Self::default()
    }

    /// All (recipient, code) pairs delivered so far
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Most recently delivered code, if any
    pub fn last_code(&self) -> Option<String> {
        self.sent
            .lock()
            .ok()
            .and_then(|s| s.last().map(|(_, code)| code.clone()))
    }
}

impl CodeDelivery for RecordingCodeDelivery {
    async fn send(&self, email: &Email, code: &str) -> Result<(), DeliveryError> {
        self.sent
            .lock()
            .map_err(|_| DeliveryError("Recording lock poisoned".to_string()))?
            .push((email.as_str().to_string(), code.to_string()));
        Ok(())
    }
}

/// Always fails; exercises the delivery error path in tests
#[cfg(test)]
#[derive(Default)]
pub struct FailingCodeDelivery;

#[cfg(test)]
impl CodeDelivery for FailingCodeDelivery {
    async fn send(&self, _email: &Email, _code: &str) -> Result<(), DeliveryError> {
        Err(DeliveryError("Mail channel unavailable".to_string()))
    }
}
