//! Error types for gateway interactions.
//!
//! The control-system gateway distinguishes setup failures (channel
//! connection, missing channels, monitor activation) from dispatch failures
//! (puts, interruption, timeout). Setup failures abort a session attempt
//! before any command is sent; dispatch failures are handled per device or
//! tear the session down, depending on the call site.

use std::time::Duration;
use thiserror::Error;

/// Failures surfaced by the device command gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Channel connection could not be established.
    #[error("channel connection failed: {0}")]
    Connection(String),

    /// The requested channel does not exist on the device.
    #[error("no such channel: {0}")]
    NoSuchChannel(String),

    /// A monitor subscription could not be activated.
    #[error("monitor activation failed: {0}")]
    Monitor(String),

    /// A command put to the device was rejected.
    #[error("channel put failed: {0}")]
    Put(String),

    /// Command dispatch was interrupted before completion.
    #[error("command dispatch interrupted")]
    Interrupted,

    /// Command dispatch did not complete within the configured timeout.
    #[error("command dispatch timed out after {0:?}")]
    Timeout(Duration),
}

impl GatewayError {
    /// True for failure classes that occur while wiring up a session
    /// (connection, channel lookup, monitor activation) rather than while
    /// dispatching a command.
    pub fn is_setup(&self) -> bool {
        matches!(
            self,
            GatewayError::Connection(_) | GatewayError::NoSuchChannel(_) | GatewayError::Monitor(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_setup_failures() {
        assert!(GatewayError::Connection("ws14".into()).is_setup());
        assert!(GatewayError::Monitor("ws14".into()).is_setup());
        assert!(!GatewayError::Put("ws14".into()).is_setup());
        assert!(!GatewayError::Timeout(Duration::from_secs(5)).is_setup());
    }
}
