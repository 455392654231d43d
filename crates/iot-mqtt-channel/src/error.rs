//! MQTT channel error types.

use thiserror::Error;

/// Errors that can occur during MQTT operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MqttError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("publish error: {0}")]
    Publish(String),

    #[error("subscribe error: {0}")]
    Subscribe(String),

    #[error("unsubscribe error: {0}")]
    Unsubscribe(String),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// A required request field was empty. Raised before any I/O.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Convenience alias for MQTT results.
pub type MqttResult<T> = Result<T, MqttError>;

/// Fail with `InvalidRequest` when a required topic parameter is empty.
pub(crate) fn require(field: &str, value: &str) -> MqttResult<()> {
    if value.is_empty() {
        return Err(MqttError::InvalidRequest(format!("{field} is required")));
    }
    Ok(())
}
