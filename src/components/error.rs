//! Custom component channel errors

use thiserror::Error;

/// Errors raised while handling frame traffic
///
/// Everything except [`ChannelError::ApiVersionMismatch`] is recoverable:
/// the offending message is logged and discarded.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChannelError {
    /// A guest sent a value or height before declaring readiness
    #[error("Received {0} before the component was ready")]
    NotReady(&'static str),

    /// A required payload field is absent
    #[error("Message is missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Unrecognized message type: {0}")]
    UnknownMessageType(String),

    #[error("Unsupported value: {0}")]
    UnsupportedValue(String),

    /// The guest speaks a protocol version the host does not
    #[error("Unrecognized component API version: '{actual}' (expected {expected})")]
    ApiVersionMismatch { expected: u32, actual: u32 },

    #[error("Invalid component source: {0}")]
    InvalidComponentSource(String),

    /// The receiving end of the frame channel is gone
    #[error("Frame channel closed")]
    ChannelClosed,
}

impl ChannelError {
    /// True when the instance can no longer be used
    pub fn is_fatal(&self) -> bool {
        matches!(self, ChannelError::ApiVersionMismatch { .. })
    }
}
