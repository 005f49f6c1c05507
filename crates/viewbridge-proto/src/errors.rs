//! Protocol error types.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while decoding or encoding wire messages.
///
/// Every variant is recoverable: the caller logs it and drops the offending
/// message. None of them leave shared state half-updated.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Message is not valid JSON.
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    /// Message is not a JSON object.
    #[error("message is not an object")]
    NotAnObject,

    /// Message has no `type` member (or it is not a string).
    #[error("unable to find type in message")]
    MissingType,

    /// Message has no `payload` member.
    #[error("unable to find payload in message")]
    MissingPayload,

    /// Message type is not part of the dispatch table.
    #[error("unrecognized message type: {0}")]
    UnknownType(String),

    /// Payload does not match the shape required by its message type.
    #[error("invalid {kind} payload: {source}")]
    InvalidPayload {
        /// Message type the payload belongs to
        kind: &'static str,
        /// Underlying decode failure
        #[source]
        source: serde_json::Error,
    },

    /// Payload field has the wrong type.
    #[error("invalid {kind} payload: {reason}")]
    InvalidField {
        /// Message type the payload belongs to
        kind: &'static str,
        /// What was wrong
        reason: &'static str,
    },

    /// Unknown viewport shape name.
    #[error("unknown viewport shape: {0}")]
    UnknownShape(String),

    /// Unknown viewport mode name.
    #[error("unknown viewport mode: {0}")]
    UnknownMode(String),
}

impl ProtocolError {
    /// Wrap a payload decode failure for message type `kind`.
    pub fn payload(kind: &'static str, source: serde_json::Error) -> Self {
        Self::InvalidPayload { kind, source }
    }
}
