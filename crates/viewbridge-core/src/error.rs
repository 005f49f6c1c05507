//! Error types for the bridge core.
//!
//! Handlers return [`BridgeError`]; the dispatch boundary in
//! [`crate::ConnectionManager`] logs every error and, when
//! [`BridgeError::viewhost_message`] returns a string, sends it to the
//! viewhost as an `error` message. No error escapes the manager.

use thiserror::Error;

/// Errors raised while loading imported packages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PackageError {
    /// A download returned no content
    #[error("could not retrieve package {name} {version} from {url}")]
    EmptyContent {
        /// Package name
        name: String,
        /// Package version
        version: String,
        /// Resolved source url
        url: String,
    },

    /// Content reported an error state after packages were added
    #[error("content is in an error state")]
    ContentError,

    /// Content is waiting but requests no packages
    #[error("content is waiting but requested no packages")]
    Stalled,

    /// Worker pool could not be created
    #[error("download pool unavailable: {0}")]
    Pool(String),
}

/// Errors raised by message handlers and lifecycle operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// Operation requires an inflated document and there is none
    #[error("{operation}: root context is missing")]
    MissingSession {
        /// Operation that was attempted
        operation: &'static str,
    },

    /// Inbound message could not be decoded
    #[error("malformed {kind} message: {reason}")]
    Malformed {
        /// Message type, or `unknown` when the type could not be read
        kind: String,
        /// Decoder error
        reason: String,
    },

    /// No component with this id in the current document
    #[error("unable to find component with id: {id}")]
    UnknownComponent {
        /// Requested component id
        id: String,
    },

    /// `response` payload without an integer event token
    #[error("invalid event response")]
    InvalidEventResponse,

    /// Display state code outside 0..=2
    #[error("valid state not found: {0}")]
    InvalidDisplayState(i64),

    /// `updateMedia` missing its state or origin flag
    #[error("media state update is missing parameters")]
    MediaState,

    /// Required payload field missing
    #[error("payload does not contain {0}")]
    MissingField(&'static str),

    /// Build requested without content
    #[error("no content to build")]
    NoContent,

    /// Package loading failed during build
    #[error("content failed to prepare: {0}")]
    ContentPrepare(#[source] PackageError),

    /// Package loading failed during reinflate
    #[error("content failed to reload: {0}")]
    ContentReload(#[source] PackageError),

    /// Required extensions did not load
    #[error("required extensions have not loaded")]
    ExtensionsNotLoaded,

    /// Engine refused to inflate the document for every candidate viewport
    #[error("unable to inflate document")]
    InflationFailed,

    /// Blocking send timed out
    #[error("no response to message {seqno}")]
    NoReply {
        /// Sequence number of the unanswered message
        seqno: u32,
    },
}

impl BridgeError {
    /// Returns true if this error is transient and may succeed on retry.
    ///
    /// A missing reply or missing session is expected while a document is
    /// being torn down. Everything else indicates a bad request or a broken
    /// document.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::NoReply { .. } | Self::MissingSession { .. })
    }

    /// Error string reported to the viewhost, if this error is reported.
    pub fn viewhost_message(&self) -> Option<String> {
        let message = match self {
            Self::UnknownComponent { .. } => "Unable to find component".to_string(),
            Self::InvalidEventResponse => "Invalid event response".to_string(),
            Self::MediaState => "Can't update media state.".to_string(),
            Self::MissingField(field) => format!("Payload does not contain {field}"),
            Self::NoContent => "No content to build".to_string(),
            Self::ContentPrepare(_) => "Content failed to prepare".to_string(),
            Self::ContentReload(_) => "Content failed to reload".to_string(),
            Self::ExtensionsNotLoaded => "Required extensions have not loaded".to_string(),
            Self::InflationFailed => "Unable to inflate document".to_string(),
            Self::MissingSession { .. }
            | Self::Malformed { .. }
            | Self::InvalidDisplayState(_)
            | Self::NoReply { .. } => return None,
        };
        Some(message)
    }
}

impl From<viewbridge_proto::ProtocolError> for BridgeError {
    fn from(err: viewbridge_proto::ProtocolError) -> Self {
        let kind = match &err {
            viewbridge_proto::ProtocolError::InvalidPayload { kind, .. }
            | viewbridge_proto::ProtocolError::InvalidField { kind, .. } => (*kind).to_string(),
            viewbridge_proto::ProtocolError::UnknownType(kind) => kind.clone(),
            _ => "unknown".to_string(),
        };
        Self::Malformed { kind, reason: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn teardown_errors_are_transient() {
        assert!(BridgeError::NoReply { seqno: 3 }.is_transient());
        assert!(BridgeError::MissingSession { operation: "update" }.is_transient());
        assert!(!BridgeError::InflationFailed.is_transient());
        assert!(!BridgeError::UnknownComponent { id: "a".into() }.is_transient());
    }

    #[test]
    fn viewhost_strings() {
        assert_eq!(
            BridgeError::MissingField("componentId").viewhost_message().as_deref(),
            Some("Payload does not contain componentId")
        );
        assert_eq!(
            BridgeError::ContentPrepare(PackageError::Stalled).viewhost_message().as_deref(),
            Some("Content failed to prepare")
        );
        assert!(BridgeError::InvalidDisplayState(7).viewhost_message().is_none());
        assert!(BridgeError::MissingSession { operation: "x" }.viewhost_message().is_none());
    }

    #[test]
    fn protocol_errors_keep_message_kind() {
        let err: BridgeError = viewbridge_proto::ProtocolError::UnknownType("teleport".into()).into();
        assert!(matches!(err, BridgeError::Malformed { ref kind, .. } if kind == "teleport"));
    }
}
