//! Outbound message envelope.
//!
//! An [`Outbound`] is what handlers build: a kind and a payload. The send path
//! turns it into an [`Envelope`] by attaching the next sequence number, then
//! encodes it to JSON.
//!
//! # Invariants
//!
//! - An envelope is immutable once built; the sequence number is fixed at
//!   send time and never reused within a session.
//! - `type` is always one of the [`OutboundKind`] names.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::errors::Result;

/// Outbound message types understood by the viewhost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutboundKind {
    /// Scale factor and viewport size in viewhost units
    Scaling,
    /// Document background (color or gradient)
    Background,
    /// Screen lock state changed
    ScreenLock,
    /// Whether the document supports resizing
    SupportsResizing,
    /// Full component hierarchy
    Hierarchy,
    /// Full component hierarchy sent with blocking acknowledgement
    ReHierarchy,
    /// Incremental dirty-property diff
    Dirty,
    /// Engine event forwarded to the viewhost
    Event,
    /// Engine terminated a previously forwarded event
    EventTerminate,
    /// Error string
    Error,
    /// Rendering options derived from the document version
    RenderingOptions,
    /// Acknowledges an `ensureLayout` request
    EnsureLayout,
    /// Extension event for the viewhost
    Extension,
    /// Reply to `handleKeyboard`
    HandleKeyboard,
    /// Reply to `getFocusableAreas`
    GetFocusableAreas,
    /// Reply to `getFocused`
    GetFocused,
    /// Reply to `getVisualContext`
    GetVisualContext,
    /// Reply to `getDataSourceContext`
    GetDataSourceContext,
    /// Reply to `isCharacterValid`
    IsCharacterValid,
}

impl OutboundKind {
    /// Wire name of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scaling => "scaling",
            Self::Background => "background",
            Self::ScreenLock => "screenLock",
            Self::SupportsResizing => "supportsResizing",
            Self::Hierarchy => "hierarchy",
            Self::ReHierarchy => "reHierarchy",
            Self::Dirty => "dirty",
            Self::Event => "event",
            Self::EventTerminate => "eventTerminate",
            Self::Error => "error",
            Self::RenderingOptions => "renderingOptions",
            Self::EnsureLayout => "ensureLayout",
            Self::Extension => "extension",
            Self::HandleKeyboard => "handleKeyboard",
            Self::GetFocusableAreas => "getFocusableAreas",
            Self::GetFocused => "getFocused",
            Self::GetVisualContext => "getVisualContext",
            Self::GetDataSourceContext => "getDataSourceContext",
            Self::IsCharacterValid => "isCharacterValid",
        }
    }
}

impl std::fmt::Display for OutboundKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unsequenced outbound message.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    /// Message type
    pub kind: OutboundKind,
    /// Message payload
    pub payload: Value,
}

impl Outbound {
    /// Create a message with an arbitrary payload.
    pub fn new(kind: OutboundKind, payload: Value) -> Self {
        Self { kind, payload }
    }

    /// `error` message with a string payload.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(OutboundKind::Error, Value::String(message.into()))
    }

    /// `scaling` message.
    pub fn scaling(scale_factor: f64, viewport_width: f64, viewport_height: f64) -> Self {
        Self::new(
            OutboundKind::Scaling,
            json!({
                "scaleFactor": scale_factor,
                "viewportWidth": viewport_width,
                "viewportHeight": viewport_height,
            }),
        )
    }

    /// `screenLock` message.
    pub fn screen_lock(locked: bool) -> Self {
        Self::new(OutboundKind::ScreenLock, json!({ "screenLock": locked }))
    }

    /// `supportsResizing` message.
    pub fn supports_resizing(supports: bool) -> Self {
        Self::new(OutboundKind::SupportsResizing, json!({ "supportsResizing": supports }))
    }

    /// `renderingOptions` message.
    ///
    /// Documents declaring version `1.0` use legacy karaoke highlighting.
    pub fn rendering_options(document_version: &str) -> Self {
        Self::new(
            OutboundKind::RenderingOptions,
            json!({
                "legacyKaraoke": document_version == "1.0",
                "documentAplVersion": document_version,
            }),
        )
    }

    /// `eventTerminate` message for a forwarded event.
    pub fn event_terminate(token: u32) -> Self {
        Self::new(OutboundKind::EventTerminate, json!({ "token": token }))
    }

    /// Attach a sequence number.
    pub fn sequenced(self, seqno: u32) -> Envelope {
        Envelope { kind: self.kind, seqno, payload: self.payload }
    }
}

/// Sequenced outbound message, the wire unit sent to the viewhost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Message type
    #[serde(rename = "type")]
    pub kind: OutboundKind,
    /// Sequence number, monotonic per session, starting at 1
    pub seqno: u32,
    /// Message payload
    pub payload: Value,
}

impl Envelope {
    /// Encode to a JSON string.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from a JSON string.
    pub fn decode(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Extract the `seqno` member of a raw inbound message.
///
/// Returns `Ok(None)` when the message has no numeric `seqno` that fits in a
/// `u32`. Fails only when `raw` is not JSON.
pub fn reply_seqno(raw: &str) -> Result<Option<u32>> {
    let value: Value = serde_json::from_str(raw)?;
    Ok(value
        .get("seqno")
        .and_then(Value::as_u64)
        .and_then(|seqno| u32::try_from(seqno).ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_serializes_to_wire_name() {
        for kind in [
            OutboundKind::Scaling,
            OutboundKind::ScreenLock,
            OutboundKind::ReHierarchy,
            OutboundKind::EventTerminate,
            OutboundKind::GetDataSourceContext,
            OutboundKind::IsCharacterValid,
        ] {
            let encoded = serde_json::to_value(kind).expect("kind serializes");
            assert_eq!(encoded, Value::String(kind.as_str().to_string()));
        }
    }

    #[test]
    fn envelope_layout() {
        let envelope = Outbound::error("No content to build").sequenced(7);
        let value: Value =
            serde_json::from_str(&envelope.encode().expect("encodes")).expect("valid json");

        assert_eq!(value["type"], "error");
        assert_eq!(value["seqno"], 7);
        assert_eq!(value["payload"], "No content to build");
    }

    #[test]
    fn legacy_karaoke_only_for_first_version() {
        assert_eq!(Outbound::rendering_options("1.0").payload["legacyKaraoke"], true);
        assert_eq!(Outbound::rendering_options("1.1").payload["legacyKaraoke"], false);
        assert_eq!(Outbound::rendering_options("2023.1").payload["documentAplVersion"], "2023.1");
    }

    #[test]
    fn reply_seqno_requires_number() {
        assert_eq!(reply_seqno(r#"{"seqno": 4, "payload": {}}"#).expect("json"), Some(4));
        assert_eq!(reply_seqno(r#"{"seqno": "4"}"#).expect("json"), None);
        assert_eq!(reply_seqno(r#"{"type": "build"}"#).expect("json"), None);
        assert!(reply_seqno("{").is_err());
    }
}
