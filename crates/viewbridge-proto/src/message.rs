//! Inbound message decoding.
//!
//! The viewhost sends `{type, payload}` objects. [`InboundMessage::parse`]
//! resolves the type string once and decodes the payload into the variant's
//! typed form, so handlers never look at raw JSON keys.
//!
//! # Invariants
//!
//! - Each wire type string maps to exactly one variant, and
//!   [`InboundMessage::kind`] returns that string back.
//! - Decoding never panics: malformed JSON, a missing `type` or `payload`, an
//!   unknown type, or a payload of the wrong shape all produce a
//!   [`ProtocolError`].

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    errors::{ProtocolError, Result},
    payloads::{
        QueryRequest,
        build::BuildRequest,
        component::{ComponentTarget, ComponentUpdate, GraphicUpdate, ScrollToRect},
        config::ConfigurationChange,
        event::EventResponse,
        extension::ExtensionMessage,
        input::{CharacterValidRequest, CursorPosition, KeyboardRequest, PointerEventRequest, SetFocus},
        media::{MediaLoadFailed, MediaLoaded, MediaUpdate, PlayerCallback, PlayerCallbackKind},
    },
};

/// Every message the viewhost can send.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Inflate the current content
    Build(Box<BuildRequest>),
    /// Runtime configuration change
    ConfigurationChange(ConfigurationChange),
    /// Display state code (0 hidden, 1 background, 2 foreground)
    UpdateDisplayState(i64),
    /// Component value update
    Update(ComponentUpdate),
    /// Video component state update
    UpdateMedia(MediaUpdate),
    /// Vector graphic source update
    UpdateGraphic(GraphicUpdate),
    /// Response to a forwarded event
    Response(EventResponse),
    /// Ensure a component is laid out
    EnsureLayout(ComponentTarget),
    /// Scroll a rectangle of a component into view
    ScrollToRectInComponent(ScrollToRect),
    /// Keyboard input
    HandleKeyboard(KeyboardRequest),
    /// Query focusable areas
    GetFocusableAreas(QueryRequest),
    /// Query focused component
    GetFocused(QueryRequest),
    /// Query visual context
    GetVisualContext(QueryRequest),
    /// Query data source context
    GetDataSourceContext(QueryRequest),
    /// Move focus
    SetFocus(SetFocus),
    /// Cursor moved
    UpdateCursorPosition(CursorPosition),
    /// Pointer input
    HandlePointerEvent(PointerEventRequest),
    /// Validate a character for an edit text
    IsCharacterValid(CharacterValidRequest),
    /// Re-run structural layout
    ReInflate,
    /// Re-send the hierarchy and wait for acknowledgement
    ReHierarchy,
    /// Invoke an extension event handler
    Extension(ExtensionMessage),
    /// Media finished loading
    MediaLoaded(MediaLoaded),
    /// Media failed to load
    MediaLoadFailed(MediaLoadFailed),
    /// Callback for an engine-owned audio or media player
    Player(PlayerCallback),
}

impl InboundMessage {
    /// Decode a raw inbound message.
    pub fn parse(raw: &str) -> Result<Self> {
        let doc: Value = serde_json::from_str(raw)?;
        let Value::Object(mut doc) = doc else {
            return Err(ProtocolError::NotAnObject);
        };
        let kind = match doc.get("type") {
            Some(Value::String(kind)) => kind.clone(),
            _ => return Err(ProtocolError::MissingType),
        };
        let payload = doc.remove("payload").ok_or(ProtocolError::MissingPayload)?;
        Self::from_parts(&kind, payload)
    }

    /// Decode from an already split type and payload.
    pub fn from_parts(kind: &str, payload: Value) -> Result<Self> {
        let message = match kind {
            "build" => Self::Build(Box::new(typed("build", payload)?)),
            "configurationChange" => {
                Self::ConfigurationChange(ConfigurationChange::from_value(&payload))
            },
            "updateDisplayState" => Self::UpdateDisplayState(payload.as_i64().ok_or(
                ProtocolError::InvalidField {
                    kind: "updateDisplayState",
                    reason: "state is not an integer",
                },
            )?),
            "update" => Self::Update(typed("update", payload)?),
            "updateMedia" => Self::UpdateMedia(MediaUpdate::from_value(&payload).ok_or(
                ProtocolError::InvalidField { kind: "updateMedia", reason: "missing id" },
            )?),
            "updateGraphic" => Self::UpdateGraphic(typed("updateGraphic", payload)?),
            "response" => Self::Response(EventResponse::from_value(&payload)),
            "ensureLayout" => Self::EnsureLayout(typed("ensureLayout", payload)?),
            "scrollToRectInComponent" => {
                Self::ScrollToRectInComponent(typed("scrollToRectInComponent", payload)?)
            },
            "handleKeyboard" => Self::HandleKeyboard(typed("handleKeyboard", payload)?),
            "getFocusableAreas" => Self::GetFocusableAreas(typed("getFocusableAreas", payload)?),
            "getFocused" => Self::GetFocused(typed("getFocused", payload)?),
            "getVisualContext" => Self::GetVisualContext(typed("getVisualContext", payload)?),
            "getDataSourceContext" => {
                Self::GetDataSourceContext(typed("getDataSourceContext", payload)?)
            },
            "setFocus" => Self::SetFocus(typed("setFocus", payload)?),
            "updateCursorPosition" => {
                Self::UpdateCursorPosition(typed("updateCursorPosition", payload)?)
            },
            "handlePointerEvent" => Self::HandlePointerEvent(typed("handlePointerEvent", payload)?),
            "isCharacterValid" => Self::IsCharacterValid(typed("isCharacterValid", payload)?),
            "reInflate" => Self::ReInflate,
            "reHierarchy" => Self::ReHierarchy,
            "extension" => Self::Extension(typed("extension", payload)?),
            "mediaLoaded" => Self::MediaLoaded(typed("mediaLoaded", payload)?),
            "mediaLoadFailed" => Self::MediaLoadFailed(typed("mediaLoadFailed", payload)?),
            "audioPlayerCallback" => player(PlayerCallbackKind::AudioEvent, &payload)?,
            "speechMarkCallback" => player(PlayerCallbackKind::SpeechMarks, &payload)?,
            "mediaPlayerUpdateMediaState" => {
                player(PlayerCallbackKind::MediaUpdateState, &payload)?
            },
            "mediaPlayerDoCallback" => player(PlayerCallbackKind::MediaDoCallback, &payload)?,
            other => return Err(ProtocolError::UnknownType(other.to_string())),
        };
        Ok(message)
    }

    /// Wire type string of this message.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Build(_) => "build",
            Self::ConfigurationChange(_) => "configurationChange",
            Self::UpdateDisplayState(_) => "updateDisplayState",
            Self::Update(_) => "update",
            Self::UpdateMedia(_) => "updateMedia",
            Self::UpdateGraphic(_) => "updateGraphic",
            Self::Response(_) => "response",
            Self::EnsureLayout(_) => "ensureLayout",
            Self::ScrollToRectInComponent(_) => "scrollToRectInComponent",
            Self::HandleKeyboard(_) => "handleKeyboard",
            Self::GetFocusableAreas(_) => "getFocusableAreas",
            Self::GetFocused(_) => "getFocused",
            Self::GetVisualContext(_) => "getVisualContext",
            Self::GetDataSourceContext(_) => "getDataSourceContext",
            Self::SetFocus(_) => "setFocus",
            Self::UpdateCursorPosition(_) => "updateCursorPosition",
            Self::HandlePointerEvent(_) => "handlePointerEvent",
            Self::IsCharacterValid(_) => "isCharacterValid",
            Self::ReInflate => "reInflate",
            Self::ReHierarchy => "reHierarchy",
            Self::Extension(_) => "extension",
            Self::MediaLoaded(_) => "mediaLoaded",
            Self::MediaLoadFailed(_) => "mediaLoadFailed",
            Self::Player(cb) => match cb.kind {
                PlayerCallbackKind::AudioEvent => "audioPlayerCallback",
                PlayerCallbackKind::SpeechMarks => "speechMarkCallback",
                PlayerCallbackKind::MediaUpdateState => "mediaPlayerUpdateMediaState",
                PlayerCallbackKind::MediaDoCallback => "mediaPlayerDoCallback",
            },
        }
    }
}

fn typed<T: DeserializeOwned>(kind: &'static str, payload: Value) -> Result<T> {
    serde_json::from_value(payload).map_err(|source| ProtocolError::payload(kind, source))
}

fn player(kind: PlayerCallbackKind, payload: &Value) -> Result<InboundMessage> {
    PlayerCallback::from_value(kind, payload)
        .map(InboundMessage::Player)
        .ok_or(ProtocolError::InvalidField { kind: "playerCallback", reason: "missing playerId" })
}
