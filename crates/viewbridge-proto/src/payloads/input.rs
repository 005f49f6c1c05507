//! User input payloads: keyboard, pointer, focus.

use serde::Deserialize;

/// `handleKeyboard` payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyboardRequest {
    /// Correlation id echoed in the reply
    pub message_id: String,
    /// Engine key handler type (key down / key up)
    pub key_type: i64,
    /// Physical key code
    pub code: String,
    /// Logical key
    pub key: String,
    /// Auto-repeat
    pub repeat: bool,
    /// Alt modifier
    pub alt_key: bool,
    /// Ctrl modifier
    pub ctrl_key: bool,
    /// Meta modifier
    pub meta_key: bool,
    /// Shift modifier
    pub shift_key: bool,
}

/// Origin rectangle of a focus move, as sent by the viewhost.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct FocusOrigin {
    /// Top edge
    pub top: f64,
    /// Left edge
    pub left: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

/// `setFocus` payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetFocus {
    /// Engine focus direction code
    pub direction: i64,
    /// Rectangle the focus move starts from
    pub origin: FocusOrigin,
    /// Component receiving focus
    pub target_id: String,
}

/// `updateCursorPosition` payload, viewhost units.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct CursorPosition {
    /// Horizontal position
    pub x: f64,
    /// Vertical position
    pub y: f64,
}

/// `handlePointerEvent` payload, viewhost units.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerEventRequest {
    /// Horizontal position
    pub x: f64,
    /// Vertical position
    pub y: f64,
    /// Engine pointer event type code (down, up, move, cancel)
    pub pointer_event_type: i64,
    /// Engine pointer type code (mouse, touch)
    pub pointer_type: i64,
    /// Pointer id
    pub pointer_id: i64,
}

/// `isCharacterValid` payload.
///
/// Fields are optional so that each missing one can be reported to the
/// viewhost by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterValidRequest {
    /// Correlation id echoed in the reply
    #[serde(default)]
    pub message_id: Option<String>,
    /// Character to validate; only the first char is checked
    #[serde(default)]
    pub character: Option<String>,
    /// Edit text component
    #[serde(default)]
    pub component_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn keyboard_requires_modifiers() {
        let partial = serde_json::from_value::<KeyboardRequest>(json!({
            "messageId": "1", "keyType": 0, "code": "KeyA", "key": "a"
        }));
        assert!(partial.is_err());
    }

    #[test]
    fn character_request_tolerates_missing_fields() {
        let request: CharacterValidRequest =
            serde_json::from_value(json!({"messageId": "m"})).expect("parses");
        assert_eq!(request.message_id.as_deref(), Some("m"));
        assert!(request.character.is_none());
        assert!(request.component_id.is_none());
    }
}
