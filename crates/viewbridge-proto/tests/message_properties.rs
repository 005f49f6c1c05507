//! Property tests for inbound decoding.
//!
//! Decoding must be total: any byte string either decodes or yields a
//! `ProtocolError`, and a decoded message reports the type string it was
//! decoded from.

use proptest::prelude::*;
use serde_json::{Value, json};
use viewbridge_proto::{InboundMessage, ProtocolError};

/// Every type string in the dispatch table, with a minimal valid payload.
fn known_messages() -> Vec<(&'static str, Value)> {
    vec![
        ("build", json!({"width": 1, "height": 1, "dpi": 160, "shape": "ROUND", "mode": "HUB"})),
        ("configurationChange", json!({})),
        ("updateDisplayState", json!(1)),
        ("update", json!({"id": "a", "type": 0, "value": 1})),
        ("updateMedia", json!({"id": "a"})),
        ("updateGraphic", json!({"id": "a", "avg": "{}"})),
        ("response", json!({"event": 1})),
        ("ensureLayout", json!({"id": "a"})),
        ("scrollToRectInComponent", json!({"id": "a", "align": 0})),
        (
            "handleKeyboard",
            json!({"messageId": "m", "keyType": 0, "code": "KeyA", "key": "a", "repeat": false,
                   "altKey": false, "ctrlKey": false, "metaKey": false, "shiftKey": false}),
        ),
        ("getFocusableAreas", json!({"messageId": "m"})),
        ("getFocused", json!({"messageId": "m"})),
        ("getVisualContext", json!({"messageId": "m"})),
        ("getDataSourceContext", json!({"messageId": "m"})),
        (
            "setFocus",
            json!({"direction": 1, "origin": {"top": 0, "left": 0, "width": 1, "height": 1},
                   "targetId": "a"}),
        ),
        ("updateCursorPosition", json!({"x": 1, "y": 2})),
        (
            "handlePointerEvent",
            json!({"x": 1, "y": 2, "pointerEventType": 0, "pointerType": 0, "pointerId": 0}),
        ),
        ("isCharacterValid", json!({})),
        ("reInflate", json!({})),
        ("reHierarchy", json!({})),
        ("extension", json!({"uri": "u", "name": "n", "fastMode": true})),
        ("mediaLoaded", json!({"source": "s"})),
        ("mediaLoadFailed", json!({"source": "s", "errorCode": 1, "error": "e"})),
        ("audioPlayerCallback", json!({"playerId": "p"})),
        ("speechMarkCallback", json!({"playerId": "p"})),
        ("mediaPlayerUpdateMediaState", json!({"playerId": "p"})),
        ("mediaPlayerDoCallback", json!({"playerId": "p"})),
    ]
}

#[test]
fn every_known_type_decodes_to_its_own_kind() {
    for (kind, payload) in known_messages() {
        let raw = json!({"type": kind, "payload": payload}).to_string();
        let message = InboundMessage::parse(&raw)
            .unwrap_or_else(|e| panic!("{kind} failed to decode: {e}"));
        assert_eq!(message.kind(), kind);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Arbitrary input never panics the decoder.
    #[test]
    fn prop_parse_is_total(raw in ".{0,256}") {
        let _ = InboundMessage::parse(&raw);
    }

    /// Type strings outside the table are rejected by name.
    #[test]
    fn prop_unknown_types_rejected(kind in "[a-zA-Z]{1,24}") {
        prop_assume!(known_messages().iter().all(|(k, _)| *k != kind));
        let raw = json!({"type": kind, "payload": {}}).to_string();
        let result = InboundMessage::parse(&raw);
        prop_assert!(matches!(result, Err(ProtocolError::UnknownType(ref t)) if *t == kind));
    }

    /// Any JSON object without a payload member is rejected, whatever the
    /// type string.
    #[test]
    fn prop_payload_required(index in 0usize..27) {
        let messages = known_messages();
        let (kind, _) = messages[index % messages.len()];
        let raw = json!({"type": kind}).to_string();
        prop_assert!(matches!(InboundMessage::parse(&raw), Err(ProtocolError::MissingPayload)));
    }
}
