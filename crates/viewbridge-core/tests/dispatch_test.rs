//! Inbound dispatch tests
//!
//! One or more cases per inbound message type, driven through
//! `handle_message` against a built document.

use serde_json::{Value, json};
use viewbridge_core::engine::{DisplayState, PointerEventType};
use viewbridge_harness::{
    DocumentSpec, RootCall, RootHandle, Scenario, SimDocument, SimEngine, build_payload,
};
use viewbridge_proto::payloads::{Rect, component::UpdateValue};

fn layout() -> Value {
    json!({
        "id": "page",
        "type": "Container",
        "children": [
            {"id": "name", "type": "EditText", "accepts": "0123456789"},
            {"id": "video", "type": "Video"},
            {"id": "icon", "type": "VectorGraphic", "graphic": true},
            {"id": "list", "type": "Sequence", "children": [{"id": "row"}]},
        ],
    })
}

fn built() -> (Scenario, RootHandle) {
    let mut scenario = Scenario::new(SimEngine::new(layout())).expect("scenario");
    scenario.load(SimDocument::new(DocumentSpec::default()));
    scenario.build(100, 100);
    let root = scenario.root().expect("inflated");
    scenario.host.clear();
    (scenario, root)
}

/// Scenario scaled by 2: a 200x200 viewhost laid out at 100x100.
fn built_scaled() -> (Scenario, RootHandle) {
    let mut scenario = Scenario::new(SimEngine::new(layout())).expect("scenario");
    scenario.manager.set_supported_viewports(
        r#"[{"shape": "RECTANGLE", "minWidth": 100, "maxWidth": 100, "minHeight": 100, "maxHeight": 100}]"#,
    );
    scenario.load(SimDocument::new(DocumentSpec::default()));
    scenario.build(200, 200);
    let root = scenario.root().expect("inflated");
    scenario.host.clear();
    (scenario, root)
}

fn last_call(root: &RootHandle) -> Option<RootCall> {
    root.calls().pop()
}

#[test]
fn messages_without_document_are_ignored() {
    let mut scenario = Scenario::new(SimEngine::new(layout())).expect("scenario");
    let messages = [
        ("configurationChange", json!({"docTheme": "dark"})),
        ("updateDisplayState", json!(2)),
        ("update", json!({"id": "name", "type": 0, "value": "x"})),
        ("response", json!({"event": 1})),
        ("ensureLayout", json!({"id": "name"})),
        ("handleKeyboard", json!({
            "messageId": "k", "keyType": 0, "code": "KeyA", "key": "a", "repeat": false,
            "altKey": false, "ctrlKey": false, "metaKey": false, "shiftKey": false
        })),
        ("getFocused", json!({"messageId": "f"})),
        ("getVisualContext", json!({"messageId": "v"})),
        ("reInflate", json!({})),
        ("reHierarchy", json!({})),
        ("mediaLoaded", json!({"source": "a.mp4"})),
    ];
    for (kind, payload) in messages {
        scenario.send(kind, payload);
    }

    assert!(scenario.host.sent().is_empty());
    assert!(!scenario.manager.correlator().is_expecting());
}

#[test]
fn malformed_messages_are_dropped() {
    let (mut scenario, root) = built();
    let calls_before = root.calls().len();
    for raw in [
        "not json",
        "[1, 2]",
        r#"{"payload": {}}"#,
        r#"{"type": "build"}"#,
        r#"{"type": "teleport", "payload": {}}"#,
        r#"{"type": "update", "payload": {"id": "name"}}"#,
        r#"{"type": "updateDisplayState", "payload": "foreground"}"#,
    ] {
        scenario.deliver(raw);
    }

    assert!(scenario.host.sent().is_empty());
    assert_eq!(root.calls().len(), calls_before);
}

#[test]
fn configuration_change_reaches_the_document() {
    let (mut scenario, root) = built();
    scenario.send("configurationChange", json!({"docTheme": "dark", "fontScale": 1.5, "screenReader": true}));

    let Some(RootCall::Configuration(change)) = last_call(&root) else {
        panic!("configuration change not applied");
    };
    assert_eq!(change.doc_theme.as_deref(), Some("dark"));
    assert_eq!(change.font_scale, Some(1.5));
    assert_eq!(change.screen_reader, Some(true));
    assert!(change.size.is_none());
    assert!(scenario.host.sent().is_empty());
}

#[test]
fn resize_rescales_and_converts_to_core_pixels() {
    let (mut scenario, root) = built_scaled();
    scenario.send("configurationChange", json!({"width": 300, "height": 240}));

    let scaling = scenario.host.sent_of_kind("scaling");
    assert_eq!(scaling.len(), 1);
    assert_eq!(scaling[0]["viewportWidth"], 300.0);
    assert_eq!(scaling[0]["scaleFactor"], 3.0);

    let Some(RootCall::Configuration(change)) = last_call(&root) else {
        panic!("configuration change not applied");
    };
    assert_eq!(change.size, Some((100, 80)));
}

#[test]
fn display_state_codes() {
    let (mut scenario, root) = built();
    scenario.send("updateDisplayState", json!(1));
    assert_eq!(last_call(&root), Some(RootCall::DisplayState(DisplayState::Background)));

    let calls = root.calls().len();
    scenario.send("updateDisplayState", json!(7));
    assert_eq!(root.calls().len(), calls);
    assert!(scenario.host.sent().is_empty());
}

#[test]
fn update_writes_the_component_value() {
    let (mut scenario, root) = built();
    scenario.send("update", json!({"id": "name", "type": 0, "value": "42"}));
    assert_eq!(
        root.component("name").expect("name").value(),
        Some(UpdateValue::Text("42".to_string()))
    );

    scenario.send("update", json!({"id": "ghost", "type": 0, "value": 1}));
    assert_eq!(scenario.host.errors(), ["Unable to find component"]);
}

#[test]
fn update_media_needs_full_state() {
    let (mut scenario, root) = built();
    let state = json!({
        "trackIndex": 0, "trackCount": 2, "currentTime": 1500, "duration": 9000,
        "paused": false, "ended": false, "trackState": 1, "muted": false
    });
    scenario.send("updateMedia", json!({"id": "video", "fromEvent": true, "mediaState": state}));
    let (media, from_event) = root.component("video").expect("video").media_state().expect("state set");
    assert_eq!(media.current_time, 1500);
    assert!(from_event);

    scenario.send("updateMedia", json!({"id": "video", "mediaState": {"paused": true}}));
    scenario.send("updateMedia", json!({"id": "nobody", "fromEvent": false, "mediaState": state}));
    assert_eq!(scenario.host.errors(), ["Can't update media state.", "Unable to find component"]);
}

#[test]
fn update_graphic_replaces_the_source() {
    let (mut scenario, root) = built();
    let avg = json!({"version": "1.2", "items": [{"type": "path"}]}).to_string();
    scenario.send("updateGraphic", json!({"id": "icon", "avg": avg}));
    assert_eq!(root.component("icon").expect("icon").graphic().expect("graphic")["items"][0]["type"], "path");

    scenario.send("updateGraphic", json!({"id": "icon", "avg": "<svg>"}));
    assert!(scenario.host.errors().is_empty());
}

#[test]
fn response_without_integer_event_is_invalid() {
    let (mut scenario, _root) = built();
    scenario.send("response", json!({"event": "7"}));
    scenario.send("response", json!({"argument": 1}));
    assert_eq!(scenario.host.errors(), ["Invalid event response", "Invalid event response"]);
}

#[test]
fn ensure_layout_echoes_the_id() {
    let (mut scenario, root) = built();
    scenario.send("ensureLayout", json!({"id": "row"}));

    assert!(root.component("row").expect("row").is_laid_out());
    assert_eq!(scenario.host.sent_of_kind("ensureLayout"), [json!("row")]);
}

#[test]
fn ensure_layout_of_unknown_component() {
    let (mut scenario, _root) = built();
    scenario.send("ensureLayout", json!({"id": "ghost"}));
    assert_eq!(scenario.host.sent_kinds(), ["error"]);
}

#[test]
fn scroll_to_rect_is_scaled() {
    let (mut scenario, root) = built_scaled();
    scenario.send(
        "scrollToRectInComponent",
        json!({"id": "list", "x": 0, "y": 80, "width": 200, "height": 40, "align": 1}),
    );

    assert_eq!(
        last_call(&root),
        Some(RootCall::ScrollToRect {
            uid: ":1004".to_string(),
            rect: Rect { x: 0.0, y: 40.0, width: 100.0, height: 20.0 },
            align: 1,
        })
    );
}

#[test]
fn keyboard_reply_reports_consumption() {
    let (mut scenario, root) = built();
    root.set_keyboard_consumed(true);
    scenario.send(
        "handleKeyboard",
        json!({
            "messageId": "k1", "keyType": 1, "code": "Enter", "key": "Enter", "repeat": false,
            "altKey": false, "ctrlKey": true, "metaKey": false, "shiftKey": false
        }),
    );

    assert_eq!(scenario.host.sent_of_kind("handleKeyboard"), [json!({"messageId": "k1", "result": true})]);
    let Some(RootCall::Keyboard { key_type, keyboard }) = last_call(&root) else {
        panic!("keyboard not forwarded");
    };
    assert_eq!(key_type, 1);
    assert!(keyboard.ctrl);
    assert_eq!(keyboard.code, "Enter");
}

#[test]
fn focus_queries() {
    let (mut scenario, root) = built();
    root.set_focused(":1001");
    root.add_focusable(":1001", Rect { x: 10.0, y: 20.0, width: 30.0, height: 40.0 });

    scenario.send("getFocused", json!({"messageId": "f1"}));
    scenario.send("getFocusableAreas", json!({"messageId": "f2"}));

    assert_eq!(scenario.host.sent_of_kind("getFocused"), [json!({"messageId": "f1", "result": ":1001"})]);
    assert_eq!(
        scenario.host.sent_of_kind("getFocusableAreas"),
        [json!({
            "messageId": "f2",
            "areas": {":1001": {"top": 20.0, "left": 10.0, "width": 30.0, "height": 40.0}}
        })]
    );
}

#[test]
fn set_focus_passes_origin_through() {
    let (mut scenario, root) = built_scaled();
    scenario.send(
        "setFocus",
        json!({"direction": 130, "origin": {"top": 4, "left": 2, "width": 8, "height": 6}, "targetId": "row"}),
    );

    assert_eq!(
        last_call(&root),
        Some(RootCall::SetFocus {
            direction: 130,
            origin: Rect { x: 2.0, y: 4.0, width: 8.0, height: 6.0 },
            target_id: "row".to_string(),
        })
    );
}

#[test]
fn context_queries() {
    let (mut scenario, root) = built();
    root.add_data_source("dynamicIndexList", true);

    scenario.send("getVisualContext", json!({"messageId": "v1"}));
    scenario.send("getDataSourceContext", json!({"messageId": "d1"}));

    let visual = scenario.host.sent_of_kind("getVisualContext").remove(0);
    assert_eq!(visual["messageId"], "v1");
    assert_eq!(visual["result"]["id"], ":1000");
    assert_eq!(
        scenario.host.sent_of_kind("getDataSourceContext"),
        [json!({"messageId": "d1", "result": [{"type": "dynamicIndexList"}]})]
    );
}

#[test]
fn cursor_moves_are_pointer_moves() {
    let (mut scenario, root) = built_scaled();
    scenario.send("updateCursorPosition", json!({"x": 50, "y": 20}));

    let Some(RootCall::Pointer(event)) = last_call(&root) else {
        panic!("cursor not forwarded");
    };
    assert_eq!(event.event_type, PointerEventType::Move);
    assert_eq!((event.x, event.y), (25.0, 10.0));
}

#[test]
fn pointer_events_are_scaled() {
    let (mut scenario, root) = built_scaled();
    scenario.send(
        "handlePointerEvent",
        json!({"x": 100, "y": 60, "pointerEventType": 0, "pointerType": 1, "pointerId": 3}),
    );

    let Some(RootCall::Pointer(event)) = last_call(&root) else {
        panic!("pointer not forwarded");
    };
    assert_eq!(event.event_type, PointerEventType::Down);
    assert_eq!(event.pointer_id, 3);
    assert_eq!((event.x, event.y), (50.0, 30.0));
}

#[test]
fn unknown_pointer_type_is_dropped() {
    let (mut scenario, root) = built();
    let calls = root.calls().len();
    scenario.send(
        "handlePointerEvent",
        json!({"x": 1, "y": 1, "pointerEventType": 9, "pointerType": 0, "pointerId": 0}),
    );

    assert_eq!(root.calls().len(), calls);
    assert!(scenario.host.sent().is_empty());
}

#[test]
fn character_validation() {
    let (mut scenario, _root) = built();
    scenario.send("isCharacterValid", json!({"messageId": "c1", "character": "7", "componentId": "name"}));
    scenario.send("isCharacterValid", json!({"messageId": "c2", "character": "x", "componentId": "name"}));

    assert_eq!(
        scenario.host.sent_of_kind("isCharacterValid"),
        [
            json!({"messageId": "c1", "valid": true, "componentId": "name"}),
            json!({"messageId": "c2", "valid": false, "componentId": "name"}),
        ]
    );
}

#[test]
fn character_validation_reports_missing_fields() {
    let (mut scenario, _root) = built();
    scenario.send("isCharacterValid", json!({"character": "7", "componentId": "name"}));
    scenario.send("isCharacterValid", json!({"messageId": "c", "componentId": "name"}));
    scenario.send("isCharacterValid", json!({"messageId": "c", "character": "7"}));

    assert_eq!(
        scenario.host.errors(),
        [
            "Payload does not contain messageId",
            "Payload does not contain character",
            "Payload does not contain componentId"
        ]
    );
}

#[test]
fn rehierarchy_waits_for_acknowledgement() {
    let (mut scenario, _root) = built();
    scenario.send("reHierarchy", json!({}));

    let rehierarchy = scenario.host.sent_of_kind("reHierarchy");
    assert_eq!(rehierarchy.len(), 1);
    assert_eq!(rehierarchy[0]["hierarchy"]["id"], ":1000");
    assert!(!scenario.manager.correlator().is_expecting());
}

#[test]
fn extension_message_calls_the_document_handler() {
    let (mut scenario, root) = built();
    root.add_extension_handler("aplext:demo:1", "OnPing");
    scenario.send(
        "extension",
        json!({"uri": "aplext:demo:1", "name": "OnPing", "fastMode": true, "data": {"a": "x", "b": 2}}),
    );

    let Some(RootCall::ExtensionHandler { uri, name, data, fast_mode }) = last_call(&root) else {
        panic!("handler not invoked");
    };
    assert_eq!((uri.as_str(), name.as_str()), ("aplext:demo:1", "OnPing"));
    assert!(fast_mode);
    assert_eq!(Value::Object(data), json!({"a": "x"}));
}

#[test]
fn extension_message_without_handler_is_harmless() {
    let (mut scenario, _root) = built();
    scenario.send("extension", json!({"uri": "aplext:demo:1", "name": "Nope", "fastMode": false}));
    assert!(scenario.host.sent().is_empty());
}

#[test]
fn media_notifications() {
    let (mut scenario, root) = built();
    scenario.send("mediaLoaded", json!({"source": "https://cdn/a.mp4"}));
    assert_eq!(last_call(&root), Some(RootCall::MediaLoaded("https://cdn/a.mp4".to_string())));

    scenario.send("mediaLoadFailed", json!({"source": "https://cdn/b.mp4", "errorCode": 404, "error": "gone"}));
    assert_eq!(
        last_call(&root),
        Some(RootCall::MediaLoadFailed {
            source: "https://cdn/b.mp4".to_string(),
            error_code: 404,
            error: "gone".to_string(),
        })
    );
}

#[test]
fn player_callbacks_are_routed_by_id() {
    let (mut scenario, root) = built();
    root.add_player("speech");
    for kind in ["audioPlayerCallback", "speechMarkCallback", "mediaPlayerUpdateMediaState", "mediaPlayerDoCallback"]
    {
        scenario.send(kind, json!({"playerId": "speech", "marks": []}));
    }
    scenario.send("audioPlayerCallback", json!({"playerId": "unknown"}));

    let players = root.calls().into_iter().filter(|call| matches!(call, RootCall::Player(_))).count();
    assert_eq!(players, 5);
    assert!(scenario.host.sent().is_empty());
}

#[test]
fn build_payload_requires_viewport_fields() {
    let mut scenario = Scenario::new(SimEngine::default()).expect("scenario");
    scenario.load(SimDocument::new(DocumentSpec::default()));

    let mut payload = build_payload(100, 100);
    payload.as_object_mut().expect("object").remove("dpi");
    scenario.send("build", payload);

    assert!(scenario.engine.attempts().is_empty());
    assert!(scenario.host.sent().is_empty());
}
