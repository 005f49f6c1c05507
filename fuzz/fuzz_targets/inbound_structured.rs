//! Fuzz target for typed payload decoding
//!
//! Raw bytes rarely get past the JSON parser, so this target builds
//! well-formed messages of every known kind with arbitrary payload trees.
//!
//! # Invariants
//!
//! - Decoding never panics
//! - A decoded message reports the kind it was decoded as
//! - `parse` and `from_parts` agree on the same message

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use serde_json::{json, Map, Number, Value};
use viewbridge_proto::InboundMessage;

const KINDS: [&str; 27] = [
    "build",
    "configurationChange",
    "updateDisplayState",
    "update",
    "updateMedia",
    "updateGraphic",
    "response",
    "ensureLayout",
    "scrollToRectInComponent",
    "handleKeyboard",
    "getFocusableAreas",
    "getFocused",
    "getVisualContext",
    "getDataSourceContext",
    "setFocus",
    "updateCursorPosition",
    "handlePointerEvent",
    "isCharacterValid",
    "reInflate",
    "reHierarchy",
    "extension",
    "mediaLoaded",
    "mediaLoadFailed",
    "audioPlayerCallback",
    "speechMarkCallback",
    "mediaPlayerUpdateMediaState",
    "mediaPlayerDoCallback",
];

/// Field names the payload decoders look for.
const FIELDS: [&str; 24] = [
    "id", "type", "value", "width", "height", "dpi", "shape", "mode", "messageId", "event",
    "argument", "rectArgument", "x", "y", "mediaState", "fromEvent", "playerId", "uri", "name",
    "data", "character", "componentId", "source", "docTheme",
];

#[derive(Debug, Arbitrary)]
enum Node {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Array(Vec<Node>),
    Object(Vec<(u8, Node)>),
}

impl Node {
    fn into_value(self, depth: u8) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(b),
            Self::Int(n) => json!(n),
            Self::Float(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
            Self::Text(s) => Value::String(s),
            _ if depth == 0 => Value::Null,
            Self::Array(items) => {
                Value::Array(items.into_iter().map(|item| item.into_value(depth - 1)).collect())
            }
            Self::Object(fields) => {
                let mut map = Map::new();
                for (key, node) in fields {
                    let key = FIELDS[usize::from(key) % FIELDS.len()];
                    map.insert(key.to_string(), node.into_value(depth - 1));
                }
                Value::Object(map)
            }
        }
    }
}

#[derive(Debug, Arbitrary)]
struct Input {
    kind: u8,
    payload: Node,
}

fuzz_target!(|input: Input| {
    let kind = KINDS[usize::from(input.kind) % KINDS.len()];
    let payload = input.payload.into_value(4);

    let direct = InboundMessage::from_parts(kind, payload.clone());
    if let Ok(message) = &direct {
        assert_eq!(message.kind(), kind);
    }

    let raw = json!({ "type": kind, "payload": payload }).to_string();
    let parsed = InboundMessage::parse(&raw);
    assert_eq!(direct.is_ok(), parsed.is_ok());
});
