//! Fuzz target for the connection manager dispatch loop
//!
//! Drives a simulated session with arbitrary sequences of inbound messages,
//! frame ticks and host operations.
//!
//! # Strategy
//!
//! - Valid kinds with loosely typed payloads (numbers where strings are
//!   expected, missing fields, unknown component ids)
//! - Builds at arbitrary viewport sizes and densities, including zero
//! - Responses to tokens that were never issued or already settled
//! - Resets between messages
//!
//! # Invariants
//!
//! - Nothing panics; every bad message is dropped or answered with an error
//! - Outbound sequence numbers stay contiguous from 1

#![no_main]

use std::time::Duration;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use serde_json::{json, Value};
use viewbridge_harness::{DocumentSpec, Scenario, SimDocument, SimEngine};

const KINDS: [&str; 16] = [
    "configurationChange",
    "updateDisplayState",
    "update",
    "updateMedia",
    "response",
    "ensureLayout",
    "scrollToRectInComponent",
    "getFocusableAreas",
    "getFocused",
    "setFocus",
    "handlePointerEvent",
    "isCharacterValid",
    "reInflate",
    "reHierarchy",
    "extension",
    "mediaLoaded",
];

const IDS: [&str; 4] = ["page", "title", "list", "ghost"];

#[derive(Debug, Arbitrary)]
enum Scalar {
    Int(i32),
    Float(f32),
    Text(String),
    Id(u8),
    Missing,
}

impl Scalar {
    fn into_value(self) -> Option<Value> {
        match self {
            Self::Int(n) => Some(json!(n)),
            Self::Float(f) => Some(json!(f)),
            Self::Text(s) => Some(Value::String(s)),
            Self::Id(i) => Some(json!(IDS[usize::from(i) % IDS.len()])),
            Self::Missing => None,
        }
    }
}

#[derive(Debug, Arbitrary)]
enum Op {
    Message { kind: u8, fields: Vec<(u8, Scalar)> },
    Build { width: u16, height: u16, dpi: u16 },
    Response { event: u8, argument: Option<i8> },
    Tick(u8),
    Commands(bool),
    Reset,
}

const FIELDS: [&str; 14] = [
    "id", "type", "value", "width", "height", "messageId", "event", "x", "y", "character",
    "componentId", "uri", "name", "source",
];

fn payload(fields: Vec<(u8, Scalar)>) -> Value {
    let mut map = serde_json::Map::new();
    for (key, scalar) in fields.into_iter().take(8) {
        if let Some(value) = scalar.into_value() {
            map.insert(FIELDS[usize::from(key) % FIELDS.len()].to_string(), value);
        }
    }
    Value::Object(map)
}

fn layout() -> Value {
    json!({
        "id": "page",
        "type": "Container",
        "children": [
            {"id": "title", "type": "Text", "properties": {"text": "hello"}},
            {"id": "list", "type": "Sequence", "children": [{"type": "Text"}, {"type": "Text"}]},
        ],
    })
}

fuzz_target!(|ops: Vec<Op>| {
    let Ok(mut scenario) = Scenario::new(SimEngine::new(layout())) else {
        return;
    };
    scenario.load(SimDocument::new(DocumentSpec::default()));

    for op in ops.into_iter().take(64) {
        match op {
            Op::Message { kind, fields } => {
                let kind = KINDS[usize::from(kind) % KINDS.len()];
                scenario.send(kind, payload(fields));
            }
            Op::Build { width, height, dpi } => {
                scenario.send(
                    "build",
                    json!({
                        "width": width,
                        "height": height,
                        "dpi": dpi,
                        "shape": "RECTANGLE",
                        "mode": "HUB",
                    }),
                );
            }
            Op::Response { event, argument } => {
                scenario.send("response", json!({ "event": event, "argument": argument }));
            }
            Op::Tick(ms) => scenario.tick(Duration::from_millis(u64::from(ms))),
            Op::Commands(well_formed) => {
                let commands = if well_formed {
                    r#"{"commands": [{"type": "Idle"}]}"#
                } else {
                    r#"{"commands": 7}"#
                };
                scenario.manager.execute_commands(commands, "fuzz");
            }
            Op::Reset => {
                scenario.manager.reset();
                scenario.load(SimDocument::new(DocumentSpec::default()));
            }
        }
    }

    let seqnos = scenario.host.sent_seqnos();
    for (index, seqno) in seqnos.iter().enumerate() {
        assert_eq!(*seqno, index as u64 + 1);
    }
});
