//! Replay tests
//!
//! Whole traces run through the script parser and the simulated manager, the
//! way `viewbridge-replay` runs them.

use std::time::Duration;

use proptest::prelude::*;
use serde_json::Value;
use viewbridge_harness::{
    SimDocument,
    replay::{ReplayError, Step, parse_script, replay},
};

const FRAME: Duration = Duration::from_millis(16);

const DOCUMENT: &str = r##"{
    "background": "#101010",
    "supportsResizing": true,
    "mainTemplate": {
        "id": "page",
        "type": "Container",
        "children": [{"id": "title", "type": "Text", "properties": {"text": "hello"}}]
    }
}"##;

const TRACE: &str = r#"
# scaled hub, then a resize and a command
{"supportedViewports": [{"shape": "RECTANGLE", "minWidth": 100, "maxWidth": 100, "minHeight": 100, "maxHeight": 100}]}
{"type": "build", "payload": {"width": 200, "height": 200, "dpi": 160, "shape": "RECTANGLE", "mode": "HUB"}}
{"type": "configurationChange", "payload": {"width": 300, "height": 240}}
{"executeCommands": [{"type": "SetValue", "componentId": "title", "property": "text", "value": "bye"}]}
{"tick": 16}
"#;

fn decoded(outbound: &[String]) -> Vec<Value> {
    outbound.iter().map(|raw| serde_json::from_str(raw).expect("outbound is json")).collect()
}

#[test]
fn trace_replays_end_to_end() {
    let document = SimDocument::from_json(DOCUMENT).expect("document parses");
    let steps = parse_script(TRACE).expect("trace parses");
    assert_eq!(steps.len(), 5);

    let outcome = replay(document, &steps, FRAME).expect("replay runs");
    assert_eq!(outcome.render_completions, [(true, String::new())]);
    assert_eq!(outcome.inflation_attempts, 1);
    assert!(outcome.errors.is_empty());

    let messages = decoded(&outcome.outbound);
    let seqnos: Vec<u64> = messages.iter().filter_map(|m| m["seqno"].as_u64()).collect();
    let expected: Vec<u64> = (1..=messages.len() as u64).collect();
    assert_eq!(seqnos, expected);

    let scale_factors: Vec<f64> = messages
        .iter()
        .filter(|m| m["type"] == "scaling")
        .filter_map(|m| m["payload"]["scaleFactor"].as_f64())
        .collect();
    assert_eq!(scale_factors.last(), Some(&3.0));

    let background = messages.iter().find(|m| m["type"] == "background").expect("background sent");
    assert_eq!(background["payload"]["background"]["color"], "#101010");
    assert!(messages.iter().any(|m| m["type"] == "hierarchy"));
}

#[test]
fn replay_without_build_reports_nothing_rendered() {
    let document = SimDocument::from_json(DOCUMENT).expect("document parses");
    let steps = parse_script("{\"tick\": 16}\n{\"tick\": 16}").expect("trace parses");

    let outcome = replay(document, &steps, FRAME).expect("replay runs");
    assert!(outcome.outbound.is_empty());
    assert!(outcome.render_completions.is_empty());
    assert_eq!(outcome.inflation_attempts, 0);
}

#[test]
fn commands_before_build_fail_quietly() {
    let document = SimDocument::from_json(DOCUMENT).expect("document parses");
    let steps = parse_script(r#"{"executeCommands": [{"type": "Idle"}]}"#).expect("trace parses");

    let outcome = replay(document, &steps, FRAME).expect("replay runs");
    assert!(outcome.outbound.is_empty());
}

#[test]
fn malformed_inbound_lines_are_delivered_and_dropped() {
    let document = SimDocument::from_json(DOCUMENT).expect("document parses");
    let steps = parse_script(r#"{"type": "build", "payload": "wide"}"#).expect("trace parses");
    assert!(matches!(steps[0], Step::Inbound(_)));

    let outcome = replay(document, &steps, FRAME).expect("replay runs");
    assert!(outcome.outbound.is_empty());
    assert_eq!(outcome.inflation_attempts, 0);
}

#[test]
fn bad_tick_is_a_script_error() {
    let err = parse_script("{\"tick\": -4}").expect_err("rejected");
    assert!(matches!(err, ReplayError::Script { line: 1, .. }));

    let err = parse_script("\n\n[1, 2]").expect_err("rejected");
    assert!(matches!(err, ReplayError::Script { line: 3, .. }));
}

proptest! {
    /// Property: parsing never panics, and every accepted line is one step
    #[test]
    fn prop_parse_script_is_total(lines in prop::collection::vec(".{0,40}", 0..12)) {
        let text = lines.join("\n");
        if let Ok(steps) = parse_script(&text) {
            let meaningful = lines
                .iter()
                .map(|line| line.as_str().trim())
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .count();
            prop_assert_eq!(steps.len(), meaningful);
        }
    }

    /// Property: tick directives keep their duration
    #[test]
    fn prop_tick_round_trips(millis in 0u64..100_000) {
        let steps = parse_script(&format!("{{\"tick\": {millis}}}"))?;
        prop_assert_eq!(steps, vec![Step::Tick(Duration::from_millis(millis))]);
    }
}
