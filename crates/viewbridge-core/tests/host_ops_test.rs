//! Host-initiated operation tests
//!
//! Commands, data source updates, state reports and extension plumbing
//! invoked by the embedding application rather than the viewhost.

use serde_json::{Map, Value, json};
use viewbridge_core::{
    CommandOutcome,
    engine::{Action, Resolution},
    host::APL_COMMAND_EXECUTION,
};
use viewbridge_harness::{
    CommandMode, DocumentSpec, HostCall, RootCall, RootHandle, SCENARIO_TOKEN, Scenario, SimDocument, SimEngine,
};

const COMMANDS: &str = r#"{"commands": [{"type": "SetValue", "componentId": "title", "property": "text", "value": "hi"}]}"#;

fn built() -> (Scenario, RootHandle) {
    let mut scenario = Scenario::new(SimEngine::default()).expect("scenario");
    scenario.load(SimDocument::new(DocumentSpec::default()));
    scenario.build(100, 100);
    let root = scenario.root().expect("inflated");
    scenario.host.clear();
    (scenario, root)
}

fn completions(scenario: &Scenario) -> Vec<(CommandOutcome, String)> {
    scenario
        .host
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            HostCall::CommandComplete { outcome, message, .. } => Some((outcome, message)),
            _ => None,
        })
        .collect()
}

fn activity_log(scenario: &Scenario) -> Vec<String> {
    scenario
        .host
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            HostCall::ActivityStarted { activity, .. } => Some(format!("+{activity}")),
            HostCall::ActivityEnded { activity, .. } => Some(format!("-{activity}")),
            _ => None,
        })
        .collect()
}

#[test]
fn commands_without_document_fail() {
    let mut scenario = Scenario::new(SimEngine::default()).expect("scenario");
    scenario.manager.execute_commands(COMMANDS, SCENARIO_TOKEN);

    assert_eq!(completions(&scenario), [(CommandOutcome::Failed, "Root context is missing".to_string())]);
    assert!(activity_log(&scenario).is_empty());
}

#[test]
fn malformed_commands_fail() {
    let (mut scenario, root) = built();
    scenario.manager.execute_commands("{not json", SCENARIO_TOKEN);
    scenario.manager.execute_commands(r#"{"commands": {"type": "Idle"}}"#, SCENARIO_TOKEN);
    scenario.manager.execute_commands(r#"{"sequence": []}"#, SCENARIO_TOKEN);

    assert_eq!(
        completions(&scenario),
        [
            (CommandOutcome::Failed, "Parse commands failed".to_string()),
            (CommandOutcome::Failed, "Missing commands, or is not array".to_string()),
            (CommandOutcome::Failed, "Missing commands, or is not array".to_string()),
        ]
    );
    assert!(root.calls().iter().all(|call| !matches!(call, RootCall::Commands(_))));
}

#[test]
fn rejected_commands_fail() {
    let (mut scenario, root) = built();
    root.set_command_mode(CommandMode::Reject);
    scenario.manager.execute_commands(COMMANDS, SCENARIO_TOKEN);

    assert_eq!(
        completions(&scenario),
        [(CommandOutcome::Failed, "APL Core could not process commands".to_string())]
    );
    assert!(activity_log(&scenario).is_empty());
}

#[test]
fn completed_commands_bracket_the_activity() {
    let (mut scenario, root) = built();
    scenario.manager.execute_commands(COMMANDS, SCENARIO_TOKEN);

    assert_eq!(completions(&scenario), [(CommandOutcome::Resolved, "Command sequence completed".to_string())]);
    assert_eq!(
        activity_log(&scenario),
        [format!("+{APL_COMMAND_EXECUTION}"), format!("-{APL_COMMAND_EXECUTION}")]
    );
    let Some(RootCall::Commands(commands)) = root.calls().pop() else {
        panic!("commands not executed");
    };
    assert_eq!(commands[0]["type"], "SetValue");
}

#[test]
fn running_commands_report_when_they_finish() {
    let (mut scenario, root) = built();
    root.set_command_mode(CommandMode::Run);
    scenario.manager.execute_commands(COMMANDS, "owner-7");

    assert!(completions(&scenario).is_empty());
    assert_eq!(activity_log(&scenario), [format!("+{APL_COMMAND_EXECUTION}")]);

    let action = root.last_command().expect("command running");
    action.resolve(Resolution::Plain);

    let calls = scenario.host.calls();
    assert!(calls.contains(&HostCall::CommandComplete {
        token: "owner-7".to_string(),
        outcome: CommandOutcome::Resolved,
        message: "Command sequence completed".to_string(),
    }));
    assert_eq!(
        activity_log(&scenario),
        [format!("+{APL_COMMAND_EXECUTION}"), format!("-{APL_COMMAND_EXECUTION}")]
    );
}

#[test]
fn interrupted_commands_report_termination() {
    let (mut scenario, root) = built();
    root.set_command_mode(CommandMode::Run);
    scenario.manager.execute_commands(COMMANDS, SCENARIO_TOKEN);
    scenario.manager.interrupt_command_sequence();

    assert!(root.calls().contains(&RootCall::CancelExecution));
    assert_eq!(
        completions(&scenario),
        [(CommandOutcome::Terminated, "Command sequence terminated".to_string())]
    );
    assert_eq!(activity_log(&scenario).len(), 2);
}

#[test]
fn interrupt_without_document_is_harmless() {
    let mut scenario = Scenario::new(SimEngine::default()).expect("scenario");
    scenario.manager.interrupt_command_sequence();
    assert!(scenario.host.calls().is_empty());
}

#[test]
fn data_source_updates_reach_their_provider() {
    let (mut scenario, root) = built();
    root.add_data_source("dynamicIndexList", true);
    scenario.manager.data_source_update("dynamicIndexList", r#"{"listId": "items"}"#, SCENARIO_TOKEN);

    assert_eq!(
        root.calls().pop(),
        Some(RootCall::DataSourceUpdate {
            source_type: "dynamicIndexList".to_string(),
            payload: r#"{"listId": "items"}"#.to_string(),
        })
    );
    assert!(scenario.host.calls().is_empty());
}

#[test]
fn rejected_data_source_update_reports_provider_errors() {
    let (mut scenario, root) = built();
    root.add_data_source("dynamicTokenList", false);
    root.push_data_source_error(json!({"type": "INVALID_LIST_ID"}));
    scenario.manager.data_source_update("dynamicTokenList", "{}", SCENARIO_TOKEN);

    let errors: Vec<_> = scenario
        .host
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            HostCall::RuntimeError { payload, .. } => Some(payload),
            _ => None,
        })
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["errors"][0]["type"], "INVALID_LIST_ID");
}

#[test]
fn data_source_update_for_unknown_provider_is_dropped() {
    let (mut scenario, root) = built();
    root.push_data_source_error(json!({"type": "LEFTOVER"}));
    scenario.manager.data_source_update("nope", "{}", SCENARIO_TOKEN);
    assert!(scenario.host.calls().is_empty());
}

#[test]
fn provide_state_reports_visual_context() {
    let (mut scenario, root) = built();
    root.add_data_source("dynamicIndexList", true);
    scenario.manager.provide_state(42);

    let Some(HostCall::VisualContext { token, request, state }) = scenario.host.calls().pop() else {
        panic!("state not provided");
    };
    assert_eq!(token, SCENARIO_TOKEN);
    assert_eq!(request, 42);
    assert_eq!(state["token"], SCENARIO_TOKEN);
    assert_eq!(state["version"], "AplClientLibrary-sim-2024.2");
    assert_eq!(state["componentsVisibleOnScreen"][0]["id"], ":1000");
    assert_eq!(state["dataSources"], json!([{"type": "dynamicIndexList"}]));
}

#[test]
fn provide_state_without_document_is_empty() {
    let mut scenario = Scenario::new(SimEngine::default()).expect("scenario");
    scenario.manager.provide_state(1);

    let Some(HostCall::VisualContext { state, .. }) = scenario.host.calls().pop() else {
        panic!("state not provided");
    };
    assert_eq!(
        state,
        json!({
            "token": "",
            "version": "AplClientLibrary-sim-2024.2",
            "componentsVisibleOnScreen": [{}],
            "dataSources": [],
        })
    );
}

#[test]
fn extension_event_goes_to_the_viewhost() {
    let (mut scenario, _root) = built();
    scenario.manager.send_extension_event("aplext:demo:1", "OnTick", json!({"count": 3}));

    assert_eq!(
        scenario.host.sent_of_kind("extension"),
        [json!({"URI": "aplext:demo:1", "type": "event", "name": "OnTick", "params": {"count": 3}})]
    );
}

#[test]
fn host_invokes_document_extension_handler() {
    let (mut scenario, root) = built();
    root.add_extension_handler("aplext:demo:1", "OnPing");
    let mut data = Map::new();
    data.insert("pong".to_string(), Value::String("yes".to_string()));
    scenario.manager.invoke_extension_event_handler("aplext:demo:1", "OnPing", &data, false);

    assert_eq!(
        root.calls().pop(),
        Some(RootCall::ExtensionHandler {
            uri: "aplext:demo:1".to_string(),
            name: "OnPing".to_string(),
            data,
            fast_mode: false,
        })
    );
}

#[test]
fn extension_result_without_document_is_ignored() {
    let mut scenario = Scenario::new(SimEngine::default()).expect("scenario");
    scenario.manager.on_extension_event_result(3, true);
    assert!(scenario.host.sent().is_empty());
}

#[test]
fn bad_viewports_keep_the_previous_set() {
    let mut scenario = Scenario::new(SimEngine::default()).expect("scenario");
    scenario.manager.set_supported_viewports(
        r#"[{"shape": "RECTANGLE", "minWidth": 100, "maxWidth": 100, "minHeight": 100, "maxHeight": 100}]"#,
    );
    scenario.manager.set_supported_viewports(r#"[{"shape": "HEXAGON"}]"#);
    scenario.manager.set_supported_viewports("not json");

    scenario.load(SimDocument::new(DocumentSpec::default()));
    scenario.build(200, 200);

    assert_eq!(scenario.engine.attempts()[0].width, 100.0);
    let scaling = scenario.host.sent_of_kind("scaling");
    assert_eq!(scaling.last().expect("scaling sent")["scaleFactor"], 2.0);
}

#[test]
fn set_content_resets_the_viewhost() {
    let mut scenario = Scenario::new(SimEngine::default()).expect("scenario");
    scenario.load(SimDocument::new(DocumentSpec::default()));

    assert_eq!(scenario.manager.token(), SCENARIO_TOKEN);
    assert_eq!(scenario.host.calls(), [HostCall::ResetViewhost { token: SCENARIO_TOKEN.to_string() }]);
}

#[test]
fn reset_drops_the_document_but_not_the_counter() {
    let (mut scenario, _root) = built();
    scenario.manager.reset();

    assert!(!scenario.manager.has_document());
    assert_eq!(scenario.manager.token(), "");
    assert_eq!(scenario.manager.last_seqno(), 6);

    scenario.manager.send_extension_event("aplext:demo:1", "OnTick", json!({}));
    assert_eq!(scenario.host.sent_seqnos(), [7]);
}
