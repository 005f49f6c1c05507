//! Replay of recorded viewhost traffic against a simulated document.
//!
//! A script is JSON lines. Lines with a `type` member are inbound messages
//! delivered as-is. Directive lines drive the host side:
//!
//! - `{"tick": 16}` advances the clock and runs one update tick
//! - `{"supportedViewports": [...]}` replaces the viewport candidates
//! - `{"executeCommands": [...]}` runs host-initiated commands
//!
//! Blank lines and lines starting with `#` are skipped.

use std::time::Duration;

use serde_json::{Value, json};
use thiserror::Error;
use viewbridge_core::PackageError;

use crate::{SimDocument, SimEngine, scenario::Scenario};

/// Errors that stop a replay before it starts.
#[derive(Error, Debug)]
pub enum ReplayError {
    /// Script line is not a recognized step
    #[error("line {line}: {reason}")]
    Script {
        /// One-based line number
        line: usize,
        /// What is wrong with it
        reason: String,
    },

    /// Manager could not be created
    #[error("manager setup failed: {0}")]
    Setup(#[from] PackageError),
}

/// One step of a replay script.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Raw inbound message
    Inbound(String),
    /// Advance the clock by this much and tick
    Tick(Duration),
    /// Supported viewports JSON array
    Viewports(String),
    /// Command array for `execute_commands`
    Commands(Value),
}

/// Parse a replay script.
pub fn parse_script(text: &str) -> Result<Vec<Step>, ReplayError> {
    let mut steps = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let script_error = |reason: String| ReplayError::Script { line: index + 1, reason };

        let value: Value = serde_json::from_str(line).map_err(|e| script_error(e.to_string()))?;
        let Value::Object(fields) = &value else {
            return Err(script_error("not a json object".to_string()));
        };

        let step = if fields.contains_key("type") {
            Step::Inbound(line.to_string())
        } else if let Some(tick) = fields.get("tick") {
            let millis = tick.as_u64().ok_or_else(|| script_error("tick is not a count of milliseconds".to_string()))?;
            Step::Tick(Duration::from_millis(millis))
        } else if let Some(viewports) = fields.get("supportedViewports") {
            Step::Viewports(viewports.to_string())
        } else if let Some(commands) = fields.get("executeCommands") {
            Step::Commands(commands.clone())
        } else {
            return Err(script_error("unrecognized step".to_string()));
        };
        steps.push(step);
    }
    Ok(steps)
}

/// What a replay produced.
#[derive(Debug, Clone, Default)]
pub struct ReplayOutcome {
    /// Encoded outbound messages in send order
    pub outbound: Vec<String>,
    /// Error strings sent to the viewhost
    pub errors: Vec<String>,
    /// Render completions as `(success, error)`
    pub render_completions: Vec<(bool, String)>,
    /// Inflation attempts made by the engine
    pub inflation_attempts: usize,
}

/// Replay `steps` against `document`, running a frame after every inbound
/// message as the update timer would.
pub fn replay(document: SimDocument, steps: &[Step], frame: Duration) -> Result<ReplayOutcome, ReplayError> {
    let engine = SimEngine::new(document.spec().main_template.clone());
    let mut scenario = Scenario::new(engine)?;
    scenario.load(document);

    for step in steps {
        match step {
            Step::Inbound(raw) => {
                scenario.deliver(raw);
                scenario.tick(frame);
            },
            Step::Tick(by) => scenario.tick(*by),
            Step::Viewports(raw) => scenario.manager.set_supported_viewports(raw),
            Step::Commands(commands) => {
                let commands = json!({ "commands": commands }).to_string();
                scenario.manager.execute_commands(&commands, crate::scenario::SCENARIO_TOKEN);
            },
        }
    }

    tracing::info!(
        steps = steps.len(),
        sent = scenario.host.sent_raw().len(),
        last_seqno = scenario.manager.last_seqno(),
        "replay finished"
    );
    Ok(ReplayOutcome {
        outbound: scenario.host.sent_raw(),
        errors: scenario.host.errors(),
        render_completions: scenario.host.render_completions(),
        inflation_attempts: scenario.engine.attempts().len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DocumentSpec;

    #[test]
    fn script_steps() {
        let steps = parse_script(
            "# warm up\n\
             {\"supportedViewports\": []}\n\
             \n\
             {\"type\": \"build\", \"payload\": {}}\n\
             {\"tick\": 16}\n\
             {\"executeCommands\": [{\"type\": \"Idle\"}]}\n",
        )
        .expect("script parses");

        assert_eq!(steps.len(), 4);
        assert_eq!(steps[0], Step::Viewports("[]".to_string()));
        assert!(matches!(steps[1], Step::Inbound(_)));
        assert_eq!(steps[2], Step::Tick(Duration::from_millis(16)));
    }

    #[test]
    fn unknown_directive_names_its_line() {
        let err = parse_script("{\"tick\": 1}\n{\"jump\": true}").expect_err("rejected");
        assert!(matches!(err, ReplayError::Script { line: 2, .. }));
    }

    #[test]
    fn build_then_render() {
        let steps = parse_script(
            r#"{"type": "build", "payload": {"width": 100, "height": 100, "dpi": 160, "shape": "RECTANGLE", "mode": "HUB"}}"#,
        )
        .expect("script parses");
        let outcome = replay(SimDocument::new(DocumentSpec::default()), &steps, Duration::from_millis(16))
            .expect("replay runs");

        assert_eq!(outcome.render_completions, [(true, String::new())]);
        assert_eq!(outcome.inflation_attempts, 1);
        assert!(outcome.errors.is_empty());
    }
}
