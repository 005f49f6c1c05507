//! Operations invoked by the embedding application.

use std::sync::Arc;

use serde_json::{Map, Value, json};
use viewbridge_proto::{
    Outbound, OutboundKind, ViewportSpec, payloads::config::ConfigurationChange,
};

use super::ConnectionManager;
use crate::{
    engine::{Content, Resolution},
    env::Environment,
    host::{APL_COMMAND_EXECUTION, CommandOutcome, Host},
    session::DocumentState,
};

/// Prefix of the version reported with visual context.
const CLIENT_VERSION_PREFIX: &str = "AplClientLibrary-";

impl<E: Environment, H: Host> ConnectionManager<E, H> {
    /// Install new content for presentation `token`.
    pub fn set_content(&mut self, content: Box<dyn Content>, token: &str) {
        tracing::info!(token, "content set");
        self.session.content = Some(content);
        self.session.token = token.to_string();
        self.session.configuration_change = ConfigurationChange::default();
        self.host.reset_viewhost(token);
    }

    /// Replace the candidate viewport specifications from a JSON array.
    ///
    /// A malformed set is rejected whole and the previous set kept.
    pub fn set_supported_viewports(&mut self, raw: &str) {
        match ViewportSpec::parse_list(raw) {
            Ok(specs) => {
                tracing::debug!(count = specs.len(), "supported viewports set");
                self.session.viewport_specs = specs;
            },
            Err(e) => tracing::error!(error = %e, "supported viewports rejected"),
        }
    }

    /// Run a command array from `{"commands": [...]}` and report how it
    /// ends through [`Host::on_command_execution_complete`].
    pub fn execute_commands(&mut self, commands: &str, token: &str) {
        let Some(root) = self.session.root.as_mut() else {
            command_failed(self.host.as_ref(), token, "Root context is missing");
            return;
        };
        let document: Value = match serde_json::from_str(commands) {
            Ok(document) => document,
            Err(e) => {
                tracing::debug!(error = %e, "commands are not json");
                command_failed(self.host.as_ref(), token, "Parse commands failed");
                return;
            },
        };
        let Some(commands) = document.get("commands").filter(|commands| commands.is_array()) else {
            command_failed(self.host.as_ref(), token, "Missing commands, or is not array");
            return;
        };
        let Some(action) = root.execute_commands(commands, false) else {
            command_failed(self.host.as_ref(), token, "APL Core could not process commands");
            return;
        };

        self.host.on_activity_started(token, APL_COMMAND_EXECUTION);
        if action.is_pending() {
            let (host, owner) = (Arc::clone(&self.host), token.to_string());
            action.then(Box::new(move || {
                command_finished(host.as_ref(), &owner, CommandOutcome::Resolved);
            }));
            let (host, owner) = (Arc::clone(&self.host), token.to_string());
            action.add_terminate_callback(Box::new(move || {
                command_finished(host.as_ref(), &owner, CommandOutcome::Terminated);
            }));
        } else if action.is_resolved() {
            command_finished(self.host.as_ref(), token, CommandOutcome::Resolved);
        } else if action.is_terminated() {
            command_finished(self.host.as_ref(), token, CommandOutcome::Terminated);
        }
    }

    /// Cancel running command sequences.
    pub fn interrupt_command_sequence(&mut self) {
        if let Some(root) = self.session.root.as_mut() {
            root.cancel_execution();
        }
    }

    /// Hand a data source update to its provider.
    pub fn data_source_update(&mut self, source_type: &str, payload: &str, token: &str) {
        let Some(root) = self.session.root.as_mut() else {
            tracing::error!(token, "data source update: root context is missing");
            return;
        };
        match root.process_data_source_update(source_type, payload) {
            None => tracing::error!(token, source_type, "unknown provider requested"),
            Some(true) => {},
            Some(false) => {
                tracing::warn!(token, source_type, "update is not processed");
                self.check_and_send_data_source_errors();
            },
        }
    }

    /// Report document state to the host for request `request_token`.
    ///
    /// Works without a document; contexts are then empty.
    pub fn provide_state(&mut self, request_token: u32) {
        let (visual, data_sources) = match self.session.root.as_ref() {
            Some(root) => (root.serialize_visual_context(), root.serialize_data_source_context()),
            None => {
                tracing::error!("provide state: root context is missing");
                (json!({}), json!([]))
            },
        };
        let token = self.session.token.clone();
        let state = json!({
            "token": token,
            "version": format!("{CLIENT_VERSION_PREFIX}{}", self.engine.reported_version()),
            "componentsVisibleOnScreen": [visual],
            "dataSources": data_sources,
        });
        self.host.on_visual_context_available(&token, request_token, &state);
    }

    /// Result of a legacy extension command raised with `token`.
    pub fn on_extension_event_result(&mut self, token: u32, succeeded: bool) {
        if self.session.root.is_none() {
            tracing::error!(token, "extension result: root context is missing");
            return;
        }
        let argument = if succeeded { 0 } else { 1 };
        if !self.pending.resolve(token, Resolution::Argument(argument)) {
            tracing::debug!(token, "extension result for an event that is not pending");
        }
        self.flush_terminations();
    }

    /// Send an extension event to the viewhost.
    pub fn send_extension_event(&mut self, uri: &str, name: &str, params: Value) {
        self.send(Outbound::new(
            OutboundKind::Extension,
            json!({ "URI": uri, "type": "event", "name": name, "params": params }),
        ));
    }

    /// Invoke a document-side extension event handler.
    pub fn invoke_extension_event_handler(
        &mut self,
        uri: &str,
        name: &str,
        data: &Map<String, Value>,
        fast_mode: bool,
    ) {
        let result = self.call_extension_handler(uri, name, data, fast_mode);
        self.report("invokeExtensionEventHandler", result);
        self.flush_terminations();
    }

    /// Detach the current document so it can be restored later.
    ///
    /// Leaves the manager reset. `None` when no document is inflated.
    pub fn active_document_state(&mut self) -> Option<DocumentState> {
        let complete = self.session.root.is_some()
            && self.session.content.is_some()
            && self.session.scaled.is_some()
            && self.session.root_config.is_some();
        if !complete {
            tracing::error!("document state: no active document");
            return None;
        }
        let (Some(root), Some(content), Some(scaled), Some(root_config)) = (
            self.session.root.take(),
            self.session.content.take(),
            self.session.scaled,
            self.session.root_config.clone(),
        ) else {
            return None;
        };
        let state = DocumentState {
            token: std::mem::take(&mut self.session.token),
            root,
            content,
            scaled,
            root_config,
            configuration_change: ConfigurationChange::default(),
        };
        self.reset();
        Some(state)
    }

    /// Queue `state` for the next build, carrying the configuration changes
    /// seen since content was set.
    pub fn restore_document_state(&mut self, mut state: DocumentState) {
        state.configuration_change = self.session.configuration_change.clone();
        let token = state.token.clone();
        tracing::info!(%token, "document state queued for restore");
        self.session.restore = Some(state);
        self.reset();
        self.host.reset_viewhost(&token);
    }

    /// Tear down the document.
    pub fn reset(&mut self) {
        tracing::debug!(token = %self.session.token, "reset");
        self.session.reset();
    }
}

fn command_failed<H: Host>(host: &H, token: &str, reason: &str) {
    tracing::error!(token, reason, "execute commands failed");
    host.on_command_execution_complete(token, CommandOutcome::Failed, reason);
}

fn command_finished<H: Host>(host: &H, token: &str, outcome: CommandOutcome) {
    let message = match outcome {
        CommandOutcome::Resolved => "Command sequence completed",
        CommandOutcome::Terminated | CommandOutcome::Failed => "Command sequence terminated",
    };
    host.on_command_execution_complete(token, outcome, message);
    host.on_activity_ended(token, APL_COMMAND_EXECUTION);
}
