//! Work queued for the manager task.

use serde_json::{Map, Value};
use tokio::sync::oneshot;
use viewbridge_core::{ConnectionManager, DocumentState, Environment, Host, engine::Content};

/// One unit of work for the manager task.
///
/// Commands run in the order they were queued, interleaved with update ticks.
pub enum Command {
    /// Inbound viewhost message that already passed reply interception
    Inbound(String),
    /// Install content for a presentation
    SetContent {
        /// Document content
        content: Box<dyn Content>,
        /// Presentation token
        token: String,
    },
    /// Replace the supported viewport candidates (JSON array)
    SetSupportedViewports(String),
    /// Run host-initiated commands
    ExecuteCommands {
        /// `{"commands": [...]}` document
        commands: String,
        /// Token reported back on completion
        token: String,
    },
    /// Cancel running commands
    InterruptCommandSequence,
    /// Forward a data source update to its provider
    DataSourceUpdate {
        /// Provider type
        source_type: String,
        /// Update payload (JSON)
        payload: String,
        /// Presentation token
        token: String,
    },
    /// Report visual context to the host
    ProvideState(u32),
    /// Settle a pending extension event
    ExtensionEventResult {
        /// Pending event token
        token: u32,
        /// Whether the extension handled the event
        succeeded: bool,
    },
    /// Send an extension event to the viewhost
    SendExtensionEvent {
        /// Extension uri
        uri: String,
        /// Event name
        name: String,
        /// Event parameters
        params: Value,
    },
    /// Run a document extension event handler
    InvokeExtensionEventHandler {
        /// Extension uri
        uri: String,
        /// Handler name
        name: String,
        /// Handler data
        data: Map<String, Value>,
        /// Run in fast mode
        fast_mode: bool,
    },
    /// Capture the active document for a later restore
    ActiveDocumentState(oneshot::Sender<Option<DocumentState>>),
    /// Resume a captured document on the next build
    RestoreDocumentState(DocumentState),
    /// Drop the session
    Reset,
    /// Answer once every earlier command has run
    Flush(oneshot::Sender<()>),
    /// Stop the manager task
    Shutdown,
}

impl Command {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Inbound(_) => "inbound",
            Self::SetContent { .. } => "set_content",
            Self::SetSupportedViewports(_) => "set_supported_viewports",
            Self::ExecuteCommands { .. } => "execute_commands",
            Self::InterruptCommandSequence => "interrupt_command_sequence",
            Self::DataSourceUpdate { .. } => "data_source_update",
            Self::ProvideState(_) => "provide_state",
            Self::ExtensionEventResult { .. } => "extension_event_result",
            Self::SendExtensionEvent { .. } => "send_extension_event",
            Self::InvokeExtensionEventHandler { .. } => "invoke_extension_event_handler",
            Self::ActiveDocumentState(_) => "active_document_state",
            Self::RestoreDocumentState(_) => "restore_document_state",
            Self::Reset => "reset",
            Self::Flush(_) => "flush",
            Self::Shutdown => "shutdown",
        }
    }

    /// Run the command against `manager`.
    ///
    /// `Shutdown` is handled by the task loop and does nothing here.
    pub fn apply<E: Environment, H: Host>(self, manager: &mut ConnectionManager<E, H>) {
        match self {
            Self::Inbound(raw) => manager.dispatch(&raw),
            Self::SetContent { content, token } => manager.set_content(content, &token),
            Self::SetSupportedViewports(raw) => manager.set_supported_viewports(&raw),
            Self::ExecuteCommands { commands, token } => manager.execute_commands(&commands, &token),
            Self::InterruptCommandSequence => manager.interrupt_command_sequence(),
            Self::DataSourceUpdate { source_type, payload, token } => {
                manager.data_source_update(&source_type, &payload, &token);
            },
            Self::ProvideState(request) => manager.provide_state(request),
            Self::ExtensionEventResult { token, succeeded } => {
                manager.on_extension_event_result(token, succeeded);
            },
            Self::SendExtensionEvent { uri, name, params } => {
                manager.send_extension_event(&uri, &name, params);
            },
            Self::InvokeExtensionEventHandler { uri, name, data, fast_mode } => {
                manager.invoke_extension_event_handler(&uri, &name, &data, fast_mode);
            },
            Self::ActiveDocumentState(reply) => {
                if reply.send(manager.active_document_state()).is_err() {
                    tracing::warn!("document state requester went away; state dropped");
                }
            },
            Self::RestoreDocumentState(state) => manager.restore_document_state(state),
            Self::Reset => manager.reset(),
            Self::Flush(reply) => {
                if reply.send(()).is_err() {
                    tracing::debug!("flush requester went away");
                }
            },
            Self::Shutdown => {},
        }
    }
}
