//! Capabilities provided by the embedding application.
//!
//! The host owns the transport to the viewhost, performs downloads, and
//! receives document lifecycle notifications. Only [`Host::send_message`]
//! and [`Host::download_resource`] are required; every notification defaults
//! to a no-op.
//!
//! `download_resource` runs on download worker threads, everything else on
//! the bridge's serialized context.

use serde_json::Value;

/// Activity held while the document keeps the screen on.
pub const APL_SCREEN_LOCK: &str = "APLScreenLock";

/// Activity held while a host-initiated command sequence runs.
pub const APL_COMMAND_EXECUTION: &str = "APLCommandExecution";

/// Document rendering milestones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderingEvent {
    /// Build started
    InflateBegin,
    /// Build finished inflating, successful or not
    InflateEnd,
}

/// How a host-initiated command sequence ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandOutcome {
    /// Commands ran to completion
    Resolved,
    /// The engine terminated the sequence
    Terminated,
    /// Commands were never started
    Failed,
}

/// Extension command raised by a document in legacy mode.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionEvent {
    /// Extension uri
    pub uri: String,
    /// Command name
    pub name: String,
    /// Originating component
    pub source: Value,
    /// Command parameters
    pub params: Value,
    /// Token to pass back to `on_extension_event_result`
    pub token: u32,
    /// The document waits for a result
    pub expects_result: bool,
}

/// Embedding application.
#[allow(unused_variables)]
pub trait Host: Send + Sync + 'static {
    /// Deliver an encoded message to the viewhost for presentation `token`.
    fn send_message(&self, token: &str, message: String);

    /// Fetch a resource. An empty string means failure.
    fn download_resource(&self, source: &str) -> String;

    /// Local time zone offset in milliseconds.
    fn timezone_offset_ms(&self) -> i64 {
        0
    }

    /// The viewhost should discard its state for presentation `token`.
    fn reset_viewhost(&self, token: &str) {}

    /// Rendering milestone.
    fn on_rendering_event(&self, token: &str, event: RenderingEvent) {}

    /// Build finished.
    fn on_render_document_complete(&self, token: &str, success: bool, error: &str) {}

    /// Idle timeout declared by the document.
    fn on_set_document_idle_timeout(&self, token: &str, timeout_ms: i64) {}

    /// Document ran its finish command.
    fn on_finish(&self, token: &str) {}

    /// User event for the skill backend.
    fn on_send_event(&self, token: &str, payload: &Value) {}

    /// Data source fetch request.
    fn on_data_source_fetch_request(&self, token: &str, source_type: &str, payload: &Value) {}

    /// Extension command in legacy mode.
    fn on_extension_event(&self, token: &str, event: ExtensionEvent) {}

    /// Runtime errors reported by data source providers.
    fn on_runtime_error(&self, token: &str, payload: &Value) {}

    /// Activity started.
    fn on_activity_started(&self, token: &str, activity: &str) {}

    /// Activity ended.
    fn on_activity_ended(&self, token: &str, activity: &str) {}

    /// Host-initiated command sequence finished.
    fn on_command_execution_complete(&self, token: &str, outcome: CommandOutcome, message: &str) {}

    /// Visual context requested through `provide_state`.
    fn on_visual_context_available(&self, token: &str, state_request_token: u32, state: &Value) {}
}
