//! Host that records everything the bridge tells it.
//!
//! Outbound messages are kept raw and decoded on demand. Downloads are served
//! from an in-memory resource table; unknown sources fail with an empty body.
//! An optional auto-reply hook answers chosen message types through the
//! manager's [`ReplyCorrelator`], standing in for a viewhost that
//! acknowledges blocking sends.

use std::{
    collections::{BTreeSet, HashMap},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use parking_lot::Mutex;
use serde_json::{Value, json};
use viewbridge_core::{CommandOutcome, ExtensionEvent, Host, RenderingEvent, ReplyCorrelator};

/// One host callback, in the order it was made.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    /// `reset_viewhost`
    ResetViewhost {
        /// Presentation token
        token: String,
    },
    /// `on_rendering_event`
    Rendering {
        /// Presentation token
        token: String,
        /// Milestone
        event: RenderingEvent,
    },
    /// `on_render_document_complete`
    RenderComplete {
        /// Presentation token
        token: String,
        /// Build succeeded
        success: bool,
        /// Error string, empty on success
        error: String,
    },
    /// `on_set_document_idle_timeout`
    IdleTimeout {
        /// Presentation token
        token: String,
        /// Timeout in milliseconds
        timeout_ms: i64,
    },
    /// `on_finish`
    Finish {
        /// Presentation token
        token: String,
    },
    /// `on_send_event`
    SendEvent {
        /// Presentation token
        token: String,
        /// Event payload
        payload: Value,
    },
    /// `on_data_source_fetch_request`
    DataSourceFetch {
        /// Presentation token
        token: String,
        /// Data source type
        source_type: String,
        /// Request payload
        payload: Value,
    },
    /// `on_extension_event`
    Extension {
        /// Presentation token
        token: String,
        /// Extension command
        event: ExtensionEvent,
    },
    /// `on_runtime_error`
    RuntimeError {
        /// Presentation token
        token: String,
        /// Error report
        payload: Value,
    },
    /// `on_activity_started`
    ActivityStarted {
        /// Presentation token
        token: String,
        /// Activity name
        activity: String,
    },
    /// `on_activity_ended`
    ActivityEnded {
        /// Presentation token
        token: String,
        /// Activity name
        activity: String,
    },
    /// `on_command_execution_complete`
    CommandComplete {
        /// Presentation token
        token: String,
        /// How the sequence ended
        outcome: CommandOutcome,
        /// Completion message
        message: String,
    },
    /// `on_visual_context_available`
    VisualContext {
        /// Presentation token
        token: String,
        /// Request token passed to `provide_state`
        request: u32,
        /// Reported state
        state: Value,
    },
}

struct AutoReply {
    correlator: Arc<ReplyCorrelator>,
    kinds: BTreeSet<String>,
}

/// Recording [`Host`] implementation.
#[derive(Default)]
pub struct RecordingHost {
    sent: Mutex<Vec<String>>,
    calls: Mutex<Vec<HostCall>>,
    resources: Mutex<HashMap<String, String>>,
    downloads: Mutex<Vec<String>>,
    download_delay: Mutex<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    auto_reply: Mutex<Option<AutoReply>>,
    timezone_offset_ms: Mutex<i64>,
}

impl RecordingHost {
    /// Host with no resources and no auto-reply.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for downloads of `source`.
    pub fn add_resource(&self, source: impl Into<String>, body: impl Into<String>) {
        self.resources.lock().insert(source.into(), body.into());
    }

    /// Hold every download for `delay` before answering.
    pub fn set_download_delay(&self, delay: Duration) {
        *self.download_delay.lock() = delay;
    }

    /// Report `offset_ms` as the local time zone offset.
    pub fn set_timezone_offset_ms(&self, offset_ms: i64) {
        *self.timezone_offset_ms.lock() = offset_ms;
    }

    /// Acknowledge every outbound message whose type is in `kinds` by
    /// posting `{"seqno": n}` back through `correlator`.
    pub fn auto_reply(&self, correlator: Arc<ReplyCorrelator>, kinds: &[&str]) {
        let kinds = kinds.iter().map(|kind| (*kind).to_string()).collect();
        *self.auto_reply.lock() = Some(AutoReply { correlator, kinds });
    }

    /// Raw outbound messages.
    pub fn sent_raw(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    /// Decoded outbound messages. Messages that fail to decode become
    /// `Value::Null`.
    pub fn sent(&self) -> Vec<Value> {
        self.sent.lock().iter().map(|raw| serde_json::from_str(raw).unwrap_or(Value::Null)).collect()
    }

    /// Payloads of outbound messages of type `kind`.
    pub fn sent_of_kind(&self, kind: &str) -> Vec<Value> {
        self.sent()
            .into_iter()
            .filter(|message| message["type"] == kind)
            .map(|mut message| message["payload"].take())
            .collect()
    }

    /// Types of outbound messages in send order.
    pub fn sent_kinds(&self) -> Vec<String> {
        self.sent()
            .iter()
            .map(|message| message["type"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    /// Sequence numbers of outbound messages in send order.
    pub fn sent_seqnos(&self) -> Vec<u64> {
        self.sent().iter().filter_map(|message| message["seqno"].as_u64()).collect()
    }

    /// Error strings sent to the viewhost.
    pub fn errors(&self) -> Vec<String> {
        self.sent_of_kind("error")
            .into_iter()
            .filter_map(|payload| payload.as_str().map(str::to_string))
            .collect()
    }

    /// Host callbacks in call order.
    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().clone()
    }

    /// Render completions as `(success, error)`.
    pub fn render_completions(&self) -> Vec<(bool, String)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                HostCall::RenderComplete { success, error, .. } => Some((*success, error.clone())),
                _ => None,
            })
            .collect()
    }

    /// Sources requested through `download_resource`, in request order.
    pub fn downloads(&self) -> Vec<String> {
        self.downloads.lock().clone()
    }

    /// Highest number of downloads observed in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Forget recorded messages and callbacks.
    pub fn clear(&self) {
        self.sent.lock().clear();
        self.calls.lock().clear();
    }

    fn record(&self, call: HostCall) {
        self.calls.lock().push(call);
    }

    fn acknowledge(&self, message: &str) {
        let guard = self.auto_reply.lock();
        let Some(auto_reply) = guard.as_ref() else {
            return;
        };
        let Ok(decoded) = serde_json::from_str::<Value>(message) else {
            return;
        };
        let Some(kind) = decoded["type"].as_str() else {
            return;
        };
        if !auto_reply.kinds.contains(kind) {
            return;
        }

        let reply = json!({ "seqno": decoded["seqno"] }).to_string();
        if auto_reply.correlator.should_dispatch(&reply) {
            tracing::debug!(kind, "acknowledgement was not awaited");
        }
    }
}

impl Host for RecordingHost {
    fn send_message(&self, _token: &str, message: String) {
        self.sent.lock().push(message.clone());
        self.acknowledge(&message);
    }

    fn download_resource(&self, source: &str) -> String {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.downloads.lock().push(source.to_string());

        let delay = *self.download_delay.lock();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        let body = self.resources.lock().get(source).cloned().unwrap_or_default();

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        body
    }

    fn timezone_offset_ms(&self) -> i64 {
        *self.timezone_offset_ms.lock()
    }

    fn reset_viewhost(&self, token: &str) {
        self.record(HostCall::ResetViewhost { token: token.to_string() });
    }

    fn on_rendering_event(&self, token: &str, event: RenderingEvent) {
        self.record(HostCall::Rendering { token: token.to_string(), event });
    }

    fn on_render_document_complete(&self, token: &str, success: bool, error: &str) {
        self.record(HostCall::RenderComplete {
            token: token.to_string(),
            success,
            error: error.to_string(),
        });
    }

    fn on_set_document_idle_timeout(&self, token: &str, timeout_ms: i64) {
        self.record(HostCall::IdleTimeout { token: token.to_string(), timeout_ms });
    }

    fn on_finish(&self, token: &str) {
        self.record(HostCall::Finish { token: token.to_string() });
    }

    fn on_send_event(&self, token: &str, payload: &Value) {
        self.record(HostCall::SendEvent { token: token.to_string(), payload: payload.clone() });
    }

    fn on_data_source_fetch_request(&self, token: &str, source_type: &str, payload: &Value) {
        self.record(HostCall::DataSourceFetch {
            token: token.to_string(),
            source_type: source_type.to_string(),
            payload: payload.clone(),
        });
    }

    fn on_extension_event(&self, token: &str, event: ExtensionEvent) {
        self.record(HostCall::Extension { token: token.to_string(), event });
    }

    fn on_runtime_error(&self, token: &str, payload: &Value) {
        self.record(HostCall::RuntimeError { token: token.to_string(), payload: payload.clone() });
    }

    fn on_activity_started(&self, token: &str, activity: &str) {
        self.record(HostCall::ActivityStarted {
            token: token.to_string(),
            activity: activity.to_string(),
        });
    }

    fn on_activity_ended(&self, token: &str, activity: &str) {
        self.record(HostCall::ActivityEnded {
            token: token.to_string(),
            activity: activity.to_string(),
        });
    }

    fn on_command_execution_complete(&self, token: &str, outcome: CommandOutcome, message: &str) {
        self.record(HostCall::CommandComplete {
            token: token.to_string(),
            outcome,
            message: message.to_string(),
        });
    }

    fn on_visual_context_available(&self, token: &str, state_request_token: u32, state: &Value) {
        self.record(HostCall::VisualContext {
            token: token.to_string(),
            request: state_request_token,
            state: state.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_resource_is_empty() {
        let host = RecordingHost::new();
        host.add_resource("https://a", "{}");
        assert_eq!(host.download_resource("https://a"), "{}");
        assert_eq!(host.download_resource("https://b"), "");
        assert_eq!(host.downloads(), ["https://a", "https://b"]);
        assert_eq!(host.max_in_flight(), 1);
    }

    #[test]
    fn auto_reply_answers_chosen_kinds() {
        let host = RecordingHost::new();
        let correlator = Arc::new(ReplyCorrelator::new());
        host.auto_reply(Arc::clone(&correlator), &["reHierarchy"]);

        let waiter = correlator.expect(4);
        host.send_message("t", r#"{"type":"dirty","seqno":3,"payload":[]}"#.to_string());
        assert!(correlator.is_expecting());
        host.send_message("t", r#"{"type":"reHierarchy","seqno":4,"payload":{}}"#.to_string());

        assert!(waiter.wait(Duration::from_millis(10)).is_some());
        assert_eq!(host.sent_kinds(), ["dirty", "reHierarchy"]);
    }
}
