//! Event response payload.

use serde_json::Value;

use super::Rect;

/// `response` payload: the viewhost finished handling a forwarded event.
#[derive(Debug, Clone, PartialEq)]
pub struct EventResponse {
    /// Token of the pending event; `None` when absent or not an integer
    pub event: Option<i64>,
    /// Rectangle argument in viewhost units
    pub rect: Option<Rect>,
    /// Integer argument
    pub argument: Option<i64>,
}

impl EventResponse {
    /// Read a response payload.
    pub fn from_value(value: &Value) -> Self {
        Self {
            event: value.get("event").and_then(Value::as_i64),
            rect: value.get("rectArgument").map(Rect::from_value),
            argument: value.get("argument").and_then(Value::as_i64),
        }
    }
}
