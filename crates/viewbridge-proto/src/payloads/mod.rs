//! Typed payloads.
//!
//! Strict payloads derive `Deserialize` and reject the message when a required
//! field is missing. Payloads whose fields are applied individually
//! ([`config::ConfigurationChange`], [`event::EventResponse`],
//! [`media::MediaUpdate`]) are read leniently from a `serde_json::Value`: bad
//! fields are skipped, the rest still apply.

pub mod build;
pub mod component;
pub mod config;
pub mod event;
pub mod extension;
pub mod input;
pub mod media;

use serde::{Deserialize, Serialize};

/// Rectangle in viewhost or core units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge
    pub x: f64,
    /// Top edge
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl Rect {
    /// Multiply every coordinate by `factor`.
    pub fn scaled(self, factor: f64) -> Self {
        Self {
            x: self.x * factor,
            y: self.y * factor,
            width: self.width * factor,
            height: self.height * factor,
        }
    }

    /// Read `{x, y, width, height}`, defaulting non-numeric members to 0.
    pub fn from_value(value: &serde_json::Value) -> Self {
        let num = |key: &str| value.get(key).and_then(serde_json::Value::as_f64).unwrap_or(0.0);
        Self { x: num("x"), y: num("y"), width: num("width"), height: num("height") }
    }
}

/// Request carrying only a correlation id, answered with a reply message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    /// Viewhost correlation id echoed in the reply
    pub message_id: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn rect_defaults_missing_members() {
        let rect = Rect::from_value(&json!({"x": 2, "width": "wide", "height": 8}));
        assert_eq!(rect, Rect { x: 2.0, y: 0.0, width: 0.0, height: 8.0 });
    }

    #[test]
    fn rect_scaling() {
        let rect = Rect { x: 10.0, y: 20.0, width: 30.0, height: 40.0 }.scaled(0.5);
        assert_eq!(rect, Rect { x: 5.0, y: 10.0, width: 15.0, height: 20.0 });
    }
}
