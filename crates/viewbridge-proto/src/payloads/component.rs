//! Payloads that target a single component by id.

use serde::Deserialize;

/// Value written by an `update` message.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum UpdateValue {
    /// Text value (edit text)
    Text(String),
    /// Numeric value (scroll position, pager index, ...)
    Number(f64),
}

/// `update` payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ComponentUpdate {
    /// Component id
    pub id: String,
    /// Engine update type code
    #[serde(rename = "type")]
    pub update_type: i64,
    /// New value
    pub value: UpdateValue,
}

/// `updateGraphic` payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GraphicUpdate {
    /// Component id
    pub id: String,
    /// Vector graphic source
    pub avg: String,
}

/// `ensureLayout` payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ComponentTarget {
    /// Component id
    pub id: String,
}

/// `scrollToRectInComponent` payload.
///
/// Coordinates are in viewhost units and default to 0.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScrollToRect {
    /// Component id
    pub id: String,
    /// Left edge
    #[serde(default)]
    pub x: Option<f64>,
    /// Top edge
    #[serde(default)]
    pub y: Option<f64>,
    /// Width
    #[serde(default)]
    pub width: Option<f64>,
    /// Height
    #[serde(default)]
    pub height: Option<f64>,
    /// Engine scroll alignment code
    pub align: i64,
}

impl ScrollToRect {
    /// Target rectangle with missing coordinates zeroed.
    pub fn rect(&self) -> super::Rect {
        super::Rect {
            x: self.x.unwrap_or(0.0),
            y: self.y.unwrap_or(0.0),
            width: self.width.unwrap_or(0.0),
            height: self.height.unwrap_or(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn update_value_is_text_or_number() {
        let text: ComponentUpdate =
            serde_json::from_value(json!({"id": "a", "type": 0, "value": "hi"})).expect("parses");
        assert_eq!(text.value, UpdateValue::Text("hi".into()));

        let number: ComponentUpdate =
            serde_json::from_value(json!({"id": "a", "type": 1, "value": 12.5})).expect("parses");
        assert_eq!(number.value, UpdateValue::Number(12.5));
    }

    #[test]
    fn scroll_rect_zero_fills() {
        let scroll: ScrollToRect =
            serde_json::from_value(json!({"id": "list", "y": 40, "align": 2})).expect("parses");
        let rect = scroll.rect();
        assert!((rect.y - 40.0).abs() < f64::EPSILON);
        assert!(rect.x.abs() < f64::EPSILON);
    }
}
