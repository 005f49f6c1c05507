//! Configuration change payload.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::viewport::{ScreenMode, ViewportMode};

/// Runtime configuration change.
///
/// Every field is optional and applied on its own. Fields with the wrong type
/// or an unknown enum name are ignored, not rejected. Width and height only
/// apply when both are integers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConfigurationChange {
    /// New viewport size in pixels
    pub size: Option<(i32, i32)>,
    /// Document theme
    pub doc_theme: Option<String>,
    /// Viewport mode
    pub mode: Option<ViewportMode>,
    /// Font scale factor
    pub font_scale: Option<f64>,
    /// Screen mode
    pub screen_mode: Option<ScreenMode>,
    /// Screen reader enabled
    pub screen_reader: Option<bool>,
    /// Disable video components
    pub disallow_video: Option<bool>,
    /// Arbitrary environment values
    pub environment_values: Map<String, Value>,
}

impl ConfigurationChange {
    /// Read a change from a `configurationChange` payload.
    pub fn from_value(value: &Value) -> Self {
        let int = |key: &str| {
            value.get(key).and_then(Value::as_i64).and_then(|v| i32::try_from(v).ok())
        };
        let string = |key: &str| value.get(key).and_then(Value::as_str);
        let boolean = |key: &str| value.get(key).and_then(Value::as_bool);

        Self {
            size: int("width").zip(int("height")),
            doc_theme: string("docTheme").map(str::to_string),
            mode: string("mode").and_then(|m| ViewportMode::from_name(m).ok()),
            font_scale: value.get("fontScale").and_then(Value::as_f64),
            screen_mode: string("screenMode").and_then(ScreenMode::from_name),
            screen_reader: boolean("screenReader"),
            disallow_video: boolean("disallowVideo"),
            environment_values: value
                .get("environmentValues")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
        }
    }

    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        self.size.is_none()
            && self.doc_theme.is_none()
            && self.mode.is_none()
            && self.font_scale.is_none()
            && self.screen_mode.is_none()
            && self.screen_reader.is_none()
            && self.disallow_video.is_none()
            && self.environment_values.is_empty()
    }

    /// Fold a later change into this one; fields set in `later` win.
    pub fn merge(&mut self, later: &Self) {
        if later.size.is_some() {
            self.size = later.size;
        }
        if later.doc_theme.is_some() {
            self.doc_theme.clone_from(&later.doc_theme);
        }
        if later.mode.is_some() {
            self.mode = later.mode;
        }
        if later.font_scale.is_some() {
            self.font_scale = later.font_scale;
        }
        if later.screen_mode.is_some() {
            self.screen_mode = later.screen_mode;
        }
        if later.screen_reader.is_some() {
            self.screen_reader = later.screen_reader;
        }
        if later.disallow_video.is_some() {
            self.disallow_video = later.disallow_video;
        }
        for (key, value) in &later.environment_values {
            self.environment_values.insert(key.clone(), value.clone());
        }
    }
}
