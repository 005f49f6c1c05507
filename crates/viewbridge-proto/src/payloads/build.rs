//! Build request payload.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::viewport::{ViewportMode, ViewportShape};

/// Animation quality hint passed to the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AnimationQuality {
    /// No animations
    None,
    /// Reduced animations
    Slow,
    /// Full animations
    #[default]
    Normal,
}

impl AnimationQuality {
    /// Map a wire code (0 none, 1 slow, 2 normal).
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::None),
            1 => Some(Self::Slow),
            2 => Some(Self::Normal),
            _ => None,
        }
    }
}

/// `build` payload: inflate the current content for a viewport.
///
/// Viewport fields are required. Everything else has a default.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildRequest {
    /// Reported agent name
    #[serde(default = "default_agent_name")]
    pub agent_name: String,
    /// Reported agent version
    #[serde(default = "default_agent_version")]
    pub agent_version: String,
    /// Allow `OpenURL` commands
    #[serde(default)]
    pub allow_open_url: bool,
    /// Disable video components
    #[serde(default)]
    pub disallow_video: bool,
    /// Disable dialogs
    #[serde(default)]
    pub disallow_dialog: bool,
    /// Disable edit text components
    #[serde(default)]
    pub disallow_edit_text: bool,
    /// Default scroll command duration in milliseconds
    #[serde(default = "default_scroll_command_duration")]
    pub scroll_command_duration: f64,
    /// Animation quality; unknown or non-integer codes fall back to normal
    #[serde(default, deserialize_with = "lenient_animation_quality")]
    pub animation_quality: AnimationQuality,
    /// Extensions supported by the viewhost: strings or `{uri, flags}`
    /// objects, validated entry by entry during the build
    #[serde(default)]
    pub supported_extensions: Value,
    /// Viewport width in pixels
    pub width: i32,
    /// Viewport height in pixels
    pub height: i32,
    /// Viewport density
    pub dpi: i32,
    /// Viewport shape
    #[serde(deserialize_with = "shape_by_name")]
    pub shape: ViewportShape,
    /// Viewport mode
    #[serde(deserialize_with = "mode_by_name")]
    pub mode: ViewportMode,
}

fn default_agent_name() -> String {
    "wssHost".to_string()
}

fn default_agent_version() -> String {
    "1.0".to_string()
}

fn default_scroll_command_duration() -> f64 {
    1000.0
}

fn lenient_animation_quality<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<AnimationQuality, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_i64().and_then(AnimationQuality::from_code).unwrap_or_default())
}

fn shape_by_name<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ViewportShape, D::Error> {
    let name = String::deserialize(deserializer)?;
    ViewportShape::from_name(&name).map_err(serde::de::Error::custom)
}

fn mode_by_name<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ViewportMode, D::Error> {
    let name = String::deserialize(deserializer)?;
    ViewportMode::from_name(&name).map_err(serde::de::Error::custom)
}
