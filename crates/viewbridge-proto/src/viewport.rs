//! Viewport vocabulary shared by build requests and the scaling policy.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{ProtocolError, Result};

/// Physical screen shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViewportShape {
    /// Round screen
    Round,
    /// Rectangular screen
    Rectangle,
}

impl ViewportShape {
    /// Parse a wire name (`ROUND`, `RECTANGLE`).
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "ROUND" => Ok(Self::Round),
            "RECTANGLE" => Ok(Self::Rectangle),
            other => Err(ProtocolError::UnknownShape(other.to_string())),
        }
    }
}

/// Device operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViewportMode {
    /// Countertop hub
    Hub,
    /// Television
    Tv,
    /// Mobile device
    Mobile,
    /// Vehicle
    Auto,
    /// Desktop or laptop
    Pc,
}

impl ViewportMode {
    /// Parse a wire name (`HUB`, `TV`, `MOBILE`, `AUTO`, `PC`).
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "HUB" => Ok(Self::Hub),
            "TV" => Ok(Self::Tv),
            "MOBILE" => Ok(Self::Mobile),
            "AUTO" => Ok(Self::Auto),
            "PC" => Ok(Self::Pc),
            other => Err(ProtocolError::UnknownMode(other.to_string())),
        }
    }
}

/// Accessibility screen mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScreenMode {
    /// Default rendering
    Normal,
    /// High contrast rendering
    HighContrast,
}

impl ScreenMode {
    /// Parse a wire name (`normal`, `high-contrast`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "normal" => Some(Self::Normal),
            "high-contrast" => Some(Self::HighContrast),
            _ => None,
        }
    }
}

/// One candidate viewport size range used by the scaling policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportSpec {
    /// Minimum width in dp
    pub min_width: f64,
    /// Maximum width in dp
    pub max_width: f64,
    /// Minimum height in dp
    pub min_height: f64,
    /// Maximum height in dp
    pub max_height: f64,
    /// Mode this range applies to
    pub mode: ViewportMode,
    /// Whether the range targets a round screen
    pub round: bool,
}

impl ViewportSpec {
    /// Build a spec from one element of a supported-viewports array.
    ///
    /// Missing bounds default to `1..=i32::MAX`, missing mode to `HUB`. Mode
    /// names are case-insensitive; `shape` is required.
    pub fn from_value(value: &Value) -> Result<Self> {
        let bound = |key: &str, default: f64| -> Result<f64> {
            match value.get(key) {
                None => Ok(default),
                Some(v) => v.as_f64().ok_or(ProtocolError::InvalidField {
                    kind: "supportedViewports",
                    reason: "bound is not a number",
                }),
            }
        };

        let mode = match value.get("mode") {
            None => ViewportMode::Hub,
            Some(Value::String(mode)) => ViewportMode::from_name(&mode.to_ascii_uppercase())?,
            Some(_) => {
                return Err(ProtocolError::InvalidField {
                    kind: "supportedViewports",
                    reason: "mode is not a string",
                });
            },
        };

        let shape = value.get("shape").and_then(Value::as_str).ok_or(ProtocolError::InvalidField {
            kind: "supportedViewports",
            reason: "shape is missing",
        })?;

        Ok(Self {
            min_width: bound("minWidth", 1.0)?,
            max_width: bound("maxWidth", f64::from(i32::MAX))?,
            min_height: bound("minHeight", 1.0)?,
            max_height: bound("maxHeight", f64::from(i32::MAX))?,
            mode,
            round: ViewportShape::from_name(shape)? == ViewportShape::Round,
        })
    }

    /// Parse a JSON array of viewport specifications.
    ///
    /// All-or-nothing: one malformed element rejects the whole set.
    pub fn parse_list(raw: &str) -> Result<Vec<Self>> {
        let doc: Value = serde_json::from_str(raw)?;
        let Value::Array(items) = doc else {
            return Err(ProtocolError::InvalidField {
                kind: "supportedViewports",
                reason: "unexpected json document type",
            });
        };
        items.iter().map(Self::from_value).collect()
    }

    /// Whether `width` x `height` (dp) falls inside this range.
    pub fn contains(&self, width: f64, height: f64) -> bool {
        (self.min_width..=self.max_width).contains(&width)
            && (self.min_height..=self.max_height).contains(&height)
    }
}
