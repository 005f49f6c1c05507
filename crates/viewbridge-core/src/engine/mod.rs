//! Document engine collaborator interface.
//!
//! The engine is opaque: it parses documents, owns the component tree, runs
//! layout and commands. The bridge only drives it through these traits. A
//! production build wires them to a real engine; the harness crate provides a
//! scripted simulation.
//!
//! # Ownership
//!
//! - [`Content`] is owned by the session and lent to the engine at inflate
//!   and reinflate time.
//! - [`RootContext`] is the inflated document, owned by the session.
//! - Components and actions are shared handles (`Arc`), since the engine
//!   keeps its own references.

mod action;
mod component;
mod extension;

use std::collections::{BTreeMap, BTreeSet};

pub use action::{Action, ActionRef, ResolveCallback, Resolution, TerminateCallback};
pub use component::{
    ChildAction, ChildChange, Component, ComponentRef, DirtyGraphicElement, DirtyProperty,
};
pub use extension::{ExtensionFlags, ExtensionGrant, ExtensionMediator, LegacyExtension, LoadCallback};
use serde_json::{Map, Value};
use viewbridge_proto::{
    ViewportMode, ViewportShape,
    payloads::{
        Rect, config::ConfigurationChange, input::KeyboardRequest, media::PlayerCallback,
    },
};

use crate::config::RootConfig;

/// Viewport metrics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metrics {
    /// Width in pixels
    pub width: f64,
    /// Height in pixels
    pub height: f64,
    /// Pixel density
    pub dpi: f64,
    /// Screen shape
    pub shape: ViewportShape,
    /// Device mode
    pub mode: ViewportMode,
}

/// Pixel density at which one pixel is one dp.
pub const CORE_DPI: f64 = 160.0;

impl Metrics {
    /// Width in dp.
    pub fn width_dp(&self) -> f64 {
        self.width * CORE_DPI / self.dpi
    }

    /// Height in dp.
    pub fn height_dp(&self) -> f64 {
        self.height * CORE_DPI / self.dpi
    }
}

/// Package the content is waiting on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImportRequest {
    /// Engine request id, unique within one content
    pub id: u32,
    /// Package name
    pub name: String,
    /// Package version
    pub version: String,
    /// Explicit source url, if the document gave one
    pub source: Option<String>,
}

/// Document background.
#[derive(Debug, Clone, PartialEq)]
pub enum Background {
    /// Solid color string
    Color(String),
    /// Serialized gradient
    Gradient(Value),
    /// Document declares no background
    None,
}

/// Parsed document plus the packages it imports.
pub trait Content: Send {
    /// Imports are still outstanding.
    fn is_waiting(&self) -> bool;

    /// Parsing or an import failed.
    fn is_error(&self) -> bool;

    /// Imports requested and not yet satisfied.
    fn requested_packages(&self) -> Vec<ImportRequest>;

    /// Provide the body of a requested import.
    fn add_package(&mut self, request: &ImportRequest, body: String);

    /// Document version string (`"1.0"`, `"2023.1"`, ...).
    fn document_version(&self) -> String;

    /// Re-evaluate the document against new metrics and configuration.
    fn refresh(&mut self, metrics: &Metrics, config: &RootConfig);

    /// Extension uris the document requests.
    fn requested_extensions(&self) -> BTreeSet<String>;

    /// Settings the document declares for the extension at `uri`.
    fn extension_settings(&self, uri: &str) -> Value;

    /// Document background for the given metrics.
    fn background(&self, metrics: &Metrics, config: &RootConfig) -> Background;

    /// Document supports viewport resizing.
    fn supports_resizing(&self) -> bool;

    /// Idle timeout in milliseconds; negative disables it.
    fn idle_timeout(&self, config: &RootConfig) -> i64;
}

/// Engine factory: turns content into an inflated document.
pub trait Engine: Send {
    /// Engine version reported in visual context.
    fn reported_version(&self) -> String;

    /// Inflate `content`. Returns `None` when the document cannot be
    /// inflated for these metrics.
    fn inflate(
        &mut self,
        metrics: &Metrics,
        content: &mut dyn Content,
        config: &RootConfig,
    ) -> Option<Box<dyn RootContext>>;
}

/// Display state of the presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisplayState {
    /// Not visible
    Hidden,
    /// Visible but not in focus
    Background,
    /// Visible and in focus
    Foreground,
}

impl DisplayState {
    /// Map a wire code (0 hidden, 1 background, 2 foreground).
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Hidden),
            1 => Some(Self::Background),
            2 => Some(Self::Foreground),
            _ => None,
        }
    }
}

/// Key press handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyboard {
    /// Physical key code
    pub code: String,
    /// Logical key
    pub key: String,
    /// Auto-repeat
    pub repeat: bool,
    /// Alt modifier
    pub alt: bool,
    /// Ctrl modifier
    pub ctrl: bool,
    /// Meta modifier
    pub meta: bool,
    /// Shift modifier
    pub shift: bool,
}

impl From<&KeyboardRequest> for Keyboard {
    fn from(request: &KeyboardRequest) -> Self {
        Self {
            code: request.code.clone(),
            key: request.key.clone(),
            repeat: request.repeat,
            alt: request.alt_key,
            ctrl: request.ctrl_key,
            meta: request.meta_key,
            shift: request.shift_key,
        }
    }
}

/// Pointer event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerEventType {
    /// Pointer pressed
    Down,
    /// Pointer released
    Up,
    /// Pointer moved
    Move,
    /// Gesture cancelled
    Cancel,
    /// Target changed under the pointer
    TargetChanged,
}

impl PointerEventType {
    /// Map a wire code.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Down),
            1 => Some(Self::Up),
            2 => Some(Self::Move),
            3 => Some(Self::Cancel),
            4 => Some(Self::TargetChanged),
            _ => None,
        }
    }
}

/// Pointer event in core units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    /// Event type
    pub event_type: PointerEventType,
    /// Pointer type code (mouse, touch)
    pub pointer_type: i64,
    /// Pointer id
    pub pointer_id: i64,
    /// Horizontal position
    pub x: f64,
    /// Vertical position
    pub y: f64,
}

/// What an engine event asks for.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// Document finished
    Finish,
    /// User event for the skill backend
    SendEvent {
        /// Originating component
        source: Value,
        /// Event arguments
        arguments: Value,
        /// Component values
        components: Value,
    },
    /// Data source needs more items
    DataSourceFetchRequest {
        /// Data source type
        source_type: String,
        /// Provider request
        request: Map<String, Value>,
    },
    /// Extension command
    Extension {
        /// Extension uri
        uri: String,
        /// Command name
        name: String,
        /// Originating component
        source: Value,
        /// Command parameters
        params: Value,
    },
    /// Any other event; carries the serialization sent to the viewhost
    Viewhost(Value),
}

/// Event popped from the engine queue.
#[derive(Clone)]
pub struct EngineEvent {
    /// Event type and data
    pub kind: EventKind,
    /// Action to resolve when the event is handled, if the engine waits
    pub action: Option<ActionRef>,
}

impl std::fmt::Debug for EngineEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineEvent")
            .field("kind", &self.kind)
            .field("has_action", &self.action.is_some())
            .finish()
    }
}

/// Inflated document.
pub trait RootContext: Send {
    /// Advance document time (`elapsed_ms` since build) and wall-clock time.
    fn update_time(&mut self, elapsed_ms: u64, utc_ms: u64);

    /// Set the local time zone adjustment.
    fn set_local_time_adjustment(&mut self, adjustment_ms: i64);

    /// Advance time-driven players owned by the document.
    fn tick_players(&mut self) {}

    /// Run pending engine bookkeeping (layout, timers).
    fn clear_pending(&mut self);

    /// Event queue is not empty.
    fn has_event(&self) -> bool;

    /// Take the next queued event.
    fn pop_event(&mut self) -> Option<EngineEvent>;

    /// Dirty set is not empty.
    fn is_dirty(&self) -> bool;

    /// Components changed since the last clear.
    fn dirty(&self) -> Vec<ComponentRef>;

    /// Empty the dirty set.
    fn clear_dirty(&mut self);

    /// Document holds the screen lock.
    fn screen_lock(&self) -> bool;

    /// Root of the component tree.
    fn top_component(&self) -> Option<ComponentRef>;

    /// Look up a component by id or unique id.
    fn find_component_by_id(&self, id: &str) -> Option<ComponentRef>;

    /// Apply a runtime configuration change; `size` is in core pixels.
    fn configuration_change(&mut self, change: &ConfigurationChange);

    /// Update display state.
    fn update_display_state(&mut self, state: DisplayState);

    /// Scroll `rect` (core units) of `component` into view.
    fn scroll_to_rect_in_component(&mut self, component: &ComponentRef, rect: Rect, align: i64);

    /// Handle a key press; returns whether the document consumed it.
    fn handle_keyboard(&mut self, key_type: i64, keyboard: &Keyboard) -> bool;

    /// Focusable areas keyed by component id, core units.
    fn focusable_areas(&self) -> BTreeMap<String, Rect>;

    /// Id of the focused component, empty when nothing has focus.
    fn focused(&self) -> String;

    /// Move focus.
    fn set_focus(&mut self, direction: i64, origin: Rect, target_id: &str);

    /// Handle a pointer event; returns whether the document consumed it.
    fn handle_pointer_event(&mut self, event: PointerEvent) -> bool;

    /// Media at `source` finished loading.
    fn media_loaded(&mut self, source: &str);

    /// Media at `source` failed to load.
    fn media_load_failed(&mut self, source: &str, error_code: i64, error: &str);

    /// Route a callback to the player it names. Returns false when no such
    /// player exists.
    fn player_callback(&mut self, callback: &PlayerCallback) -> bool;

    /// Re-run structural layout against `content`.
    fn reinflate(&mut self, content: &mut dyn Content);

    /// Visual context of the document.
    fn serialize_visual_context(&self) -> Value;

    /// Data source context of the document.
    fn serialize_data_source_context(&self) -> Value;

    /// Execute a command array. `None` when the engine rejects the commands.
    fn execute_commands(&mut self, commands: &Value, fast_mode: bool) -> Option<ActionRef>;

    /// Cancel running command sequences.
    fn cancel_execution(&mut self);

    /// Invoke a document-side extension event handler. `None` when no
    /// handler is defined.
    fn invoke_extension_event_handler(
        &mut self,
        uri: &str,
        name: &str,
        data: &Map<String, Value>,
        fast_mode: bool,
    ) -> Option<ActionRef>;

    /// Hand an update to the data source provider for `source_type`.
    ///
    /// `None` when no such provider is registered, otherwise whether the
    /// provider accepted the update.
    fn process_data_source_update(&mut self, source_type: &str, payload: &str) -> Option<bool>;

    /// Drain errors accumulated by every data source provider.
    fn take_data_source_errors(&mut self) -> Vec<Value>;

    /// Configuration the document was inflated with.
    fn root_config(&self) -> &RootConfig;
}
