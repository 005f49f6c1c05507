//! Simulated document engine.
//!
//! [`SimEngine`] inflates a layout into a [`SimComponent`] tree wrapped in a
//! root context the manager owns. The test keeps a [`RootHandle`] to the same
//! state so it can queue engine events, change components and inspect what
//! the manager asked the engine to do.

use std::{
    collections::{BTreeMap, BTreeSet, VecDeque},
    sync::Arc,
};

use parking_lot::Mutex;
use serde_json::{Map, Value, json};
use viewbridge_core::{
    RootConfig,
    engine::{
        ActionRef, Component, ComponentRef, Content, DisplayState, Engine, EngineEvent, EventKind,
        Keyboard, Metrics, PointerEvent, RootContext,
    },
};
use viewbridge_proto::payloads::{Rect, config::ConfigurationChange, media::PlayerCallback};

use crate::{
    sim_action::SimAction,
    sim_component::{DirtySet, SimComponent, UidSource},
};

/// Version string the simulated engine reports.
pub const SIM_ENGINE_VERSION: &str = "sim-2024.2";

/// Engine-side effect of a manager call, recorded in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum RootCall {
    /// `configuration_change`
    Configuration(ConfigurationChange),
    /// `update_display_state`
    DisplayState(DisplayState),
    /// `scroll_to_rect_in_component`
    ScrollToRect {
        /// Target unique id
        uid: String,
        /// Rectangle in core units
        rect: Rect,
        /// Alignment code
        align: i64,
    },
    /// `handle_keyboard`
    Keyboard {
        /// Key type code
        key_type: i64,
        /// Key press
        keyboard: Keyboard,
    },
    /// `set_focus`
    SetFocus {
        /// Direction code
        direction: i64,
        /// Origin rectangle
        origin: Rect,
        /// Target component id
        target_id: String,
    },
    /// `handle_pointer_event`
    Pointer(PointerEvent),
    /// `media_loaded`
    MediaLoaded(String),
    /// `media_load_failed`
    MediaLoadFailed {
        /// Media source
        source: String,
        /// Error code
        error_code: i64,
        /// Error text
        error: String,
    },
    /// `player_callback`
    Player(PlayerCallback),
    /// `reinflate`
    Reinflate,
    /// `execute_commands`
    Commands(Value),
    /// `cancel_execution`
    CancelExecution,
    /// `invoke_extension_event_handler`
    ExtensionHandler {
        /// Extension uri
        uri: String,
        /// Handler name
        name: String,
        /// Handler data
        data: Map<String, Value>,
        /// Fast mode
        fast_mode: bool,
    },
    /// `process_data_source_update`
    DataSourceUpdate {
        /// Data source type
        source_type: String,
        /// Raw update
        payload: String,
    },
}

/// How `execute_commands` behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandMode {
    /// Commands finish immediately
    #[default]
    Complete,
    /// Commands keep running until the test settles the action
    Run,
    /// The engine rejects the commands
    Reject,
}

struct RootState {
    top: Arc<SimComponent>,
    uids: UidSource,
    config: RootConfig,
    events: VecDeque<EngineEvent>,
    calls: Vec<RootCall>,
    elapsed_ms: u64,
    utc_ms: u64,
    local_time_adjustment: i64,
    screen_lock: bool,
    focused: String,
    focusable: BTreeMap<String, Rect>,
    keyboard_consumed: bool,
    command_mode: CommandMode,
    last_command: Option<Arc<SimAction>>,
    extension_handlers: BTreeSet<(String, String)>,
    data_sources: BTreeMap<String, bool>,
    data_source_errors: Vec<Value>,
    players: BTreeSet<String>,
    reinflations: usize,
}

/// Test-side handle to an inflated simulated document.
#[derive(Clone)]
pub struct RootHandle {
    state: Arc<Mutex<RootState>>,
    dirty: DirtySet,
}

impl RootHandle {
    /// Root of the component tree.
    pub fn top(&self) -> Arc<SimComponent> {
        Arc::clone(&self.state.lock().top)
    }

    /// Component by author id or unique id.
    pub fn component(&self, id: &str) -> Option<Arc<SimComponent>> {
        self.top().find(id)
    }

    /// Build a detached component from a layout, ready for
    /// [`SimComponent::insert_child`].
    pub fn create(&self, layout: &Value) -> Arc<SimComponent> {
        let mut state = self.state.lock();
        SimComponent::from_layout(layout, &mut state.uids, &self.dirty)
    }

    /// Queue an event without an action.
    pub fn push_event(&self, kind: EventKind) {
        self.state.lock().events.push_back(EngineEvent { kind, action: None });
    }

    /// Queue an event whose action waits for resolution.
    pub fn push_event_with_action(&self, kind: EventKind) -> Arc<SimAction> {
        let action = SimAction::pending();
        let event = EngineEvent { kind, action: Some(Arc::clone(&action) as ActionRef) };
        self.state.lock().events.push_back(event);
        action
    }

    /// Events not yet drained by the manager.
    pub fn queued_events(&self) -> usize {
        self.state.lock().events.len()
    }

    /// Calls the manager made, in order.
    pub fn calls(&self) -> Vec<RootCall> {
        self.state.lock().calls.clone()
    }

    /// Document time last set by the manager, in milliseconds.
    pub fn elapsed_ms(&self) -> u64 {
        self.state.lock().elapsed_ms
    }

    /// Wall-clock time last set by the manager.
    pub fn utc_ms(&self) -> u64 {
        self.state.lock().utc_ms
    }

    /// Local time adjustment last set by the manager.
    pub fn local_time_adjustment(&self) -> i64 {
        self.state.lock().local_time_adjustment
    }

    /// Configuration the document was inflated with.
    pub fn config(&self) -> RootConfig {
        self.state.lock().config.clone()
    }

    /// Hold or release the screen lock.
    pub fn set_screen_lock(&self, locked: bool) {
        self.state.lock().screen_lock = locked;
    }

    /// Set the focused component id.
    pub fn set_focused(&self, id: &str) {
        self.state.lock().focused = id.to_string();
    }

    /// Declare a focusable area in core units.
    pub fn add_focusable(&self, id: &str, rect: Rect) {
        self.state.lock().focusable.insert(id.to_string(), rect);
    }

    /// Make `handle_keyboard` report the key as consumed.
    pub fn set_keyboard_consumed(&self, consumed: bool) {
        self.state.lock().keyboard_consumed = consumed;
    }

    /// Choose how `execute_commands` behaves.
    pub fn set_command_mode(&self, mode: CommandMode) {
        self.state.lock().command_mode = mode;
    }

    /// Action of the last accepted command sequence.
    pub fn last_command(&self) -> Option<Arc<SimAction>> {
        self.state.lock().last_command.clone()
    }

    /// Define a document-side extension event handler.
    pub fn add_extension_handler(&self, uri: &str, name: &str) {
        self.state.lock().extension_handlers.insert((uri.to_string(), name.to_string()));
    }

    /// Register a data source provider that accepts or rejects updates.
    pub fn add_data_source(&self, source_type: &str, accepts: bool) {
        self.state.lock().data_sources.insert(source_type.to_string(), accepts);
    }

    /// Queue a data source provider error.
    pub fn push_data_source_error(&self, error: Value) {
        self.state.lock().data_source_errors.push(error);
    }

    /// Register a player id that accepts callbacks.
    pub fn add_player(&self, player_id: &str) {
        self.state.lock().players.insert(player_id.to_string());
    }

    /// Number of reinflations.
    pub fn reinflations(&self) -> usize {
        self.state.lock().reinflations
    }

    fn record(&self, call: RootCall) {
        self.state.lock().calls.push(call);
    }
}

/// Inflated simulated document, owned by the manager.
pub struct SimRoot {
    handle: RootHandle,
    config: RootConfig,
}

impl RootContext for SimRoot {
    fn update_time(&mut self, elapsed_ms: u64, utc_ms: u64) {
        let mut state = self.handle.state.lock();
        state.elapsed_ms = elapsed_ms;
        state.utc_ms = utc_ms;
    }

    fn set_local_time_adjustment(&mut self, adjustment_ms: i64) {
        self.handle.state.lock().local_time_adjustment = adjustment_ms;
    }

    fn clear_pending(&mut self) {}

    fn has_event(&self) -> bool {
        !self.handle.state.lock().events.is_empty()
    }

    fn pop_event(&mut self) -> Option<EngineEvent> {
        self.handle.state.lock().events.pop_front()
    }

    fn is_dirty(&self) -> bool {
        !self.handle.dirty.lock().is_empty()
    }

    fn dirty(&self) -> Vec<ComponentRef> {
        let uids = self.handle.dirty.lock().clone();
        let top = self.handle.top();
        uids.iter().filter_map(|uid| top.find(uid)).map(|component| component as ComponentRef).collect()
    }

    fn clear_dirty(&mut self) {
        let uids = std::mem::take(&mut *self.handle.dirty.lock());
        let top = self.handle.top();
        for uid in uids {
            if let Some(component) = top.find(&uid) {
                component.clear_dirty();
            }
        }
    }

    fn screen_lock(&self) -> bool {
        self.handle.state.lock().screen_lock
    }

    fn top_component(&self) -> Option<ComponentRef> {
        Some(self.handle.top() as ComponentRef)
    }

    fn find_component_by_id(&self, id: &str) -> Option<ComponentRef> {
        self.handle.component(id).map(|component| component as ComponentRef)
    }

    fn configuration_change(&mut self, change: &ConfigurationChange) {
        self.handle.record(RootCall::Configuration(change.clone()));
    }

    fn update_display_state(&mut self, state: DisplayState) {
        self.handle.record(RootCall::DisplayState(state));
    }

    fn scroll_to_rect_in_component(&mut self, component: &ComponentRef, rect: Rect, align: i64) {
        self.handle.record(RootCall::ScrollToRect { uid: component.unique_id(), rect, align });
    }

    fn handle_keyboard(&mut self, key_type: i64, keyboard: &Keyboard) -> bool {
        self.handle.record(RootCall::Keyboard { key_type, keyboard: keyboard.clone() });
        self.handle.state.lock().keyboard_consumed
    }

    fn focusable_areas(&self) -> BTreeMap<String, Rect> {
        self.handle.state.lock().focusable.clone()
    }

    fn focused(&self) -> String {
        self.handle.state.lock().focused.clone()
    }

    fn set_focus(&mut self, direction: i64, origin: Rect, target_id: &str) {
        self.handle.record(RootCall::SetFocus { direction, origin, target_id: target_id.to_string() });
    }

    fn handle_pointer_event(&mut self, event: PointerEvent) -> bool {
        self.handle.record(RootCall::Pointer(event));
        false
    }

    fn media_loaded(&mut self, source: &str) {
        self.handle.record(RootCall::MediaLoaded(source.to_string()));
    }

    fn media_load_failed(&mut self, source: &str, error_code: i64, error: &str) {
        self.handle.record(RootCall::MediaLoadFailed {
            source: source.to_string(),
            error_code,
            error: error.to_string(),
        });
    }

    fn player_callback(&mut self, callback: &PlayerCallback) -> bool {
        self.handle.record(RootCall::Player(callback.clone()));
        self.handle.state.lock().players.contains(&callback.player_id)
    }

    fn reinflate(&mut self, _content: &mut dyn Content) {
        self.handle.record(RootCall::Reinflate);
        self.handle.state.lock().reinflations += 1;
    }

    fn serialize_visual_context(&self) -> Value {
        let top = self.handle.top();
        json!({ "id": top.unique_id(), "type": "visual", "tags": {"viewport": {}} })
    }

    fn serialize_data_source_context(&self) -> Value {
        let state = self.handle.state.lock();
        let sources: Vec<Value> = state.data_sources.keys().map(|source| json!({ "type": source })).collect();
        Value::Array(sources)
    }

    fn execute_commands(&mut self, commands: &Value, _fast_mode: bool) -> Option<ActionRef> {
        self.handle.record(RootCall::Commands(commands.clone()));
        let mut state = self.handle.state.lock();
        let action = match state.command_mode {
            CommandMode::Reject => return None,
            CommandMode::Complete => SimAction::resolved(),
            CommandMode::Run => SimAction::pending(),
        };
        state.last_command = Some(Arc::clone(&action));
        Some(action as ActionRef)
    }

    fn cancel_execution(&mut self) {
        self.handle.record(RootCall::CancelExecution);
        if let Some(action) = self.handle.last_command() {
            action.terminate();
        }
    }

    fn invoke_extension_event_handler(
        &mut self,
        uri: &str,
        name: &str,
        data: &Map<String, Value>,
        fast_mode: bool,
    ) -> Option<ActionRef> {
        self.handle.record(RootCall::ExtensionHandler {
            uri: uri.to_string(),
            name: name.to_string(),
            data: data.clone(),
            fast_mode,
        });
        let defined = self
            .handle
            .state
            .lock()
            .extension_handlers
            .contains(&(uri.to_string(), name.to_string()));
        defined.then(|| SimAction::resolved() as ActionRef)
    }

    fn process_data_source_update(&mut self, source_type: &str, payload: &str) -> Option<bool> {
        self.handle.record(RootCall::DataSourceUpdate {
            source_type: source_type.to_string(),
            payload: payload.to_string(),
        });
        self.handle.state.lock().data_sources.get(source_type).copied()
    }

    fn take_data_source_errors(&mut self) -> Vec<Value> {
        std::mem::take(&mut self.handle.state.lock().data_source_errors)
    }

    fn root_config(&self) -> &RootConfig {
        &self.config
    }
}

#[derive(Default)]
struct EngineState {
    layout: Value,
    refuse: Option<usize>,
    attempts: Vec<Metrics>,
    root: Option<RootHandle>,
}

/// Simulated engine. Clones share state, so a test keeps one clone and hands
/// another to the manager.
#[derive(Clone, Default)]
pub struct SimEngine {
    state: Arc<Mutex<EngineState>>,
}

impl SimEngine {
    /// Engine inflating `layout` for every document.
    pub fn new(layout: Value) -> Self {
        let engine = Self::default();
        engine.state.lock().layout = layout;
        engine
    }

    /// Refuse the first `attempts` inflations.
    #[must_use]
    pub fn refusing(self, attempts: usize) -> Self {
        self.state.lock().refuse = Some(attempts);
        self
    }

    /// Refuse every inflation.
    #[must_use]
    pub fn refusing_all(self) -> Self {
        self.refusing(usize::MAX)
    }

    /// Metrics of every inflation attempt, in order.
    pub fn attempts(&self) -> Vec<Metrics> {
        self.state.lock().attempts.clone()
    }

    /// Handle to the last inflated document.
    pub fn root(&self) -> Option<RootHandle> {
        self.state.lock().root.clone()
    }
}

impl Engine for SimEngine {
    fn reported_version(&self) -> String {
        SIM_ENGINE_VERSION.to_string()
    }

    fn inflate(
        &mut self,
        metrics: &Metrics,
        _content: &mut dyn Content,
        config: &RootConfig,
    ) -> Option<Box<dyn RootContext>> {
        let mut engine = self.state.lock();
        engine.attempts.push(*metrics);
        if engine.refuse.is_some_and(|refuse| engine.attempts.len() <= refuse) {
            tracing::debug!(attempt = engine.attempts.len(), "simulated inflation refused");
            return None;
        }

        let dirty = DirtySet::default();
        let mut uids = UidSource::default();
        let layout = if engine.layout.is_null() { json!({ "type": "Container" }) } else { engine.layout.clone() };
        let top = SimComponent::from_layout(&layout, &mut uids, &dirty);
        let state = RootState {
            top,
            uids,
            config: config.clone(),
            events: VecDeque::new(),
            calls: Vec::new(),
            elapsed_ms: 0,
            utc_ms: config.utc_time,
            local_time_adjustment: config.local_time_adjustment,
            screen_lock: false,
            focused: String::new(),
            focusable: BTreeMap::new(),
            keyboard_consumed: false,
            command_mode: CommandMode::default(),
            last_command: None,
            extension_handlers: BTreeSet::new(),
            data_sources: BTreeMap::new(),
            data_source_errors: Vec::new(),
            players: BTreeSet::new(),
            reinflations: 0,
        };
        let handle = RootHandle { state: Arc::new(Mutex::new(state)), dirty };
        engine.root = Some(handle.clone());
        Some(Box::new(SimRoot { config: config.clone(), handle }))
    }
}
