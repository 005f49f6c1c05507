//! Component tree access.

use std::sync::Arc;

use serde_json::Value;
use viewbridge_proto::payloads::{component::UpdateValue, media::MediaState};

/// Dirty property markers the bridge treats specially.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirtyProperty {
    /// Children were inserted or removed
    ChildrenChanged,
    /// Vector graphic content changed
    Graphic,
}

/// Structural change to a component's children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildAction {
    /// Child inserted
    Insert,
    /// Child removed
    Remove,
}

/// One entry of a component's children-changed notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildChange {
    /// Unique id of the affected child
    pub uid: String,
    /// Index of the child in its parent
    pub index: usize,
    /// What happened
    pub action: ChildAction,
}

/// Dirty element inside a vector graphic.
#[derive(Debug, Clone, PartialEq)]
pub struct DirtyGraphicElement {
    /// Full serialization of the element
    pub serialized: Value,
    /// Engine property keys that changed
    pub dirty_properties: Vec<u32>,
}

/// Shared component handle.
pub type ComponentRef = Arc<dyn Component>;

/// A node in the engine's component tree.
pub trait Component: Send + Sync {
    /// Engine-unique id, stable for the component's lifetime.
    fn unique_id(&self) -> String;

    /// Full serialization.
    fn serialize(&self) -> Value;

    /// Serialization of dirty properties only.
    ///
    /// The result is an object carrying at least `id`.
    fn serialize_dirty(&self) -> Value;

    /// Whether `property` is in the component's dirty set.
    fn is_dirty(&self, property: DirtyProperty) -> bool;

    /// Children-changed notification; empty unless
    /// [`DirtyProperty::ChildrenChanged`] is dirty.
    fn child_changes(&self) -> Vec<ChildChange>;

    /// Child at `index`, including children not currently displayed.
    fn child_at(&self, index: usize) -> Option<ComponentRef>;

    /// Number of children currently displayed.
    fn displayed_child_count(&self) -> usize;

    /// Displayed child at `index`.
    fn displayed_child_at(&self, index: usize) -> Option<ComponentRef>;

    /// Dirty elements of the component's vector graphic; `None` when the
    /// component holds no graphic.
    fn dirty_graphic_elements(&self) -> Option<Vec<DirtyGraphicElement>>;

    /// Force layout of the component if it is still pending.
    fn ensure_layout(&self) {}

    /// Apply a viewhost-side value change.
    fn update(&self, update_type: i64, value: &UpdateValue);

    /// Apply a media player state change.
    fn update_media_state(&self, state: &MediaState, from_event: bool);

    /// Replace the component's vector graphic source. Returns false when
    /// the source is rejected.
    fn update_graphic(&self, source: &str) -> bool;

    /// Whether an edit text component accepts `character`.
    fn is_character_valid(&self, character: char) -> bool;
}
