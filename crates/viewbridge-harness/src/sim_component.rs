//! Simulated component tree.
//!
//! Components are built from a JSON layout:
//!
//! ```json
//! {"id": "list", "type": "Sequence", "properties": {"scrollPosition": 0},
//!  "displayed": 2, "children": [{"type": "Text"}, {"type": "Text"}, {"type": "Text"}]}
//! ```
//!
//! Every component gets a unique id `:1000`, `:1001`, ... in depth-first
//! order. `displayed` limits how many leading children are displayed;
//! `graphic: true` gives the component a vector graphic; `accepts` restricts
//! the characters an edit text takes.

use std::{
    collections::BTreeSet,
    sync::{Arc, Weak},
};

use parking_lot::Mutex;
use serde_json::{Map, Value, json};
use viewbridge_core::engine::{
    ChildAction, ChildChange, Component, ComponentRef, DirtyGraphicElement, DirtyProperty,
};
use viewbridge_proto::payloads::{component::UpdateValue, media::MediaState};

/// Unique ids of dirty components, shared by a tree and its root context.
pub type DirtySet = Arc<Mutex<BTreeSet<String>>>;

/// Hands out unique ids.
#[derive(Debug)]
pub struct UidSource {
    next: u32,
}

impl Default for UidSource {
    fn default() -> Self {
        Self { next: 1000 }
    }
}

impl UidSource {
    fn next(&mut self) -> String {
        let uid = format!(":{}", self.next);
        self.next += 1;
        uid
    }
}

#[derive(Default)]
struct ComponentState {
    properties: Map<String, Value>,
    dirty_properties: BTreeSet<String>,
    children: Vec<Arc<SimComponent>>,
    displayed: Option<usize>,
    child_changes: Vec<ChildChange>,
    graphic: Option<Value>,
    dirty_graphic: Vec<DirtyGraphicElement>,
    value: Option<UpdateValue>,
    media: Option<(MediaState, bool)>,
    laid_out: bool,
}

/// Component in a simulated document.
pub struct SimComponent {
    uid: String,
    id: String,
    component_type: String,
    accepts: Option<String>,
    dirty: DirtySet,
    this: Weak<SimComponent>,
    state: Mutex<ComponentState>,
}

impl SimComponent {
    /// Build a component and its subtree from a layout description.
    pub fn from_layout(layout: &Value, uids: &mut UidSource, dirty: &DirtySet) -> Arc<Self> {
        let uid = uids.next();
        let text = |key: &str| layout.get(key).and_then(Value::as_str).map(str::to_string);
        let children = layout
            .get("children")
            .and_then(Value::as_array)
            .map(|children| {
                children.iter().map(|child| Self::from_layout(child, uids, dirty)).collect()
            })
            .unwrap_or_default();
        let state = ComponentState {
            properties: layout.get("properties").and_then(Value::as_object).cloned().unwrap_or_default(),
            children,
            displayed: layout.get("displayed").and_then(Value::as_u64).map(|n| n as usize),
            graphic: layout
                .get("graphic")
                .and_then(Value::as_bool)
                .filter(|graphic| *graphic)
                .map(|_| json!({ "version": "1.2", "items": [] })),
            ..ComponentState::default()
        };

        Arc::new_cyclic(|this| Self {
            id: text("id").unwrap_or_default(),
            component_type: text("type").unwrap_or_else(|| "Frame".to_string()),
            accepts: text("accepts"),
            uid,
            dirty: Arc::clone(dirty),
            this: this.clone(),
            state: Mutex::new(state),
        })
    }

    /// Author-assigned id; empty when the layout gave none.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current value of a property.
    pub fn property(&self, name: &str) -> Option<Value> {
        self.state.lock().properties.get(name).cloned()
    }

    /// Change a property and mark it dirty.
    pub fn set_property(&self, name: &str, value: Value) {
        {
            let mut state = self.state.lock();
            state.properties.insert(name.to_string(), value);
            state.dirty_properties.insert(name.to_string());
        }
        self.mark_dirty();
    }

    /// Children, displayed or not.
    pub fn children(&self) -> Vec<Arc<SimComponent>> {
        self.state.lock().children.clone()
    }

    /// Insert `child` at `index` and record the change.
    pub fn insert_child(&self, index: usize, child: Arc<SimComponent>) {
        {
            let mut state = self.state.lock();
            let index = index.min(state.children.len());
            state.child_changes.push(ChildChange {
                uid: child.uid.clone(),
                index,
                action: ChildAction::Insert,
            });
            state.children.insert(index, child);
            if let Some(displayed) = state.displayed.as_mut() {
                *displayed += 1;
            }
        }
        self.mark_dirty();
    }

    /// Remove the child at `index` and record the change.
    pub fn remove_child(&self, index: usize) -> Option<Arc<SimComponent>> {
        let removed = {
            let mut state = self.state.lock();
            if index >= state.children.len() {
                return None;
            }
            let child = state.children.remove(index);
            state.child_changes.push(ChildChange {
                uid: child.uid.clone(),
                index,
                action: ChildAction::Remove,
            });
            if let Some(displayed) = state.displayed.as_mut() {
                *displayed = displayed.saturating_sub(1);
            }
            child
        };
        self.mark_dirty();
        Some(removed)
    }

    /// Report `elements` of the vector graphic as changed.
    pub fn mark_graphic_dirty(&self, elements: Vec<DirtyGraphicElement>) {
        self.state.lock().dirty_graphic = elements;
        self.mark_dirty();
    }

    /// Last value written by the viewhost.
    pub fn value(&self) -> Option<UpdateValue> {
        self.state.lock().value.clone()
    }

    /// Last media state written by the viewhost, with its origin flag.
    pub fn media_state(&self) -> Option<(MediaState, bool)> {
        self.state.lock().media
    }

    /// Current vector graphic, if any.
    pub fn graphic(&self) -> Option<Value> {
        self.state.lock().graphic.clone()
    }

    /// Layout was forced through `ensureLayout`.
    pub fn is_laid_out(&self) -> bool {
        self.state.lock().laid_out
    }

    /// Depth-first search by author id or unique id, this component included.
    pub fn find(self: &Arc<Self>, id: &str) -> Option<Arc<SimComponent>> {
        let mut stack = vec![Arc::clone(self)];
        while let Some(node) = stack.pop() {
            if node.uid == id || (!node.id.is_empty() && node.id == id) {
                return Some(node);
            }
            stack.extend(node.children().into_iter().rev());
        }
        None
    }

    /// Forget dirty properties and child changes.
    pub fn clear_dirty(&self) {
        let mut state = self.state.lock();
        state.dirty_properties.clear();
        state.child_changes.clear();
        state.dirty_graphic.clear();
    }

    fn mark_dirty(&self) {
        self.dirty.lock().insert(self.uid.clone());
    }

    fn handle(&self) -> Option<ComponentRef> {
        self.this.upgrade().map(|this| this as ComponentRef)
    }

    fn displayed_children(&self) -> Vec<Arc<SimComponent>> {
        let state = self.state.lock();
        let count = state.displayed.unwrap_or(state.children.len()).min(state.children.len());
        state.children[..count].to_vec()
    }
}

impl Component for SimComponent {
    fn unique_id(&self) -> String {
        self.uid.clone()
    }

    fn serialize(&self) -> Value {
        let (properties, graphic, children) = {
            let state = self.state.lock();
            (state.properties.clone(), state.graphic.clone(), state.children.clone())
        };
        let mut serialized = json!({
            "id": self.uid,
            "type": self.component_type,
            "children": children.iter().map(|child| child.serialize()).collect::<Vec<_>>(),
        });
        if let Value::Object(fields) = &mut serialized {
            fields.extend(properties);
            if let Some(graphic) = graphic {
                fields.insert("graphic".to_string(), graphic);
            }
        }
        serialized
    }

    fn serialize_dirty(&self) -> Value {
        let state = self.state.lock();
        let mut fields = Map::new();
        fields.insert("id".to_string(), Value::String(self.uid.clone()));
        for name in &state.dirty_properties {
            if let Some(value) = state.properties.get(name) {
                fields.insert(name.clone(), value.clone());
            }
        }
        if !state.dirty_graphic.is_empty()
            && let Some(graphic) = &state.graphic
        {
            fields.insert("graphic".to_string(), graphic.clone());
        }
        Value::Object(fields)
    }

    fn is_dirty(&self, property: DirtyProperty) -> bool {
        let state = self.state.lock();
        match property {
            DirtyProperty::ChildrenChanged => !state.child_changes.is_empty(),
            DirtyProperty::Graphic => !state.dirty_graphic.is_empty(),
        }
    }

    fn child_changes(&self) -> Vec<ChildChange> {
        self.state.lock().child_changes.clone()
    }

    fn child_at(&self, index: usize) -> Option<ComponentRef> {
        self.state.lock().children.get(index).and_then(|child| child.handle())
    }

    fn displayed_child_count(&self) -> usize {
        self.displayed_children().len()
    }

    fn displayed_child_at(&self, index: usize) -> Option<ComponentRef> {
        self.displayed_children().get(index).and_then(|child| child.handle())
    }

    fn dirty_graphic_elements(&self) -> Option<Vec<DirtyGraphicElement>> {
        let state = self.state.lock();
        state.graphic.as_ref().map(|_| state.dirty_graphic.clone())
    }

    fn ensure_layout(&self) {
        self.state.lock().laid_out = true;
    }

    fn update(&self, _update_type: i64, value: &UpdateValue) {
        self.state.lock().value = Some(value.clone());
    }

    fn update_media_state(&self, state: &MediaState, from_event: bool) {
        self.state.lock().media = Some((*state, from_event));
    }

    fn update_graphic(&self, source: &str) -> bool {
        let Ok(graphic) = serde_json::from_str::<Value>(source) else {
            return false;
        };
        {
            let mut state = self.state.lock();
            if state.graphic.is_none() {
                return false;
            }
            state.graphic = Some(graphic);
        }
        true
    }

    fn is_character_valid(&self, character: char) -> bool {
        self.accepts.as_ref().is_none_or(|accepts| accepts.contains(character))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(layout: Value) -> (Arc<SimComponent>, DirtySet) {
        let dirty = DirtySet::default();
        let top = SimComponent::from_layout(&layout, &mut UidSource::default(), &dirty);
        (top, dirty)
    }

    #[test]
    fn uids_are_depth_first() {
        let (top, _) = tree(json!({
            "id": "root",
            "children": [{"id": "a", "children": [{"id": "a1"}]}, {"id": "b"}],
        }));
        let uids: Vec<_> = ["root", "a", "a1", "b"]
            .iter()
            .map(|id| top.find(id).map(|c| c.unique_id()))
            .collect();
        assert_eq!(
            uids,
            [Some(":1000".to_string()), Some(":1001".into()), Some(":1002".into()), Some(":1003".into())]
        );
        assert!(top.find(":1002").is_some());
        assert!(top.find("missing").is_none());
    }

    #[test]
    fn displayed_limits_children() {
        let (top, _) = tree(json!({"displayed": 1, "children": [{}, {}]}));
        assert_eq!(top.displayed_child_count(), 1);
        assert!(top.child_at(1).is_some());
        assert!(top.displayed_child_at(1).is_none());
    }

    #[test]
    fn property_change_marks_dirty() {
        let (top, dirty) = tree(json!({"properties": {"text": "a"}}));
        top.set_property("text", json!("b"));
        assert!(dirty.lock().contains(":1000"));
        assert_eq!(top.serialize_dirty(), json!({"id": ":1000", "text": "b"}));

        top.clear_dirty();
        assert_eq!(top.serialize_dirty(), json!({"id": ":1000"}));
    }

    #[test]
    fn child_changes_are_recorded() {
        let (top, _) = tree(json!({"children": [{}]}));
        let (extra, _) = tree(json!({"type": "Text"}));
        top.insert_child(0, extra);
        assert!(top.is_dirty(DirtyProperty::ChildrenChanged));
        assert_eq!(top.child_changes()[0].action, ChildAction::Insert);

        top.remove_child(1);
        assert_eq!(top.children().len(), 1);
        assert_eq!(top.child_changes().len(), 2);
    }

    #[test]
    fn accepts_restricts_characters() {
        let (top, _) = tree(json!({"type": "EditText", "accepts": "0123456789"}));
        assert!(top.is_character_valid('7'));
        assert!(!top.is_character_valid('x'));
    }
}
