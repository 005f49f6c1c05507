//! Component hierarchy serialization.
//!
//! Full hierarchies are sent on build and reinflate; afterwards each frame
//! sends only a diff of the dirty set.
//!
//! # Invariants
//!
//! - The diff holds at most one entry per component unique id. A second
//!   marker for the same component augments the existing entry.
//! - Inserted children are sent as full subtrees with their own displayed
//!   children index. Removed children produce no entry; the viewhost drops
//!   them from the parent's index.
//! - Entry order is stable for a given dirty set but carries no meaning.

use std::collections::BTreeMap;

use serde_json::{Map, Value, json};

use crate::engine::{ChildAction, ChildChange, ComponentRef, DirtyProperty};

/// Map of every displayed component under `root` (inclusive) to the unique
/// ids of its displayed children.
pub fn displayed_children_hierarchy(root: &ComponentRef) -> Map<String, Value> {
    let mut hierarchy = Map::new();
    let mut stack = vec![root.clone()];

    while let Some(node) = stack.pop() {
        let mut children = Vec::with_capacity(node.displayed_child_count());
        for index in 0..node.displayed_child_count() {
            let Some(child) = node.displayed_child_at(index) else {
                continue;
            };
            children.push(Value::String(child.unique_id()));
            stack.push(child);
        }
        hierarchy.insert(node.unique_id(), Value::Array(children));
    }
    hierarchy
}

/// Payload of a `hierarchy` or `reHierarchy` message.
pub fn hierarchy_payload(top: &ComponentRef) -> Value {
    json!({
        "hierarchy": top.serialize(),
        "displayedChildrenHierarchy": displayed_children_hierarchy(top),
    })
}

/// Payload of a `dirty` message for the given dirty set.
pub fn serialize_dirty(dirty: &[ComponentRef]) -> Value {
    let mut entries: BTreeMap<String, Map<String, Value>> = BTreeMap::new();

    for component in dirty {
        let uid = component.unique_id();

        if component.is_dirty(DirtyProperty::ChildrenChanged) {
            let changes = component.child_changes();
            for (position, change) in changes.iter().enumerate() {
                if change.action != ChildAction::Insert {
                    continue;
                }
                let removed_later = changes[position + 1..]
                    .iter()
                    .any(|later| later.action == ChildAction::Remove && later.uid == change.uid);
                if removed_later {
                    continue;
                }
                let Some(child) = inserted_child(component, change) else {
                    tracing::warn!(parent = %uid, child = %change.uid, index = change.index, "inserted child missing");
                    continue;
                };
                let mut full = into_object(child.serialize(), &change.uid);
                full.insert(
                    "displayedChildrenHierarchy".to_string(),
                    Value::Object(displayed_children_hierarchy(&child)),
                );
                augment(&mut entries, change.uid.clone(), full);
            }

            let entry = entries
                .entry(uid.clone())
                .or_insert_with(|| into_object(component.serialize_dirty(), &uid));
            entry.insert(
                "displayedChildrenHierarchy".to_string(),
                Value::Object(displayed_children_hierarchy(component)),
            );
        }

        if component.is_dirty(DirtyProperty::Graphic)
            && let Some(elements) = component.dirty_graphic_elements()
        {
            let mut diff = into_object(component.serialize_dirty(), &uid);
            let elements: Vec<Value> = elements
                .into_iter()
                .map(|element| {
                    let mut serialized = element.serialized;
                    if let Value::Object(fields) = &mut serialized {
                        fields.insert("dirtyProperties".to_string(), json!(element.dirty_properties));
                    }
                    serialized
                })
                .collect();
            if let Some(Value::Object(graphic)) = diff.get_mut("graphic") {
                graphic.insert("dirty".to_string(), Value::Array(elements));
            }
            augment(&mut entries, uid.clone(), diff);
        }

        entries.entry(uid.clone()).or_insert_with(|| into_object(component.serialize_dirty(), &uid));
    }

    Value::Array(entries.into_values().rev().map(Value::Object).collect())
}

/// Current child with the inserted uid. Later changes in the same frame may
/// have shifted it away from the index it was inserted at.
fn inserted_child(parent: &ComponentRef, change: &ChildChange) -> Option<ComponentRef> {
    if let Some(child) = parent.child_at(change.index)
        && child.unique_id() == change.uid
    {
        return Some(child);
    }
    (0..).map_while(|index| parent.child_at(index)).find(|child| child.unique_id() == change.uid)
}

fn augment(entries: &mut BTreeMap<String, Map<String, Value>>, uid: String, fields: Map<String, Value>) {
    let entry = entries.entry(uid).or_default();
    for (key, value) in fields {
        entry.insert(key, value);
    }
}

fn into_object(value: Value, uid: &str) -> Map<String, Value> {
    match value {
        Value::Object(fields) => fields,
        _ => {
            tracing::warn!(uid, "component serialized to a non-object");
            let mut fields = Map::new();
            fields.insert("id".to_string(), Value::String(uid.to_string()));
            fields
        },
    }
}
