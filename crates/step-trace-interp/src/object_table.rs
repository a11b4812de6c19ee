//! Object table construction (§4.A, §4.C).
//!
//! Rebuilt from scratch on every step: a breadth-first walk from the
//! current frame's locals over every heap-identified value (lists, tuples,
//! dicts, sets, instances), recording each one once regardless of how many
//! names alias it, and visiting each identity only once even if the graph
//! is cyclic.

use std::collections::VecDeque;

use indexmap::IndexMap;

use step_trace_core::{ObjectId, ObjectTableEntry, ObjectValue};

use crate::format::{dict_key_to_string, serialize};
use crate::value::{object_id_of, Value};

#[must_use]
pub fn build_var_table(locals: &IndexMap<String, Value>) -> IndexMap<String, ObjectId> {
    let mut table = IndexMap::new();
    for (name, value) in locals {
        if let Some(id) = object_id_of(value) {
            table.insert(name.clone(), id);
        }
    }
    table
}

#[must_use]
pub fn build_object_table(locals: &IndexMap<String, Value>) -> IndexMap<ObjectId, ObjectTableEntry> {
    let mut visited = IndexMap::new();
    let mut queue: VecDeque<Value> = locals.values().cloned().collect();
    while let Some(value) = queue.pop_front() {
        let Some(id) = object_id_of(&value) else { continue };
        if visited.contains_key(&id) {
            continue;
        }
        let entry = match &value {
            Value::List(items) => {
                let borrowed = items.borrow();
                for child in borrowed.iter() {
                    if object_id_of(child).is_some() {
                        queue.push_back(child.clone());
                    }
                }
                ObjectTableEntry { ty: "list".to_string(), value: sequence_or_primitive(borrowed.as_slice(), &value), is_collection: true }
            }
            Value::Tuple(items) => {
                for child in items.iter() {
                    if object_id_of(child).is_some() {
                        queue.push_back(child.clone());
                    }
                }
                ObjectTableEntry { ty: "tuple".to_string(), value: sequence_or_primitive(items.as_slice(), &value), is_collection: true }
            }
            Value::Dict(entries) => {
                let borrowed = entries.borrow();
                let mut map = IndexMap::new();
                for (k, v) in borrowed.iter() {
                    if object_id_of(v).is_some() {
                        queue.push_back(v.clone());
                    }
                    if let Some(child_id) = object_id_of(v) {
                        map.insert(dict_key_to_string(k), child_id);
                    }
                }
                if map.len() == borrowed.len() {
                    ObjectTableEntry { ty: "dict".to_string(), value: ObjectValue::Mapping(map), is_collection: true }
                } else {
                    // Mixed primitive/object values: fall back to a fully
                    // serialized snapshot rather than a lossy partial map.
                    ObjectTableEntry {
                        ty: "dict".to_string(),
                        value: ObjectValue::Primitive(serialize(&value)),
                        is_collection: true,
                    }
                }
            }
            Value::Set(items) => {
                ObjectTableEntry { ty: "set".to_string(), value: ObjectValue::Primitive(serialize(&value)), is_collection: true }
            }
            Value::Instance(instance) => {
                let borrowed = instance.borrow();
                let mut map = IndexMap::new();
                for (k, v) in &borrowed.attrs {
                    if object_id_of(v).is_some() {
                        queue.push_back(v.clone());
                    }
                    if let Some(child_id) = object_id_of(v) {
                        map.insert(k.clone(), child_id);
                    } else {
                        map.insert(k.clone(), ObjectId::of(instance));
                    }
                }
                ObjectTableEntry {
                    ty: borrowed.class.name.clone(),
                    value: ObjectValue::Mapping(map),
                    is_collection: false,
                }
            }
            _ => continue,
        };
        visited.insert(id, entry);
    }
    visited
}

/// A sequence's structural body is an ordered list of its elements'
/// identities (§3, "sequence → ordered list of identities"). Primitive
/// elements (ints, bools, `None`, …) have no identity of their own, so a
/// sequence carrying any of them falls back to a fully serialized snapshot
/// rather than silently dropping them from the list — the same fallback
/// the dict and set branches above already take.
fn sequence_or_primitive(items: &[Value], whole: &Value) -> ObjectValue {
    let ids: Vec<ObjectId> = items.iter().filter_map(object_id_of).collect();
    if ids.len() == items.len() {
        ObjectValue::Sequence(ids)
    } else {
        ObjectValue::Primitive(serialize(whole))
    }
}
