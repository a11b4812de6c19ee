//! JSON keyword-input conversion and special-input materialization (§6).
//!
//! Grounded on `python_tracer.py::transform_inputs`: plain JSON-shaped
//! kwargs are converted once into runtime values, then a handful of
//! declared rewrites turn a flat array into a richer structure (a
//! level-order binary tree, a 1-indexed adjacency-list graph, or a singly
//! linked list) before the entry point is called.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use step_trace_interp::prelude::{materialize_graph, materialize_linked_list, materialize_tree};
use step_trace_interp::value::DictKey;
use step_trace_interp::Value;

/// One entry of the manifest's `special_inputs` list.
#[derive(Debug, Clone)]
pub struct SpecialInput {
    pub key: String,
    pub kind: SpecialInputKind,
    pub output_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialInputKind {
    Tree,
    Graph,
    LinkedList,
}

impl SpecialInputKind {
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "tree" => Some(Self::Tree),
            "graph" => Some(Self::Graph),
            "linkedList" => Some(Self::LinkedList),
            _ => None,
        }
    }
}

/// Converts a plain JSON value into a runtime `Value`. JSON objects become
/// dicts keyed by their string keys (not necessarily hashable-checked: JSON
/// object keys are always strings, which are always legal dict keys).
#[must_use]
pub fn json_to_value(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::None,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                Value::Float(n.as_f64().unwrap_or(0.0))
            }
        }
        serde_json::Value::String(s) => Value::Str(Rc::new(s.clone())),
        serde_json::Value::Array(items) => Value::List(Rc::new(RefCell::new(items.iter().map(json_to_value).collect()))),
        serde_json::Value::Object(map) => {
            let mut dict = IndexMap::new();
            for (k, v) in map {
                dict.insert(DictKey::Str(Rc::new(k.clone())), json_to_value(v));
            }
            Value::Dict(Rc::new(RefCell::new(dict)))
        }
    }
}

/// Converts a whole JSON object of keyword inputs into runtime values,
/// preserving manifest declaration order.
#[must_use]
pub fn json_inputs_to_values(inputs: &IndexMap<String, serde_json::Value>) -> IndexMap<String, Value> {
    inputs.iter().map(|(k, v)| (k.clone(), json_to_value(v))).collect()
}

fn list_of(value: &Value) -> Vec<Value> {
    match value {
        Value::List(items) => items.borrow().clone(),
        Value::Tuple(items) => items.as_ref().clone(),
        _ => Vec::new(),
    }
}

fn int_of(value: &Value) -> i64 {
    match value {
        Value::Int(i) => *i,
        Value::Float(f) => *f as i64,
        _ => 0,
    }
}

/// Applies the manifest's special-input rewrites in order, mutating
/// `kwargs` in place. A rewrite that names a missing key is silently
/// skipped, mirroring `transform_inputs`'s `if key in transformed_kwargs`
/// guard.
pub fn apply_special_inputs(kwargs: &mut IndexMap<String, Value>, specials: &[SpecialInput]) {
    for special in specials {
        let Some(raw) = kwargs.get(&special.key) else { continue };
        let materialized = match special.kind {
            SpecialInputKind::Tree => {
                let levels = list_of(raw).into_iter().map(|v| if matches!(v, Value::None) { None } else { Some(v) }).collect::<Vec<_>>();
                materialize_tree(&levels)
            }
            SpecialInputKind::Graph => {
                let adjacency = list_of(raw).into_iter().map(|row| list_of(&row).iter().map(int_of).collect::<Vec<_>>()).collect::<Vec<_>>();
                materialize_graph(&adjacency)
            }
            SpecialInputKind::LinkedList => materialize_linked_list(&list_of(raw)),
        };
        if special.output_key != special.key {
            kwargs.shift_remove(&special.key);
        }
        kwargs.insert(special.output_key.clone(), materialized);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_array_with_nulls_converts_to_a_list_with_none_holes() {
        let json = serde_json::json!([1, null, 2, 3]);
        let value = json_to_value(&json);
        let Value::List(items) = value else { panic!("expected list") };
        let items = items.borrow();
        assert_eq!(items.len(), 4);
        assert!(matches!(items[1], Value::None));
    }

    #[test]
    fn tree_special_input_replaces_the_original_key() {
        let mut kwargs = IndexMap::new();
        kwargs.insert("root".to_string(), json_to_value(&serde_json::json!([1, null, 2, 3])));
        let specials = vec![SpecialInput { key: "root".to_string(), kind: SpecialInputKind::Tree, output_key: "root".to_string() }];
        apply_special_inputs(&mut kwargs, &specials);
        assert!(matches!(kwargs.get("root"), Some(Value::Instance(_))));
    }

    #[test]
    fn special_input_with_a_different_output_key_removes_the_original() {
        let mut kwargs = IndexMap::new();
        kwargs.insert("raw".to_string(), json_to_value(&serde_json::json!([1, 2])));
        let specials = vec![SpecialInput { key: "raw".to_string(), kind: SpecialInputKind::LinkedList, output_key: "head".to_string() }];
        apply_special_inputs(&mut kwargs, &specials);
        assert!(!kwargs.contains_key("raw"));
        assert!(kwargs.contains_key("head"));
    }
}
