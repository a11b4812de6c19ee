//! Fixed built-in classes and special-input materialization (§6).
//!
//! Ground truth: `utils.py` imports `TreeNode, Node, ListNode` into every
//! run's namespace so traced snippets can construct them directly (e.g.
//! `root = TreeNode(5)`), and the orchestrator materializes richer
//! structures (a level-order tree, a 1-indexed adjacency-list graph, a
//! singly-linked list) from plain JSON arrays before the entry point runs.
//! These classes have no `__init__` body in the traced language itself —
//! `eval.rs`'s `call_value` recognizes them by name and fills in their
//! attributes directly, the same way it would recognize any other
//! zero-argument-default constructor if this tree-walker supported default
//! parameter values (it doesn't; see `DESIGN.md`).

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::eval::Interp;
use crate::value::{ClassRef, ClassValue, Instance, Value};

const TREE_NODE: &str = "TreeNode";
const LIST_NODE: &str = "ListNode";
const GRAPH_NODE: &str = "Node";

#[must_use]
pub fn is_prelude_class(name: &str) -> bool {
    matches!(name, TREE_NODE | LIST_NODE | GRAPH_NODE)
}

fn empty_class(name: &str) -> ClassRef {
    Rc::new(ClassValue { name: name.to_string(), bases: Vec::new(), methods: IndexMap::new() })
}

/// Installs `TreeNode`/`ListNode`/`Node` into the global frame so a traced
/// snippet can reference them exactly as if they were user-defined classes.
pub fn install_prelude(interp: &mut Interp<'_>) {
    interp.set_global(TREE_NODE, Value::Class(empty_class(TREE_NODE)));
    interp.set_global(LIST_NODE, Value::Class(empty_class(LIST_NODE)));
    interp.set_global(GRAPH_NODE, Value::Class(empty_class(GRAPH_NODE)));
}

/// Attribute defaults for a direct `TreeNode(val)` / `ListNode(val, next)` /
/// `Node(val)` call from within a traced snippet — positional args fill in
/// source order, trailing omitted args default to `None` / an empty list.
#[must_use]
pub fn default_attrs(class_name: &str, args: &[Value], kwargs: &IndexMap<String, Value>) -> IndexMap<String, Value> {
    let mut positional = args.iter().cloned();
    let mut next_arg = |name: &str, default: Value| -> Value {
        kwargs.get(name).cloned().or_else(|| positional.next()).unwrap_or(default)
    };
    let mut attrs = IndexMap::new();
    match class_name {
        TREE_NODE => {
            attrs.insert("val".to_string(), next_arg("val", Value::Int(0)));
            attrs.insert("left".to_string(), next_arg("left", Value::None));
            attrs.insert("right".to_string(), next_arg("right", Value::None));
        }
        LIST_NODE => {
            attrs.insert("val".to_string(), next_arg("val", Value::Int(0)));
            attrs.insert("next".to_string(), next_arg("next", Value::None));
        }
        GRAPH_NODE => {
            attrs.insert("val".to_string(), next_arg("val", Value::Int(0)));
            attrs.insert("neighbors".to_string(), next_arg("neighbors", Value::List(Rc::new(RefCell::new(Vec::new())))));
        }
        _ => {}
    }
    attrs
}

fn tree_node(class: &ClassRef, val: Value, left: Value, right: Value) -> Value {
    let mut attrs = IndexMap::new();
    attrs.insert("val".to_string(), val);
    attrs.insert("left".to_string(), left);
    attrs.insert("right".to_string(), right);
    Value::Instance(Rc::new(RefCell::new(Instance { class: class.clone(), attrs })))
}

/// Builds a level-order binary tree from an array where `None` marks an
/// absent child, mirroring LeetCode's canonical tree-from-array shape
/// (ground truth: `spec.md` §6's `type=tree` special-input rewriter).
#[must_use]
pub fn materialize_tree(values: &[Option<Value>]) -> Value {
    let class = empty_class(TREE_NODE);
    let Some(Some(root_val)) = values.first() else { return Value::None };
    let root = tree_node(&class, root_val.clone(), Value::None, Value::None);
    let mut queue = std::collections::VecDeque::new();
    queue.push_back(root.clone());
    let mut i = 1;
    while let Some(parent) = queue.pop_front() {
        let Value::Instance(parent) = &parent else { unreachable!() };
        if let Some(Some(v)) = values.get(i) {
            let child = tree_node(&class, v.clone(), Value::None, Value::None);
            parent.borrow_mut().attrs.insert("left".to_string(), child.clone());
            queue.push_back(child);
        }
        i += 1;
        if let Some(Some(v)) = values.get(i) {
            let child = tree_node(&class, v.clone(), Value::None, Value::None);
            parent.borrow_mut().attrs.insert("right".to_string(), child.clone());
            queue.push_back(child);
        }
        i += 1;
    }
    root
}

/// Builds a singly-linked list from a flat value array (ground truth:
/// `spec.md` §6's `type=linkedList` special-input rewriter).
#[must_use]
pub fn materialize_linked_list(values: &[Value]) -> Value {
    let class = empty_class(LIST_NODE);
    let mut tail = Value::None;
    for v in values.iter().rev() {
        let mut attrs = IndexMap::new();
        attrs.insert("val".to_string(), v.clone());
        attrs.insert("next".to_string(), tail);
        tail = Value::Instance(Rc::new(RefCell::new(Instance { class: class.clone(), attrs })));
    }
    tail
}

/// Builds a 1-indexed adjacency-list graph (ground truth: `spec.md` §6's
/// `type=graph` special-input rewriter). Returns the node with value `1`,
/// matching the typical "graph problem" entry point shape.
#[must_use]
pub fn materialize_graph(adjacency: &[Vec<i64>]) -> Value {
    let class = empty_class(GRAPH_NODE);
    if adjacency.is_empty() {
        return Value::None;
    }
    let nodes: Vec<Rc<RefCell<Instance>>> = (1..=adjacency.len())
        .map(|val| {
            let mut attrs = IndexMap::new();
            attrs.insert("val".to_string(), Value::Int(val as i64));
            attrs.insert("neighbors".to_string(), Value::List(Rc::new(RefCell::new(Vec::new()))));
            Rc::new(RefCell::new(Instance { class: class.clone(), attrs }))
        })
        .collect();
    for (i, neighbor_ids) in adjacency.iter().enumerate() {
        let Value::List(list) = nodes[i].borrow().attrs.get("neighbors").cloned().unwrap() else { unreachable!() };
        for &id in neighbor_ids {
            if let Some(n) = nodes.get((id - 1) as usize) {
                list.borrow_mut().push(Value::Instance(n.clone()));
            }
        }
    }
    Value::Instance(nodes[0].clone())
}
