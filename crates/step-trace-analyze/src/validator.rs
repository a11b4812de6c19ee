//! Post-hoc check that every `node_id` maps to exactly one construct kind
//! (§4.F).
//!
//! Grounded on `validate_trace.py`'s `collect_ast_node_info`/`validate_tree`:
//! walk whatever tree is handed in, recording the kind seen at each id, and
//! flag any id whose recorded kinds aren't all the same.

use indexmap::IndexMap;

use step_trace_core::{NodeId, NodeKind, SourceNode};

#[derive(Debug, Clone)]
pub struct Conflict {
    pub node_id: NodeId,
    pub kinds: Vec<NodeKind>,
}

#[derive(Debug)]
pub struct ValidationReport {
    pub conflicts: Vec<Conflict>,
    pub total_nodes: usize,
}

impl ValidationReport {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.conflicts.is_empty()
    }
}

/// Builds a `node_id -> observed kinds` map from raw `(id, kind)`
/// observations and reports any id that was observed under more than one
/// kind. This is the primitive the tree walkers below feed; a well-formed
/// node table can never disagree with itself, so most callers only ever
/// see the convenience wrappers pass with zero conflicts — the primitive
/// stays general so it also covers a future second tree representation
/// (e.g. validating a recorded run's ids against the rewritten AST
/// directly) without a second conflict-detection path.
#[must_use]
pub fn validate_observations(observations: impl IntoIterator<Item = (NodeId, NodeKind)>) -> ValidationReport {
    let mut seen: IndexMap<NodeId, Vec<NodeKind>> = IndexMap::new();
    for (id, kind) in observations {
        seen.entry(id).or_default().push(kind);
    }
    let total_nodes = seen.len();
    let mut conflicts = Vec::new();
    for (node_id, kinds) in seen {
        let mut distinct: Vec<NodeKind> = Vec::new();
        for k in kinds {
            if !distinct.contains(&k) {
                distinct.push(k);
            }
        }
        if distinct.len() > 1 {
            conflicts.push(Conflict { node_id, kinds: distinct });
        }
    }
    ValidationReport { conflicts, total_nodes }
}

/// Validates a flat node table keyed by `node_id`, following
/// `children_node_ids` from every root (a node with no `parent_node_id`).
#[must_use]
pub fn validate(entries: &IndexMap<NodeId, SourceNode>) -> ValidationReport {
    let roots: Vec<NodeId> = entries.values().filter(|n| n.parent_node_id.is_none()).map(|n| n.node_id).collect();
    let mut observations = Vec::new();
    for root in roots {
        collect(root, entries, &mut observations);
    }
    validate_observations(observations)
}

fn collect(id: NodeId, entries: &IndexMap<NodeId, SourceNode>, observations: &mut Vec<(NodeId, NodeKind)>) {
    let Some(node) = entries.get(&id) else { return };
    observations.push((id, node.kind));
    for child in &node.children_node_ids {
        collect(*child, entries, observations);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use step_trace_core::Span;

    fn node(id: u32, kind: NodeKind, children: &[u32], parent: Option<u32>) -> SourceNode {
        SourceNode {
            node_id: NodeId::new(id),
            kind,
            location: Span { start_line: 1, start_col: 0, end_line: 1, end_col: 1 },
            focus: String::new(),
            children_node_ids: children.iter().map(|c| NodeId::new(*c)).collect(),
            parent_node_id: parent.map(NodeId::new),
        }
    }

    #[test]
    fn well_formed_table_has_no_conflicts() {
        let mut entries = IndexMap::new();
        entries.insert(NodeId::new(0), node(0, NodeKind::Assign, &[1], None));
        entries.insert(NodeId::new(1), node(1, NodeKind::Name, &[], Some(0)));
        let report = validate(&entries);
        assert!(report.is_valid());
        assert_eq!(report.total_nodes, 2);
    }

    #[test]
    fn same_id_observed_under_two_kinds_is_a_conflict() {
        let observations = vec![(NodeId::new(0), NodeKind::Assign), (NodeId::new(0), NodeKind::BinOp), (NodeId::new(1), NodeKind::Name)];
        let report = validate_observations(observations);
        assert!(!report.is_valid());
        assert_eq!(report.conflicts.len(), 1);
        assert_eq!(report.conflicts[0].node_id, NodeId::new(0));
        assert_eq!(report.total_nodes, 2);
    }
}
