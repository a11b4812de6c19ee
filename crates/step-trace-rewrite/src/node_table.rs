//! BFS node-id assignment (mirroring `ast.walk`) and the resulting
//! `NodeTable`.

use indexmap::IndexMap;
use std::collections::VecDeque;

use step_trace_core::{NodeId, SourceNode};
use step_trace_parse::ast::Module;

use crate::walk::AnyNode;

/// `node_id` → construct metadata, keyed by assignment order.
pub struct NodeTable {
    pub entries: IndexMap<NodeId, Entry>,
}

pub struct Entry {
    pub node: SourceNode,
}

fn source_segment(source: &str, span: step_trace_parse::ast::Span) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let start_line = span.start_line.saturating_sub(1) as usize;
    let end_line = span.end_line.saturating_sub(1) as usize;
    if start_line >= lines.len() {
        return String::new();
    }
    if start_line == end_line {
        let line = lines[start_line];
        let start = (span.start_col as usize).min(line.len());
        let end = (span.end_col as usize).min(line.len()).max(start);
        return line[start..end].to_string();
    }
    let mut out = String::new();
    for (i, line) in lines.iter().enumerate().take(end_line + 1).skip(start_line) {
        if i == start_line {
            let start = (span.start_col as usize).min(line.len());
            out.push_str(&line[start..]);
        } else if i == end_line {
            let end = (span.end_col as usize).min(line.len());
            out.push_str(&line[..end]);
        } else {
            out.push_str(line);
        }
        out.push('\n');
    }
    out.trim_end().to_string()
}

/// Assigns a `NodeId` to every statement and expression node in `module` in
/// breadth-first order, then builds the `NodeTable` describing them. BFS
/// (rather than the parser's natural depth-first construction order) is
/// what `ast.walk` uses, and the final artifact's ids must match whatever
/// order the runtime callbacks observed, so the two must agree.
#[must_use]
pub fn assign_ids_and_build_table(module: &Module, source: &str) -> NodeTable {
    let roots: Vec<AnyNode<'_>> = module.body.iter().map(AnyNode::Stmt).collect();

    let mut queue: VecDeque<(AnyNode<'_>, Option<NodeId>)> = VecDeque::new();
    for r in &roots {
        queue.push_back((*r, None));
    }

    let mut next_id = 0u32;
    let mut order: Vec<(AnyNode<'_>, Option<NodeId>)> = Vec::new();
    while let Some((node, parent)) = queue.pop_front() {
        let id = NodeId::new(next_id);
        next_id += 1;
        node.set_id(id);
        order.push((node, parent));
        for child in node.children() {
            queue.push_back((child, Some(id)));
        }
    }

    let mut children_of: IndexMap<NodeId, Vec<NodeId>> = IndexMap::new();
    for (node, parent) in &order {
        if let Some(p) = parent {
            children_of.entry(*p).or_default().push(node.id());
        }
    }

    let mut entries = IndexMap::new();
    for (node, parent) in &order {
        let id = node.id();
        let span = node.span();
        let source_node = SourceNode {
            node_id: id,
            kind: node.kind(),
            location: span.to_core(),
            focus: source_segment(source, span),
            children_node_ids: children_of.get(&id).cloned().unwrap_or_default(),
            parent_node_id: *parent,
        };
        entries.insert(id, Entry { node: source_node });
    }

    NodeTable { entries }
}
