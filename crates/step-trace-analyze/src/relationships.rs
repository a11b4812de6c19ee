//! Edge emission: turns a `Classification` and the parsed tree into the
//! concrete `(cursor, container, kind)` links the artifact's `relationships`
//! array carries (§4.D).
//!
//! Grounded on `relationship_analyzer.py`'s `_analyze_subscript`,
//! `_analyze_for_loop`, `_analyze_membership_test`, and
//! `_add_manual_relationships`.

use step_trace_core::{NodeId, Relationship, RelationshipKind, RelationshipNodeId};
use step_trace_parse::ast::{CmpOp, Expr, ExprKind, Module, Stmt, StmtKind};

use crate::classify::Classification;

/// A relationship supplied by the caller rather than inferred, carrying a
/// synthetic negative node id so it never collides with a parsed one.
#[derive(Debug, Clone)]
pub struct ManualRelationship {
    pub container: String,
    pub cursor: String,
    pub kind: RelationshipKind,
}

#[must_use]
pub fn infer_relationships(module: &Module, classification: &Classification) -> Vec<Relationship> {
    let mut out = Vec::new();
    for stmt in &module.body {
        walk_stmt(stmt, classification, &mut out);
    }
    out
}

/// Appends manually supplied relationships, assigning each a synthetic node
/// id in order and skipping any `(container, cursor, kind)` triple already
/// present.
pub fn merge_manual(out: &mut Vec<Relationship>, manual: &[ManualRelationship]) {
    for (i, m) in manual.iter().enumerate() {
        if out.iter().any(|r| r.container == m.container && r.cursor == m.cursor && same_kind(r.kind, m.kind)) {
            continue;
        }
        out.push(Relationship {
            cursor: m.cursor.clone(),
            container: m.container.clone(),
            kind: m.kind,
            node_id: RelationshipNodeId::synthetic(i as u32),
        });
    }
}

fn same_kind(a: RelationshipKind, b: RelationshipKind) -> bool {
    std::mem::discriminant(&a) == std::mem::discriminant(&b)
}

fn push_edge(out: &mut Vec<Relationship>, container: &str, cursor: &str, kind: RelationshipKind, node_id: NodeId) {
    if out.iter().any(|r| r.container == container && r.cursor == cursor && same_kind(r.kind, kind)) {
        return;
    }
    out.push(Relationship { cursor: cursor.to_string(), container: container.to_string(), kind, node_id: RelationshipNodeId::real(node_id) });
}

fn walk_stmt(stmt: &Stmt, c: &Classification, out: &mut Vec<Relationship>) {
    match &stmt.kind {
        StmtKind::ExprStmt(e) => walk_expr(e, c, out),
        StmtKind::Assign { targets, value } => {
            for t in targets {
                match &t.kind {
                    ExprKind::Subscript { value: container, index } => {
                        analyze_subscript(t.id.get(), container, index, c, out, true);
                        walk_expr(container, c, out);
                        walk_expr(index, c, out);
                    }
                    _ => walk_expr(t, c, out),
                }
            }
            walk_expr(value, c, out);
        }
        StmtKind::AugAssign { target, value, .. } => {
            walk_expr(target, c, out);
            walk_expr(value, c, out);
        }
        StmtKind::If { test, body, orelse } => {
            walk_expr(test, c, out);
            for s in body {
                walk_stmt(s, c, out);
            }
            for s in orelse {
                walk_stmt(s, c, out);
            }
        }
        StmtKind::While { test, body } => {
            walk_expr(test, c, out);
            for s in body {
                walk_stmt(s, c, out);
            }
        }
        StmtKind::For { target, iter, body } => {
            analyze_for(stmt.id.get(), target, iter, c, out);
            walk_expr(target, c, out);
            walk_expr(iter, c, out);
            for s in body {
                walk_stmt(s, c, out);
            }
        }
        StmtKind::Return(Some(e)) => walk_expr(e, c, out),
        StmtKind::Return(None) | StmtKind::Pass | StmtKind::Break | StmtKind::Continue => {}
        StmtKind::FunctionDef { body, .. } => {
            for s in body {
                walk_stmt(s, c, out);
            }
        }
        StmtKind::ClassDef { bases, body, .. } => {
            for b in bases {
                walk_expr(b, c, out);
            }
            for s in body {
                walk_stmt(s, c, out);
            }
        }
    }
}

fn walk_expr(expr: &Expr, c: &Classification, out: &mut Vec<Relationship>) {
    match &expr.kind {
        ExprKind::Subscript { value, index } => {
            analyze_subscript(expr.id.get(), value, index, c, out, false);
            walk_expr(value, c, out);
            walk_expr(index, c, out);
        }
        ExprKind::Compare { left, ops, comparators } => {
            if let ([op], [comparator]) = (ops.as_slice(), comparators.as_slice()) {
                if matches!(op, CmpOp::In | CmpOp::NotIn) {
                    if let (ExprKind::Name(cursor_name), ExprKind::Name(container_name)) = (&left.kind, &comparator.kind) {
                        if c.containers.contains(container_name) && c.cursors.contains(cursor_name) {
                            push_edge(out, container_name, cursor_name, RelationshipKind::MembershipTest, expr.id.get());
                        }
                    }
                }
            }
            walk_expr(left, c, out);
            for comp in comparators {
                walk_expr(comp, c, out);
            }
        }
        ExprKind::Call { func, args, kwargs } => {
            walk_expr(func, c, out);
            for a in args {
                walk_expr(a, c, out);
            }
            for (_, v) in kwargs {
                walk_expr(v, c, out);
            }
        }
        ExprKind::BinOp { left, right, .. } => {
            walk_expr(left, c, out);
            walk_expr(right, c, out);
        }
        ExprKind::Unary { operand, .. } => walk_expr(operand, c, out),
        ExprKind::BoolOp { values, .. } => {
            for v in values {
                walk_expr(v, c, out);
            }
        }
        ExprKind::IfExp { test, body, orelse } => {
            walk_expr(test, c, out);
            walk_expr(body, c, out);
            walk_expr(orelse, c, out);
        }
        ExprKind::List(items) | ExprKind::Tuple(items) | ExprKind::Set(items) => {
            for it in items {
                walk_expr(it, c, out);
            }
        }
        ExprKind::Dict(entries) => {
            for (k, v) in entries {
                walk_expr(k, c, out);
                walk_expr(v, c, out);
            }
        }
        ExprKind::Attribute { value, .. } => walk_expr(value, c, out),
        ExprKind::JoinedStr(parts) => {
            for p in parts {
                if let step_trace_parse::ast::FStringSegment::Expr(e) = p {
                    walk_expr(e, c, out);
                }
            }
        }
        ExprKind::Name(_) | ExprKind::IntLit(_) | ExprKind::FloatLit(_) | ExprKind::StrLit(_) | ExprKind::BoolLit(_) | ExprKind::NoneLit => {}
    }
}

fn analyze_subscript(node_id: NodeId, value: &Expr, index: &Expr, c: &Classification, out: &mut Vec<Relationship>, is_store: bool) {
    let ExprKind::Name(container_name) = &value.kind else { return };
    if !c.containers.contains(container_name) {
        return;
    }
    match &index.kind {
        ExprKind::Name(cursor_name) => {
            if c.cursors.contains(cursor_name) {
                let kind = if is_store { RelationshipKind::KeyAssignment } else { RelationshipKind::KeyAccess };
                push_edge(out, container_name, cursor_name, kind, node_id);
            }
        }
        ExprKind::BinOp { left, right, .. } if !is_store => {
            for operand in [left.as_ref(), right.as_ref()] {
                if let ExprKind::Name(cursor_name) = &operand.kind {
                    if c.cursors.contains(cursor_name) {
                        push_edge(out, container_name, cursor_name, RelationshipKind::KeyAccess, node_id);
                    }
                }
            }
        }
        _ => {}
    }
}

fn analyze_for(node_id: NodeId, target: &Expr, iter: &Expr, c: &Classification, out: &mut Vec<Relationship>) {
    match &iter.kind {
        ExprKind::Name(container_name) => {
            if c.containers.contains(container_name) {
                if let ExprKind::Name(cursor_name) = &target.kind {
                    push_edge(out, container_name, cursor_name, RelationshipKind::ValueIndex, node_id);
                }
            }
        }
        ExprKind::Call { func, args, .. } => {
            let ExprKind::Name(fname) = &func.kind else { return };
            match fname.as_str() {
                "enumerate" => analyze_enumerate_for(node_id, target, args, c, out),
                "range" => analyze_range_for(node_id, target, args, c, out),
                "zip" => analyze_zip_for(node_id, target, args, c, out),
                "reversed" => analyze_reversed_for(node_id, target, args, c, out),
                _ => {}
            }
        }
        ExprKind::Attribute { value, attr } => analyze_dict_method_for(node_id, target, value, attr, c, out),
        _ => {}
    }
}

fn analyze_enumerate_for(node_id: NodeId, target: &Expr, args: &[Expr], c: &Classification, out: &mut Vec<Relationship>) {
    let Some(container_name) = name_of(args.first()) else { return };
    if !c.containers.contains(container_name) {
        return;
    }
    let ExprKind::Tuple(items) = &target.kind else { return };
    let [idx, val] = items.as_slice() else { return };
    if let (ExprKind::Name(idx_name), ExprKind::Name(val_name)) = (&idx.kind, &val.kind) {
        push_edge(out, container_name, idx_name, RelationshipKind::KeyIndex, node_id);
        push_edge(out, container_name, val_name, RelationshipKind::ValueIndex, node_id);
    }
}

fn analyze_range_for(node_id: NodeId, target: &Expr, args: &[Expr], c: &Classification, out: &mut Vec<Relationship>) {
    let ExprKind::Name(cursor_name) = &target.kind else { return };
    for a in args {
        let ExprKind::Call { func, args: inner_args, .. } = &a.kind else { continue };
        if !matches!(&func.kind, ExprKind::Name(n) if n == "len") {
            continue;
        }
        let Some(container_name) = name_of(inner_args.first()) else { continue };
        if c.containers.contains(container_name) {
            push_edge(out, container_name, cursor_name, RelationshipKind::KeyIndex, node_id);
        }
    }
}

fn analyze_zip_for(node_id: NodeId, target: &Expr, args: &[Expr], c: &Classification, out: &mut Vec<Relationship>) {
    let ExprKind::Tuple(items) = &target.kind else { return };
    for (arg, item) in args.iter().zip(items.iter()) {
        if let (ExprKind::Name(container_name), ExprKind::Name(cursor_name)) = (&arg.kind, &item.kind) {
            if c.containers.contains(container_name) {
                push_edge(out, container_name, cursor_name, RelationshipKind::ValueIndex, node_id);
            }
        }
    }
}

fn analyze_reversed_for(node_id: NodeId, target: &Expr, args: &[Expr], c: &Classification, out: &mut Vec<Relationship>) {
    let Some(container_name) = name_of(args.first()) else { return };
    if !c.containers.contains(container_name) {
        return;
    }
    if let ExprKind::Name(cursor_name) = &target.kind {
        push_edge(out, container_name, cursor_name, RelationshipKind::ValueIndex, node_id);
    }
}

fn analyze_dict_method_for(node_id: NodeId, target: &Expr, receiver: &Expr, attr: &str, c: &Classification, out: &mut Vec<Relationship>) {
    let ExprKind::Name(container_name) = &receiver.kind else { return };
    if !c.containers.contains(container_name) {
        return;
    }
    match attr {
        "items" => {
            let ExprKind::Tuple(items) = &target.kind else { return };
            let [k, v] = items.as_slice() else { return };
            if let (ExprKind::Name(key_name), ExprKind::Name(val_name)) = (&k.kind, &v.kind) {
                push_edge(out, container_name, key_name, RelationshipKind::DictKey, node_id);
                push_edge(out, container_name, val_name, RelationshipKind::DictValue, node_id);
            }
        }
        "keys" => {
            if let ExprKind::Name(key_name) = &target.kind {
                push_edge(out, container_name, key_name, RelationshipKind::DictKey, node_id);
            }
        }
        "values" => {
            if let ExprKind::Name(val_name) = &target.kind {
                push_edge(out, container_name, val_name, RelationshipKind::DictValue, node_id);
            }
        }
        _ => {}
    }
}

fn name_of(expr: Option<&Expr>) -> Option<&str> {
    match expr.map(|e| &e.kind) {
        Some(ExprKind::Name(n)) => Some(n.as_str()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;
    use step_trace_parse::parser::parse;

    fn relationships_for(src: &str) -> Vec<Relationship> {
        let module = parse(src).expect("parses");
        let classification = classify(&module);
        infer_relationships(&module, &classification)
    }

    fn has(rels: &[Relationship], container: &str, cursor: &str, kind: RelationshipKind) -> bool {
        rels.iter().any(|r| r.container == container && r.cursor == cursor && same_kind(r.kind, kind))
    }

    #[test]
    fn range_len_index_access_emits_key_access() {
        let rels = relationships_for("for i in range(len(arr)):\n    x = arr[i]\n");
        assert!(has(&rels, "arr", "i", RelationshipKind::KeyAccess));
        assert!(has(&rels, "arr", "i", RelationshipKind::KeyIndex));
    }

    #[test]
    fn two_pointer_emits_key_access_for_both_cursors() {
        let rels = relationships_for("while left < right:\n    x = arr[left]\n    y = arr[right]\n    left = left + 1\n    right = right - 1\n");
        assert!(has(&rels, "arr", "left", RelationshipKind::KeyAccess));
        assert!(has(&rels, "arr", "right", RelationshipKind::KeyAccess));
    }

    #[test]
    fn enumerate_emits_key_index_and_value_index() {
        let rels = relationships_for("for i, v in enumerate(arr):\n    x = arr[i]\n    y = v\n");
        assert!(has(&rels, "arr", "i", RelationshipKind::KeyIndex));
        assert!(has(&rels, "arr", "v", RelationshipKind::ValueIndex));
    }

    #[test]
    fn membership_test_emits_edge_when_both_sides_qualify() {
        let rels = relationships_for("arr = [1, 2, 3]\nfor i in range(len(arr)):\n    if arr[i] in arr:\n        pass\n");
        assert!(has(&rels, "arr", "i", RelationshipKind::KeyAccess));
    }

    #[test]
    fn manual_relationship_gets_synthetic_negative_node_id() {
        let module = parse("x = 1\n").expect("parses");
        let classification = classify(&module);
        let mut rels = infer_relationships(&module, &classification);
        merge_manual(&mut rels, &[ManualRelationship { container: "grid".to_string(), cursor: "row".to_string(), kind: RelationshipKind::KeyAccess }]);
        assert_eq!(rels.len(), 1);
        assert!(rels[0].node_id.is_manual());
    }
}
