//! Variable classification: which names are containers, which are cursors
//! walking them (§4.D).
//!
//! Grounded on `relationship_analyzer.py`'s `_infer_variable_types` and
//! `_is_used_as_cursor_in_ast`. The Python original answers "is this name a
//! cursor?" by walking up from every `Name` occurrence to its parent node
//! and pattern-matching the parent's shape; this tree has no parent
//! pointers, so the walk below thread a `Ctx` describing the position a
//! name was found in down through the recursion instead. The two are the
//! same classification, computed in the opposite direction.

use indexmap::{IndexMap, IndexSet};

use step_trace_parse::ast::{CmpOp, Expr, ExprKind, Module, Stmt, StmtKind};

/// Containers and cursors inferred for one module.
#[derive(Debug, Default)]
pub struct Classification {
    pub containers: IndexSet<String>,
    pub cursors: IndexSet<String>,
}

#[must_use]
pub fn classify(module: &Module) -> Classification {
    let containers = infer_containers(module);

    let mut counts: IndexMap<String, (u32, u32)> = IndexMap::new();
    for stmt in &module.body {
        walk_stmt_usage(stmt, &mut counts);
    }

    let mut cursors = IndexSet::new();
    for (name, (cursor_n, noncursor_n)) in &counts {
        if containers.contains(name) {
            continue;
        }
        if *cursor_n > 0 && cursor_n >= noncursor_n {
            cursors.insert(name.clone());
        }
    }
    Classification { containers, cursors }
}

// ---- pass 1: container inference ------------------------------------------

const CONTAINER_ARG_FUNCS: &[&str] = &["len", "enumerate", "reversed", "sorted", "max", "min", "sum"];

fn infer_containers(module: &Module) -> IndexSet<String> {
    let mut containers = IndexSet::new();
    for stmt in &module.body {
        walk_stmt_containers(stmt, &mut containers);
    }
    containers
}

fn walk_stmt_containers(stmt: &Stmt, containers: &mut IndexSet<String>) {
    match &stmt.kind {
        StmtKind::ExprStmt(e) => walk_expr_containers(e, containers),
        StmtKind::Assign { targets, value } => {
            if let [single] = targets.as_slice() {
                if let ExprKind::Name(name) = &single.kind {
                    if matches!(value.kind, ExprKind::List(_) | ExprKind::Tuple(_) | ExprKind::Dict(_) | ExprKind::Set(_)) {
                        containers.insert(name.clone());
                    }
                }
            }
            for t in targets {
                walk_expr_containers(t, containers);
            }
            walk_expr_containers(value, containers);
        }
        StmtKind::AugAssign { target, value, .. } => {
            walk_expr_containers(target, containers);
            walk_expr_containers(value, containers);
        }
        StmtKind::If { test, body, orelse } => {
            walk_expr_containers(test, containers);
            for s in body {
                walk_stmt_containers(s, containers);
            }
            for s in orelse {
                walk_stmt_containers(s, containers);
            }
        }
        StmtKind::While { test, body } => {
            walk_expr_containers(test, containers);
            for s in body {
                walk_stmt_containers(s, containers);
            }
        }
        StmtKind::For { target, iter, body } => {
            walk_expr_containers(target, containers);
            match &iter.kind {
                ExprKind::Name(name) => {
                    containers.insert(name.clone());
                }
                ExprKind::Call { func, args, .. } => {
                    if let ExprKind::Name(fname) = &func.kind {
                        if fname == "enumerate" {
                            if let Some(ExprKind::Name(cn)) = args.first().map(|a| &a.kind) {
                                containers.insert(cn.clone());
                            }
                        }
                    }
                    walk_expr_containers(iter, containers);
                }
                _ => walk_expr_containers(iter, containers),
            }
            for s in body {
                walk_stmt_containers(s, containers);
            }
        }
        StmtKind::Return(Some(e)) => walk_expr_containers(e, containers),
        StmtKind::Return(None) | StmtKind::Pass | StmtKind::Break | StmtKind::Continue => {}
        StmtKind::FunctionDef { body, .. } => {
            for s in body {
                walk_stmt_containers(s, containers);
            }
        }
        StmtKind::ClassDef { bases, body, .. } => {
            for b in bases {
                walk_expr_containers(b, containers);
            }
            for s in body {
                walk_stmt_containers(s, containers);
            }
        }
    }
}

fn walk_expr_containers(expr: &Expr, containers: &mut IndexSet<String>) {
    match &expr.kind {
        ExprKind::Subscript { value, index } => {
            if let ExprKind::Name(cn) = &value.kind {
                containers.insert(cn.clone());
            }
            walk_expr_containers(value, containers);
            walk_expr_containers(index, containers);
        }
        ExprKind::Compare { left, ops, comparators } => {
            if let ([op], [comparator]) = (ops.as_slice(), comparators.as_slice()) {
                if matches!(op, CmpOp::In | CmpOp::NotIn) {
                    if let ExprKind::Name(cn) = &comparator.kind {
                        containers.insert(cn.clone());
                    }
                }
            }
            walk_expr_containers(left, containers);
            for c in comparators {
                walk_expr_containers(c, containers);
            }
        }
        ExprKind::Call { func, args, kwargs } => {
            walk_expr_containers(func, containers);
            for a in args {
                walk_expr_containers(a, containers);
            }
            for (_, v) in kwargs {
                walk_expr_containers(v, containers);
            }
        }
        ExprKind::BinOp { left, right, .. } => {
            walk_expr_containers(left, containers);
            walk_expr_containers(right, containers);
        }
        ExprKind::Unary { operand, .. } => walk_expr_containers(operand, containers),
        ExprKind::BoolOp { values, .. } => {
            for v in values {
                walk_expr_containers(v, containers);
            }
        }
        ExprKind::IfExp { test, body, orelse } => {
            walk_expr_containers(test, containers);
            walk_expr_containers(body, containers);
            walk_expr_containers(orelse, containers);
        }
        ExprKind::List(items) | ExprKind::Tuple(items) | ExprKind::Set(items) => {
            for it in items {
                walk_expr_containers(it, containers);
            }
        }
        ExprKind::Dict(entries) => {
            for (k, v) in entries {
                walk_expr_containers(k, containers);
                walk_expr_containers(v, containers);
            }
        }
        ExprKind::Attribute { value, .. } => walk_expr_containers(value, containers),
        ExprKind::JoinedStr(parts) => {
            for p in parts {
                if let step_trace_parse::ast::FStringSegment::Expr(e) = p {
                    walk_expr_containers(e, containers);
                }
            }
        }
        ExprKind::Name(_)
        | ExprKind::IntLit(_)
        | ExprKind::FloatLit(_)
        | ExprKind::StrLit(_)
        | ExprKind::BoolLit(_)
        | ExprKind::NoneLit => {}
    }
}

// ---- pass 2: cursor usage scoring ------------------------------------------

/// The position a `Name` was found in, determining whether its occurrence
/// counts toward the cursor score, the non-cursor score, or neither.
#[derive(Clone, Copy)]
enum Ctx {
    None,
    /// `arr[i]` — `i` is the subscript index itself.
    SubscriptIndex,
    /// `arr[i + 1]` — `i` is an operand of a `BinOp` sitting in index
    /// position (Python's "binary operation in slice" carve-out).
    SubscriptIndexOperand,
    /// `arr[...]` — `arr` is the value being subscripted.
    SubscriptValue,
    /// Argument of a bare `range(...)` call.
    RangeArg,
    /// Argument of `len`/`enumerate`/`reversed`/`sorted`/`max`/`min`/`sum`.
    ContainerCallArg,
    /// Right-hand comparator of a single `in`/`not in` test.
    MembershipContainer,
    /// `for x in name` — `name` itself.
    ForIterSimple,
    /// `for i in range(...)` — `i` itself.
    ForTargetRangeLoop,
    /// `for i, v in enumerate(...)` — `i` itself.
    EnumerateIndexTarget,
    /// A generic arithmetic operand; `small_offset` marks a `+`/`-` against
    /// a literal of magnitude <= 2, which Python's heuristic exempts from
    /// counting as non-cursor evidence (`arr[i + 1]`-style offsets are
    /// common cursor usage, not proof the name isn't one).
    ArithOperand { small_offset: bool },
}

enum Usage {
    Cursor,
    NonCursor,
}

fn classify_ctx(ctx: Ctx) -> Option<Usage> {
    match ctx {
        Ctx::SubscriptIndex | Ctx::SubscriptIndexOperand | Ctx::RangeArg | Ctx::ForTargetRangeLoop | Ctx::EnumerateIndexTarget => {
            Some(Usage::Cursor)
        }
        Ctx::SubscriptValue | Ctx::MembershipContainer | Ctx::ForIterSimple | Ctx::ContainerCallArg => Some(Usage::NonCursor),
        Ctx::ArithOperand { small_offset: false } => Some(Usage::NonCursor),
        Ctx::ArithOperand { small_offset: true } | Ctx::None => None,
    }
}

fn bump(counts: &mut IndexMap<String, (u32, u32)>, name: &str, usage: Usage) {
    let entry = counts.entry(name.to_string()).or_insert((0, 0));
    match usage {
        Usage::Cursor => entry.0 += 1,
        Usage::NonCursor => entry.1 += 1,
    }
}

fn walk_stmt_usage(stmt: &Stmt, counts: &mut IndexMap<String, (u32, u32)>) {
    match &stmt.kind {
        StmtKind::ExprStmt(e) => walk_expr_usage(e, Ctx::None, counts),
        StmtKind::Assign { targets, value } => {
            for t in targets {
                walk_expr_usage(t, Ctx::None, counts);
            }
            walk_expr_usage(value, Ctx::None, counts);
        }
        StmtKind::AugAssign { target, value, .. } => {
            walk_expr_usage(target, Ctx::None, counts);
            walk_expr_usage(value, Ctx::None, counts);
        }
        StmtKind::If { test, body, orelse } => {
            walk_expr_usage(test, Ctx::None, counts);
            for s in body {
                walk_stmt_usage(s, counts);
            }
            for s in orelse {
                walk_stmt_usage(s, counts);
            }
        }
        StmtKind::While { test, body } => {
            walk_expr_usage(test, Ctx::None, counts);
            for s in body {
                walk_stmt_usage(s, counts);
            }
        }
        StmtKind::For { target, iter, body } => {
            walk_for_usage(target, iter, counts);
            for s in body {
                walk_stmt_usage(s, counts);
            }
        }
        StmtKind::Return(Some(e)) => walk_expr_usage(e, Ctx::None, counts),
        StmtKind::Return(None) | StmtKind::Pass | StmtKind::Break | StmtKind::Continue => {}
        StmtKind::FunctionDef { body, .. } => {
            for s in body {
                walk_stmt_usage(s, counts);
            }
        }
        StmtKind::ClassDef { bases, body, .. } => {
            for b in bases {
                walk_expr_usage(b, Ctx::None, counts);
            }
            for s in body {
                walk_stmt_usage(s, counts);
            }
        }
    }
}

fn walk_for_usage(target: &Expr, iter: &Expr, counts: &mut IndexMap<String, (u32, u32)>) {
    match &iter.kind {
        ExprKind::Name(_) => {
            walk_expr_usage(iter, Ctx::ForIterSimple, counts);
            walk_expr_usage(target, Ctx::None, counts);
        }
        ExprKind::Call { func, args, .. } => {
            if let ExprKind::Name(fname) = &func.kind {
                match fname.as_str() {
                    "range" => {
                        for a in args {
                            if let ExprKind::Call { func: inner, args: inner_args, .. } = &a.kind {
                                if matches!(&inner.kind, ExprKind::Name(n) if n == "len") {
                                    for ia in inner_args {
                                        walk_expr_usage(ia, Ctx::ContainerCallArg, counts);
                                    }
                                    continue;
                                }
                            }
                            walk_expr_usage(a, Ctx::RangeArg, counts);
                        }
                        match &target.kind {
                            ExprKind::Name(_) => walk_expr_usage(target, Ctx::ForTargetRangeLoop, counts),
                            _ => walk_expr_usage(target, Ctx::None, counts),
                        }
                        return;
                    }
                    "enumerate" => {
                        for a in args {
                            walk_expr_usage(a, Ctx::ContainerCallArg, counts);
                        }
                        if let ExprKind::Tuple(items) = &target.kind {
                            if let [idx, val] = items.as_slice() {
                                walk_expr_usage(idx, Ctx::EnumerateIndexTarget, counts);
                                walk_expr_usage(val, Ctx::None, counts);
                                return;
                            }
                        }
                        walk_expr_usage(target, Ctx::None, counts);
                        return;
                    }
                    f if CONTAINER_ARG_FUNCS.contains(&f) => {
                        for a in args {
                            walk_expr_usage(a, Ctx::ContainerCallArg, counts);
                        }
                        walk_expr_usage(target, Ctx::None, counts);
                        return;
                    }
                    _ => {}
                }
            }
            walk_expr_usage(iter, Ctx::None, counts);
            walk_expr_usage(target, Ctx::None, counts);
        }
        ExprKind::Attribute { value, .. } => {
            walk_expr_usage(value, Ctx::None, counts);
            walk_expr_usage(target, Ctx::None, counts);
        }
        _ => {
            walk_expr_usage(iter, Ctx::None, counts);
            walk_expr_usage(target, Ctx::None, counts);
        }
    }
}

fn is_small_int_literal(expr: &Expr) -> bool {
    matches!(&expr.kind, ExprKind::IntLit(v) if v.unsigned_abs() <= 2)
}

fn walk_expr_usage(expr: &Expr, ctx: Ctx, counts: &mut IndexMap<String, (u32, u32)>) {
    if let ExprKind::Name(name) = &expr.kind {
        if let Some(usage) = classify_ctx(ctx) {
            bump(counts, name, usage);
        }
        return;
    }

    match &expr.kind {
        ExprKind::Subscript { value, index } => {
            walk_expr_usage(value, Ctx::SubscriptValue, counts);
            match &index.kind {
                ExprKind::BinOp { left, right, .. } => {
                    walk_expr_usage(left, Ctx::SubscriptIndexOperand, counts);
                    walk_expr_usage(right, Ctx::SubscriptIndexOperand, counts);
                }
                _ => walk_expr_usage(index, Ctx::SubscriptIndex, counts),
            }
        }
        ExprKind::Attribute { value, .. } => walk_expr_usage(value, Ctx::None, counts),
        ExprKind::Call { func, args, kwargs } => {
            match &func.kind {
                ExprKind::Name(fname) if CONTAINER_ARG_FUNCS.contains(&fname.as_str()) => {
                    for a in args {
                        walk_expr_usage(a, Ctx::ContainerCallArg, counts);
                    }
                }
                ExprKind::Name(fname) if fname == "range" => {
                    for a in args {
                        walk_expr_usage(a, Ctx::RangeArg, counts);
                    }
                }
                _ => {
                    walk_expr_usage(func, Ctx::None, counts);
                    for a in args {
                        walk_expr_usage(a, Ctx::None, counts);
                    }
                }
            }
            for (_, v) in kwargs {
                walk_expr_usage(v, Ctx::None, counts);
            }
        }
        ExprKind::BinOp { left, op, right } => {
            let is_add_sub = matches!(op, step_trace_parse::ast::BinOp::Add | step_trace_parse::ast::BinOp::Sub);
            let left_small = is_add_sub && is_small_int_literal(right);
            let right_small = is_add_sub && is_small_int_literal(left);
            walk_expr_usage(left, Ctx::ArithOperand { small_offset: left_small }, counts);
            walk_expr_usage(right, Ctx::ArithOperand { small_offset: right_small }, counts);
        }
        ExprKind::Unary { operand, .. } => walk_expr_usage(operand, Ctx::None, counts),
        ExprKind::BoolOp { values, .. } => {
            for v in values {
                walk_expr_usage(v, Ctx::None, counts);
            }
        }
        ExprKind::Compare { left, ops, comparators } => {
            if let ([op], [comparator]) = (ops.as_slice(), comparators.as_slice()) {
                if matches!(op, CmpOp::In | CmpOp::NotIn) {
                    walk_expr_usage(left, Ctx::None, counts);
                    walk_expr_usage(comparator, Ctx::MembershipContainer, counts);
                    return;
                }
            }
            walk_expr_usage(left, Ctx::None, counts);
            for c in comparators {
                walk_expr_usage(c, Ctx::None, counts);
            }
        }
        ExprKind::IfExp { test, body, orelse } => {
            walk_expr_usage(test, Ctx::None, counts);
            walk_expr_usage(body, Ctx::None, counts);
            walk_expr_usage(orelse, Ctx::None, counts);
        }
        ExprKind::List(items) | ExprKind::Tuple(items) | ExprKind::Set(items) => {
            for it in items {
                walk_expr_usage(it, Ctx::None, counts);
            }
        }
        ExprKind::Dict(entries) => {
            for (k, v) in entries {
                walk_expr_usage(k, Ctx::None, counts);
                walk_expr_usage(v, Ctx::None, counts);
            }
        }
        ExprKind::JoinedStr(parts) => {
            for p in parts {
                if let step_trace_parse::ast::FStringSegment::Expr(e) = p {
                    walk_expr_usage(e, Ctx::None, counts);
                }
            }
        }
        ExprKind::Name(_) | ExprKind::IntLit(_) | ExprKind::FloatLit(_) | ExprKind::StrLit(_) | ExprKind::BoolLit(_) | ExprKind::NoneLit => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use step_trace_parse::parser::parse;

    fn classify_source(src: &str) -> Classification {
        let module = parse(src).expect("parses");
        classify(&module)
    }

    #[test]
    fn plain_index_loop_marks_container_and_cursor() {
        let c = classify_source("for i in range(len(arr)):\n    x = arr[i]\n");
        assert!(c.containers.contains("arr"));
        assert!(c.cursors.contains("i"));
    }

    #[test]
    fn for_each_value_loop_is_not_a_cursor() {
        let c = classify_source("for v in arr:\n    x = v\n");
        assert!(c.containers.contains("arr"));
        assert!(!c.cursors.contains("v"));
    }

    #[test]
    fn two_pointer_names_classify_as_cursors() {
        let c = classify_source("while left < right:\n    x = arr[left]\n    y = arr[right]\n    left = left + 1\n");
        assert!(c.containers.contains("arr"));
        assert!(c.cursors.contains("left"));
        assert!(c.cursors.contains("right"));
    }

    #[test]
    fn literal_assignment_marks_container() {
        let c = classify_source("seen = set()\narr = [1, 2, 3]\n");
        assert!(c.containers.contains("arr"));
    }

    #[test]
    fn membership_test_right_side_is_container() {
        let c = classify_source("arr = [1, 2, 3]\nif x in arr:\n    pass\n");
        assert!(c.containers.contains("arr"));
    }
}
