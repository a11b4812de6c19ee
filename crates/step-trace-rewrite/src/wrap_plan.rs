//! Instrumentation planning (§4.B).
//!
//! The distilled design wraps every evaluated sub-expression in a literal
//! `after_expression(before_expression(id), <expr>)` pair by rewriting
//! source text, then runs the rewritten program. Rust has no host-level
//! `eval` to rewrite-and-run against, so this workspace keeps the tree
//! exactly as parsed and instead computes a `WrapPlan`: a table, keyed by
//! `NodeId`, of which nodes the tree-walking evaluator in
//! `step-trace-interp` should fire `before_expression`/`after_expression`
//! callbacks for, and which are condition ("test") positions. The
//! evaluator consults this table instead of literal injected calls. This
//! is an architectural substitution, not a semantic one: the same nodes
//! fire the same callbacks in the same order either way, and `unwrap`
//! becomes the identity function since nothing was ever rewritten in
//! place — the clean tree *is* the parsed tree.

use std::collections::HashSet;

use step_trace_core::NodeId;
use step_trace_parse::ast::{Expr, ExprKind, Module, Stmt, StmtKind};

#[derive(Debug, Default)]
pub struct WrapPlan {
    /// Expression node ids that are NOT wrapped: assignment targets
    /// (`x` in `x = 1`, each name in `a, b = ...`, the `arr[i]` node itself
    /// in `arr[i] = 1` — though `arr` and `i` inside it still evaluate
    /// normally and remain wrapped).
    unwrapped: HashSet<NodeId>,
    /// Expression node ids that sit in a condition position (`if`/`while`
    /// test, ternary test) and should carry `test: true` on their step.
    test_positions: HashSet<NodeId>,
}

impl WrapPlan {
    #[must_use]
    pub fn is_wrapped(&self, id: NodeId) -> bool {
        !self.unwrapped.contains(&id)
    }

    #[must_use]
    pub fn is_test(&self, id: NodeId) -> bool {
        self.test_positions.contains(&id)
    }
}

#[must_use]
pub fn compute_wrap_plan(module: &Module) -> WrapPlan {
    let mut plan = WrapPlan::default();
    for stmt in &module.body {
        walk_stmt(stmt, &mut plan);
    }
    plan
}

fn mark_target(expr: &Expr, plan: &mut WrapPlan) {
    plan.unwrapped.insert(expr.id.get());
    // Unpacking targets recurse; subscript/attribute targets do not: the
    // outer node is the target, but its `value`/`index` are still
    // evaluated to locate the slot being assigned.
    match &expr.kind {
        ExprKind::Tuple(items) | ExprKind::List(items) => {
            for item in items {
                mark_target(item, plan);
            }
        }
        _ => {}
    }
}

fn walk_stmt(stmt: &Stmt, plan: &mut WrapPlan) {
    match &stmt.kind {
        StmtKind::ExprStmt(e) => walk_expr(e, plan),
        StmtKind::Assign { targets, value } => {
            for t in targets {
                mark_target(t, plan);
                walk_expr_children_only(t, plan);
            }
            walk_expr(value, plan);
        }
        StmtKind::AugAssign { target, value, .. } => {
            // The augmented target is both read and written; it keeps its
            // normal wrapping so its pre-update value is observable.
            walk_expr(target, plan);
            walk_expr(value, plan);
        }
        StmtKind::If { test, body, orelse } => {
            plan.test_positions.insert(test.id.get());
            walk_expr(test, plan);
            for s in body {
                walk_stmt(s, plan);
            }
            for s in orelse {
                walk_stmt(s, plan);
            }
        }
        StmtKind::While { test, body } => {
            plan.test_positions.insert(test.id.get());
            walk_expr(test, plan);
            for s in body {
                walk_stmt(s, plan);
            }
        }
        StmtKind::For { target, iter, body } => {
            mark_target(target, plan);
            walk_expr_children_only(target, plan);
            walk_expr(iter, plan);
            for s in body {
                walk_stmt(s, plan);
            }
        }
        StmtKind::Return(value) => {
            if let Some(v) = value {
                walk_expr(v, plan);
            }
        }
        StmtKind::Pass | StmtKind::Break | StmtKind::Continue => {}
        StmtKind::FunctionDef { body, .. } | StmtKind::ClassDef { body, .. } => {
            for s in body {
                walk_stmt(s, plan);
            }
        }
    }
}

/// Visits the sub-expressions of a target that still evaluate normally
/// (the `value`/`index` of a `Subscript`/`Attribute` target), without
/// re-marking the target node itself.
fn walk_expr_children_only(expr: &Expr, plan: &mut WrapPlan) {
    match &expr.kind {
        ExprKind::Subscript { value, index } => {
            walk_expr(value, plan);
            walk_expr(index, plan);
        }
        ExprKind::Attribute { value, .. } => walk_expr(value, plan),
        ExprKind::Tuple(items) | ExprKind::List(items) => {
            for item in items {
                walk_expr_children_only(item, plan);
            }
        }
        _ => {}
    }
}

/// Marks a call's callee as unwrapped (§4.B: the function-name slot of a
/// call never fires its own before/after-expression steps). For a method
/// call (`receiver.method(...)`), the method attribute itself and its
/// immediate receiver are both excluded too, mirroring
/// `_is_function_name`'s exclusion of the callee `Name`, the method
/// attribute, and the attribute's `value` — the receiver's own
/// sub-expressions still evaluate (and wrap) normally.
fn mark_function_name(func: &Expr, plan: &mut WrapPlan) {
    plan.unwrapped.insert(func.id.get());
    if let ExprKind::Attribute { value, .. } = &func.kind {
        plan.unwrapped.insert(value.id.get());
        walk_expr(value, plan);
    }
}

fn walk_expr(expr: &Expr, plan: &mut WrapPlan) {
    match &expr.kind {
        ExprKind::Name(_)
        | ExprKind::IntLit(_)
        | ExprKind::FloatLit(_)
        | ExprKind::StrLit(_)
        | ExprKind::BoolLit(_)
        | ExprKind::NoneLit => {}
        ExprKind::JoinedStr(parts) => {
            for part in parts {
                if let step_trace_parse::ast::FStringSegment::Expr(e) = part {
                    // Embedded f-string expressions are evaluated but are
                    // excluded from callback instrumentation (§4.B):
                    // recurse to catch nested statements-worth of structure
                    // (there are none in this grammar) without marking.
                    let _ = e;
                }
            }
        }
        ExprKind::List(items) | ExprKind::Tuple(items) | ExprKind::Set(items) => {
            for item in items {
                walk_expr(item, plan);
            }
        }
        ExprKind::Dict(entries) => {
            for (k, v) in entries {
                walk_expr(k, plan);
                walk_expr(v, plan);
            }
        }
        ExprKind::Subscript { value, index } => {
            walk_expr(value, plan);
            walk_expr(index, plan);
        }
        ExprKind::Attribute { value, .. } => walk_expr(value, plan),
        ExprKind::Call { func, args, kwargs } => {
            mark_function_name(func, plan);
            for a in args {
                walk_expr(a, plan);
            }
            for (_, v) in kwargs {
                walk_expr(v, plan);
            }
        }
        ExprKind::Unary { operand, .. } => walk_expr(operand, plan),
        ExprKind::BinOp { left, right, .. } => {
            walk_expr(left, plan);
            walk_expr(right, plan);
        }
        ExprKind::BoolOp { values, .. } => {
            for v in values {
                walk_expr(v, plan);
            }
        }
        ExprKind::Compare { left, comparators, .. } => {
            walk_expr(left, plan);
            for c in comparators {
                walk_expr(c, plan);
            }
        }
        ExprKind::IfExp { test, body, orelse } => {
            plan.test_positions.insert(test.id.get());
            walk_expr(test, plan);
            walk_expr(body, plan);
            walk_expr(orelse, plan);
        }
    }
}
