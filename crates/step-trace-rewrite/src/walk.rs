//! A node-id-carrying view over the parsed tree, used for both BFS id
//! assignment and parent-map construction.

use step_trace_core::{NodeId, NodeKind};
use step_trace_parse::ast::{Expr, ExprKind, FStringSegment, Stmt, StmtKind};

/// A borrowed reference to either a statement or an expression node,
/// erasing the distinction so both can sit in one BFS queue the way
/// `ast.iter_child_nodes` treats every node uniformly.
#[derive(Clone, Copy)]
pub enum AnyNode<'a> {
    Stmt(&'a Stmt),
    Expr(&'a Expr),
}

impl<'a> AnyNode<'a> {
    #[must_use]
    pub fn id(self) -> NodeId {
        match self {
            Self::Stmt(s) => s.id.get(),
            Self::Expr(e) => e.id.get(),
        }
    }

    pub fn set_id(self, id: NodeId) {
        match self {
            Self::Stmt(s) => s.id.set(id),
            Self::Expr(e) => e.id.set(id),
        }
    }

    #[must_use]
    pub fn kind(self) -> NodeKind {
        match self {
            Self::Stmt(s) => match &s.kind {
                StmtKind::ExprStmt(_) => NodeKind::ExprStmt,
                StmtKind::Assign { .. } => NodeKind::Assign,
                StmtKind::AugAssign { .. } => NodeKind::AugAssign,
                StmtKind::If { .. } => NodeKind::If,
                StmtKind::While { .. } => NodeKind::While,
                StmtKind::For { .. } => NodeKind::For,
                StmtKind::Return(_) => NodeKind::Return,
                StmtKind::Pass => NodeKind::Pass,
                StmtKind::Break => NodeKind::Break,
                StmtKind::Continue => NodeKind::Continue,
                StmtKind::FunctionDef { .. } => NodeKind::FunctionDef,
                StmtKind::ClassDef { .. } => NodeKind::ClassDef,
            },
            Self::Expr(e) => match &e.kind {
                ExprKind::Name(_) => NodeKind::Name,
                ExprKind::IntLit(_)
                | ExprKind::FloatLit(_)
                | ExprKind::StrLit(_)
                | ExprKind::BoolLit(_)
                | ExprKind::NoneLit => NodeKind::Constant,
                ExprKind::JoinedStr(_) => NodeKind::JoinedStr,
                ExprKind::List(_) => NodeKind::List,
                ExprKind::Tuple(_) => NodeKind::Tuple,
                ExprKind::Dict(_) => NodeKind::Dict,
                ExprKind::Set(_) => NodeKind::Set,
                ExprKind::Subscript { .. } => NodeKind::Subscript,
                ExprKind::Attribute { .. } => NodeKind::Attribute,
                ExprKind::Call { .. } => NodeKind::Call,
                ExprKind::Unary { .. } => NodeKind::UnaryOp,
                ExprKind::BinOp { .. } => NodeKind::BinOp,
                ExprKind::BoolOp { .. } => NodeKind::BoolOp,
                ExprKind::Compare { .. } => NodeKind::Compare,
                ExprKind::IfExp { .. } => NodeKind::IfExp,
            },
        }
    }

    #[must_use]
    pub fn span(self) -> step_trace_parse::ast::Span {
        match self {
            Self::Stmt(s) => s.span,
            Self::Expr(e) => e.span,
        }
    }

    /// Direct children in source field order, matching the order
    /// `ast.iter_child_nodes` would visit them.
    #[must_use]
    pub fn children(self) -> Vec<AnyNode<'a>> {
        match self {
            Self::Stmt(s) => match &s.kind {
                StmtKind::ExprStmt(e) => vec![AnyNode::Expr(e)],
                StmtKind::Assign { targets, value } => {
                    let mut v: Vec<_> = targets.iter().map(AnyNode::Expr).collect();
                    v.push(AnyNode::Expr(value));
                    v
                }
                StmtKind::AugAssign { target, value, .. } => vec![AnyNode::Expr(target), AnyNode::Expr(value)],
                StmtKind::If { test, body, orelse } => {
                    let mut v = vec![AnyNode::Expr(test)];
                    v.extend(body.iter().map(AnyNode::Stmt));
                    v.extend(orelse.iter().map(AnyNode::Stmt));
                    v
                }
                StmtKind::While { test, body } => {
                    let mut v = vec![AnyNode::Expr(test)];
                    v.extend(body.iter().map(AnyNode::Stmt));
                    v
                }
                StmtKind::For { target, iter, body } => {
                    let mut v = vec![AnyNode::Expr(target), AnyNode::Expr(iter)];
                    v.extend(body.iter().map(AnyNode::Stmt));
                    v
                }
                StmtKind::Return(value) => value.iter().map(|e| AnyNode::Expr(e)).collect(),
                StmtKind::Pass | StmtKind::Break | StmtKind::Continue => Vec::new(),
                StmtKind::FunctionDef { body, .. } => body.iter().map(AnyNode::Stmt).collect(),
                StmtKind::ClassDef { bases, body, .. } => {
                    let mut v: Vec<_> = bases.iter().map(AnyNode::Expr).collect();
                    v.extend(body.iter().map(AnyNode::Stmt));
                    v
                }
            },
            Self::Expr(e) => match &e.kind {
                ExprKind::Name(_)
                | ExprKind::IntLit(_)
                | ExprKind::FloatLit(_)
                | ExprKind::StrLit(_)
                | ExprKind::BoolLit(_)
                | ExprKind::NoneLit => Vec::new(),
                ExprKind::JoinedStr(parts) => parts
                    .iter()
                    .filter_map(|p| match p {
                        FStringSegment::Literal(_) => None,
                        FStringSegment::Expr(e) => Some(AnyNode::Expr(e)),
                    })
                    .collect(),
                ExprKind::List(items) | ExprKind::Tuple(items) | ExprKind::Set(items) => {
                    items.iter().map(AnyNode::Expr).collect()
                }
                ExprKind::Dict(entries) => entries.iter().flat_map(|(k, v)| [AnyNode::Expr(k), AnyNode::Expr(v)]).collect(),
                ExprKind::Subscript { value, index } => vec![AnyNode::Expr(value), AnyNode::Expr(index)],
                ExprKind::Attribute { value, .. } => vec![AnyNode::Expr(value)],
                ExprKind::Call { func, args, kwargs } => {
                    let mut v = vec![AnyNode::Expr(func)];
                    v.extend(args.iter().map(AnyNode::Expr));
                    v.extend(kwargs.iter().map(|(_, e)| AnyNode::Expr(e)));
                    v
                }
                ExprKind::Unary { operand, .. } => vec![AnyNode::Expr(operand)],
                ExprKind::BinOp { left, right, .. } => vec![AnyNode::Expr(left), AnyNode::Expr(right)],
                ExprKind::BoolOp { values, .. } => values.iter().map(AnyNode::Expr).collect(),
                ExprKind::Compare { left, comparators, .. } => {
                    let mut v = vec![AnyNode::Expr(left)];
                    v.extend(comparators.iter().map(AnyNode::Expr));
                    v
                }
                ExprKind::IfExp { test, body, orelse } => vec![AnyNode::Expr(test), AnyNode::Expr(body), AnyNode::Expr(orelse)],
            },
        }
    }
}
