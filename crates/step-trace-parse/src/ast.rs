//! AST for the supported statement/expression grammar subset (§4.B).
//!
//! Every node carries a `Cell<NodeId>`, initialized to a sentinel value at
//! parse time and filled in by `step-trace-rewrite`'s BFS id-assignment
//! pass (mirroring `ast.walk`'s traversal order). Using a `Cell` instead of
//! rebuilding the tree keeps id assignment a separate, single-purpose pass
//! without forcing two parallel tree shapes.

use std::cell::Cell;

use step_trace_core::NodeId;

pub const UNASSIGNED: NodeId = NodeId::new(u32::MAX);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl Span {
    #[must_use]
    pub fn to_core(self) -> step_trace_core::Span {
        step_trace_core::Span {
            start_line: self.start_line,
            start_col: self.start_col,
            end_line: self.end_line,
            end_col: self.end_col,
        }
    }
}

#[derive(Debug)]
pub struct Module {
    pub body: Vec<Stmt>,
}

#[derive(Debug)]
pub struct Stmt {
    pub id: Cell<NodeId>,
    pub span: Span,
    pub kind: StmtKind,
}

#[derive(Debug)]
pub enum StmtKind {
    ExprStmt(Box<Expr>),
    Assign { targets: Vec<Expr>, value: Box<Expr> },
    AugAssign { target: Box<Expr>, op: BinOp, value: Box<Expr> },
    If { test: Box<Expr>, body: Vec<Stmt>, orelse: Vec<Stmt> },
    While { test: Box<Expr>, body: Vec<Stmt> },
    For { target: Box<Expr>, iter: Box<Expr>, body: Vec<Stmt> },
    Return(Option<Box<Expr>>),
    Pass,
    Break,
    Continue,
    FunctionDef { name: String, params: Vec<String>, body: Vec<Stmt> },
    ClassDef { name: String, bases: Vec<Expr>, body: Vec<Stmt> },
}

#[derive(Debug)]
pub struct Expr {
    pub id: Cell<NodeId>,
    pub span: Span,
    pub kind: ExprKind,
}

#[derive(Debug)]
pub enum ExprKind {
    Name(String),
    IntLit(i64),
    FloatLit(f64),
    StrLit(String),
    BoolLit(bool),
    NoneLit,
    JoinedStr(Vec<FStringSegment>),
    List(Vec<Expr>),
    Tuple(Vec<Expr>),
    Dict(Vec<(Expr, Expr)>),
    Set(Vec<Expr>),
    Subscript { value: Box<Expr>, index: Box<Expr> },
    Attribute { value: Box<Expr>, attr: String },
    Call { func: Box<Expr>, args: Vec<Expr>, kwargs: Vec<(String, Expr)> },
    Unary { op: UnaryOp, operand: Box<Expr> },
    BinOp { left: Box<Expr>, op: BinOp, right: Box<Expr> },
    BoolOp { op: BoolOp, values: Vec<Expr> },
    Compare { left: Box<Expr>, ops: Vec<CmpOp>, comparators: Vec<Expr> },
    IfExp { test: Box<Expr>, body: Box<Expr>, orelse: Box<Expr> },
}

#[derive(Debug)]
pub enum FStringSegment {
    Literal(String),
    /// An embedded `{expr}`. Per §4.B, the placeholder expression inside an
    /// f-string is excluded from callback instrumentation even though it is
    /// evaluated, so this does not carry its own `Expr` node id the way a
    /// normal sub-expression would — `step-trace-interp` evaluates it
    /// directly from the stored source text.
    Expr(Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    In,
    NotIn,
    Is,
    IsNot,
}

impl Stmt {
    #[must_use]
    pub fn new(span: Span, kind: StmtKind) -> Self {
        Self { id: Cell::new(UNASSIGNED), span, kind }
    }
}

impl Expr {
    #[must_use]
    pub fn new(span: Span, kind: ExprKind) -> Self {
        Self { id: Cell::new(UNASSIGNED), span, kind }
    }
}
