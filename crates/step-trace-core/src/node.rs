//! Source construct identity: node ids, the closed tag set of construct
//! kinds, and the `SourceNode` shape emitted in the final artifact's `ast`.

use serde::Serialize;

/// Stable identifier for a source construct, assigned once per parse in
/// traversal order. Never reused within a run; a fresh run restarts at 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(u32);

impl NodeId {
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    #[must_use]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Synthetic node id carried by manually supplied relationships. These are
/// negative and never collide with a real, parse-assigned `NodeId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RelationshipNodeId(i64);

impl RelationshipNodeId {
    #[must_use]
    pub fn real(id: NodeId) -> Self {
        Self(i64::from(id.index()))
    }

    #[must_use]
    pub fn synthetic(ordinal: u32) -> Self {
        Self(-i64::from(ordinal + 1))
    }

    #[must_use]
    pub fn is_manual(self) -> bool {
        self.0 < 0
    }
}

/// Closed tag set of construct kinds a `node_id` may carry.
///
/// A node's type never changes across a run; the Validator (§4.F) checks
/// that invariant by walking either tree representation and rejecting any
/// id that shows up with more than one of these tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NodeKind {
    // statements
    ExprStmt,
    Assign,
    AugAssign,
    If,
    While,
    For,
    Return,
    Pass,
    Break,
    Continue,
    FunctionDef,
    ClassDef,
    // expressions
    Name,
    Constant,
    JoinedStr,
    FormattedValue,
    List,
    Tuple,
    Dict,
    Set,
    Subscript,
    Attribute,
    Call,
    UnaryOp,
    BinOp,
    BoolOp,
    Compare,
    IfExp,
}

impl NodeKind {
    #[must_use]
    pub fn is_statement(self) -> bool {
        matches!(
            self,
            Self::ExprStmt
                | Self::Assign
                | Self::AugAssign
                | Self::If
                | Self::While
                | Self::For
                | Self::Return
                | Self::Pass
                | Self::Break
                | Self::Continue
                | Self::FunctionDef
                | Self::ClassDef
        )
    }
}

/// Byte-free, line/column source span (1-indexed lines, 0-indexed columns,
/// matching `ast.get_source_segment`'s coordinate system in the traced
/// language's own tooling).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

/// One construct in the parsed source, as emitted in the artifact's `ast`.
#[derive(Debug, Clone, Serialize)]
pub struct SourceNode {
    pub node_id: NodeId,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub location: Span,
    pub focus: String,
    pub children_node_ids: Vec<NodeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_node_id: Option<NodeId>,
}
