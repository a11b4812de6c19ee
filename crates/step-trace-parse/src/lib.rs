//! Lexing, AST types, and parsing for the traced language's supported
//! statement/expression grammar subset.

pub mod ast;
pub mod parser;
pub mod token;

pub use ast::{BinOp, BoolOp, CmpOp, Expr, ExprKind, FStringSegment, Module, Span, Stmt, StmtKind, UnaryOp};
pub use parser::parse;
