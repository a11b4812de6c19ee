//! Tracer error type.
//!
//! Mirrors `ouros`'s `ReplError`: a hand-rolled enum with manual `Display`,
//! `std::error::Error`, and `From` impls per pipeline stage, rather than a
//! `thiserror` derive.

use std::fmt;

/// A syntax error raised while parsing source text (§7).
#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub line: u32,
    pub col: u32,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, col {}: {}", self.line, self.col, self.message)
    }
}

impl std::error::Error for ParseError {}

/// An error raised by the traced program itself while it ran (§7,
/// "Runtime errors").
#[derive(Debug, Clone)]
pub struct RuntimeError {
    pub message: String,
    pub kind: String,
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for RuntimeError {}

/// A resource ceiling was exceeded (§7, "Resource errors"): too many steps,
/// too much recursion, or too large an object graph. Ceilings are set
/// generously so ordinary pedagogical snippets never trip them.
#[derive(Debug, Clone)]
pub struct ResourceError {
    pub message: String,
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resource limit exceeded: {}", self.message)
    }
}

impl std::error::Error for ResourceError {}

/// Top-level error produced anywhere in the tracer pipeline.
#[derive(Debug, Clone)]
pub enum TracerError {
    Parse(ParseError),
    Runtime(RuntimeError),
    Resource(ResourceError),
    /// A node id was reused with a different `NodeKind` within the same
    /// run, or some other internal consistency check failed (§4.F).
    Validation(String),
    /// An I/O or manifest-shape failure in the CLI driver.
    Io(String),
}

impl fmt::Display for TracerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(e) => write!(f, "parse error: {e}"),
            Self::Runtime(e) => write!(f, "runtime error: {e}"),
            Self::Resource(e) => write!(f, "{e}"),
            Self::Validation(msg) => write!(f, "validation error: {msg}"),
            Self::Io(msg) => write!(f, "io error: {msg}"),
        }
    }
}

impl std::error::Error for TracerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(e) => Some(e),
            Self::Runtime(e) => Some(e),
            Self::Resource(e) => Some(e),
            Self::Validation(_) | Self::Io(_) => None,
        }
    }
}

impl From<ParseError> for TracerError {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

impl From<RuntimeError> for TracerError {
    fn from(e: RuntimeError) -> Self {
        Self::Runtime(e)
    }
}

impl From<ResourceError> for TracerError {
    fn from(e: ResourceError) -> Self {
        Self::Resource(e)
    }
}

pub type TracerResult<T> = Result<T, TracerError>;
