//! Step, Object Table Entry, and Trace Line Entry (§3).

use indexmap::IndexMap;
use serde::Serialize;

use crate::node::NodeId;
use crate::value::{ObjectId, Serialized};

/// A callback observation event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Event {
    BeforeStatement,
    AfterStatement,
    BeforeExpression,
    AfterExpression,
}

/// One object reachable from the current frame's locals (§3, "Object Table
/// Entry").
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectTableEntry {
    #[serde(rename = "type")]
    pub ty: String,
    pub value: ObjectValue,
    #[serde(rename = "isCollection")]
    pub is_collection: bool,
}

/// The structural body of an `ObjectTableEntry`, keyed on whether the
/// underlying value is a collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ObjectValue {
    /// Sequence/set body: an ordered list of child object identities.
    Sequence(Vec<ObjectId>),
    /// Mapping/custom-record body: serialized-key (or attribute name) to
    /// child object identity.
    Mapping(IndexMap<String, ObjectId>),
    /// Primitive body: the value itself, serialized directly.
    Primitive(Serialized),
}

/// A single callback observation (§3, "Step").
#[derive(Debug, Clone, Serialize)]
pub struct Step {
    pub step: u64,
    pub event: Event,
    pub node_id: NodeId,
    pub focus: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locals: Option<IndexMap<String, Serialized>>,
    #[serde(rename = "var_table", skip_serializing_if = "Option::is_none")]
    pub var_table: Option<IndexMap<String, ObjectId>>,
    #[serde(rename = "object_table", skip_serializing_if = "Option::is_none")]
    pub object_table: Option<IndexMap<ObjectId, ObjectTableEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Serialized>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
}

/// An uncompressed step, as captured by the Step Recorder before the Trace
/// Assembler groups and compresses it (§4.E step 3).
#[derive(Debug, Clone)]
pub struct RawStep {
    pub step: u64,
    pub event: Event,
    pub node_id: NodeId,
    pub line: u32,
    pub focus: String,
    pub locals: IndexMap<String, Serialized>,
    pub var_table: IndexMap<String, ObjectId>,
    pub object_table: IndexMap<ObjectId, ObjectTableEntry>,
    pub value: Option<Serialized>,
    pub test: Option<bool>,
    pub stdout: Option<String>,
}

/// A group of steps sharing one source line (§3, "Trace Line Entry").
#[derive(Debug, Clone, Serialize)]
pub struct TraceLineEntry {
    pub line_number: u32,
    pub locals: IndexMap<String, Serialized>,
    #[serde(rename = "var_table")]
    pub var_table: IndexMap<String, ObjectId>,
    #[serde(rename = "object_table")]
    pub object_table: IndexMap<ObjectId, ObjectTableEntry>,
    pub delta: Option<Serialized>,
    pub steps: Vec<Step>,
}
