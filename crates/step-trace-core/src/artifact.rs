//! The final emitted object (§3, "Artifact") and its `metadata` field.

use indexmap::IndexMap;
use serde::Serialize;

use crate::node::SourceNode;
use crate::relationship::Relationship;
use crate::step::TraceLineEntry;
use crate::value::Serialized;

/// Metadata carried alongside the structural tree and trace (§6: "one JSON
/// document per snippet").
#[derive(Debug, Clone, Serialize)]
pub struct Metadata {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    pub inputs: IndexMap<String, Serialized>,
    pub stdout: String,
    #[serde(rename = "finalLocals")]
    pub final_locals: IndexMap<String, Serialized>,
}

/// The single self-contained output object (§3, "Artifact").
#[derive(Debug, Clone, Serialize)]
pub struct Artifact {
    pub metadata: Metadata,
    pub ast: Vec<SourceNode>,
    pub relationships: Vec<Relationship>,
    pub trace: Vec<TraceLineEntry>,
    /// Serialized return value of the entry point, or `None` when there was
    /// no entry point, or when the run failed in server mode (§7: "empty
    /// artifact shell").
    pub result: Option<Serialized>,
}

impl Artifact {
    /// The empty artifact shell emitted by server mode when the user
    /// program raises (§7, "Error policy"): empty trace, empty standard
    /// output, but a still-populated structural tree and relationship set.
    #[must_use]
    pub fn empty_shell(
        code: String,
        function: Option<String>,
        inputs: IndexMap<String, Serialized>,
        ast: Vec<SourceNode>,
        relationships: Vec<Relationship>,
    ) -> Self {
        Self {
            metadata: Metadata {
                code,
                function,
                inputs,
                stdout: String::new(),
                final_locals: IndexMap::new(),
            },
            ast,
            relationships,
            trace: Vec::new(),
            result: None,
        }
    }
}
