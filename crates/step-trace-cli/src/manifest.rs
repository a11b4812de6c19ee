//! Problem manifest shape (§6, "Manifest runner").
//!
//! Ground truth: `trace.py` reads `problems.json`'s `"problems"` array and
//! calls the tracer once per record with `problem['solution']`,
//! `problem['entrypoint']`, and `**problem['inputs']`.

use indexmap::IndexMap;
use serde::Deserialize;

use step_trace_analyze::ManualRelationship;
use step_trace_assemble::inputs::{SpecialInput, SpecialInputKind};

#[derive(Debug, Deserialize)]
pub struct ManifestFile {
    pub problems: Vec<Problem>,
}

#[derive(Debug, Deserialize)]
pub struct Problem {
    pub id: String,
    pub solution: Option<String>,
    pub template: Option<String>,
    pub entrypoint: Option<String>,
    #[serde(default)]
    pub inputs: IndexMap<String, serde_json::Value>,
    #[serde(default)]
    pub special_inputs: Vec<SpecialInputRaw>,
    #[serde(default, rename = "manualRelationships")]
    pub manual_relationships: Vec<ManualRelationshipRaw>,
}

impl Problem {
    /// The traced source text: `solution` when present, otherwise
    /// `template` (ground truth allows either key).
    pub fn code(&self) -> Result<&str, String> {
        self.solution.as_deref().or(self.template.as_deref()).ok_or_else(|| format!("problem '{}' has neither solution nor template", self.id))
    }
}

#[derive(Debug, Deserialize)]
pub struct SpecialInputRaw {
    pub key: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub output_key: String,
}

#[derive(Debug, Deserialize)]
pub struct ManualRelationshipRaw {
    pub container: String,
    pub cursor: String,
    pub kind: String,
}

/// Converts a manifest's raw special-input/manual-relationship records into
/// the typed shapes `step-trace-assemble`/`step-trace-analyze` expect.
/// Bails on the first record this workspace doesn't recognize, rather than
/// silently dropping it.
pub fn resolve_special_inputs(raw: &[SpecialInputRaw]) -> Result<Vec<SpecialInput>, String> {
    raw.iter()
        .map(|r| {
            let kind = SpecialInputKind::parse(&r.kind).ok_or_else(|| format!("unknown special input type '{}'", r.kind))?;
            Ok(SpecialInput { key: r.key.clone(), kind, output_key: r.output_key.clone() })
        })
        .collect()
}

pub fn resolve_manual_relationships(raw: &[ManualRelationshipRaw]) -> Result<Vec<ManualRelationship>, String> {
    raw.iter()
        .map(|r| {
            let kind = parse_relationship_kind(&r.kind).ok_or_else(|| format!("unknown relationship kind '{}'", r.kind))?;
            Ok(ManualRelationship { container: r.container.clone(), cursor: r.cursor.clone(), kind })
        })
        .collect()
}

fn parse_relationship_kind(name: &str) -> Option<step_trace_core::RelationshipKind> {
    use step_trace_core::RelationshipKind;
    match name {
        "key-access" => Some(RelationshipKind::KeyAccess),
        "key-assignment" => Some(RelationshipKind::KeyAssignment),
        "key-index" => Some(RelationshipKind::KeyIndex),
        "value-index" => Some(RelationshipKind::ValueIndex),
        "dict-key" => Some(RelationshipKind::DictKey),
        "dict-value" => Some(RelationshipKind::DictValue),
        "membership-test" => Some(RelationshipKind::MembershipTest),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_manifest() {
        let json = r#"{"problems": [{"id": "two-sum", "solution": "def f(): pass", "entrypoint": "f", "inputs": {}}]}"#;
        let manifest: ManifestFile = serde_json::from_str(json).expect("valid manifest");
        assert_eq!(manifest.problems.len(), 1);
        assert_eq!(manifest.problems[0].code().unwrap(), "def f(): pass");
    }

    #[test]
    fn template_is_used_when_solution_is_absent() {
        let json = r#"{"problems": [{"id": "p", "template": "pass", "entrypoint": null}]}"#;
        let manifest: ManifestFile = serde_json::from_str(json).expect("valid manifest");
        assert_eq!(manifest.problems[0].code().unwrap(), "pass");
    }

    #[test]
    fn unknown_relationship_kind_is_rejected() {
        let raw = vec![ManualRelationshipRaw { container: "arr".to_string(), cursor: "i".to_string(), kind: "not-a-kind".to_string() }];
        assert!(resolve_manual_relationships(&raw).is_err());
    }
}
