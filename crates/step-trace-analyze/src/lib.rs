//! Static inference of container/cursor relationships over the clean
//! structural tree, plus the post-hoc node-id validator (§4.D, §4.F).

pub mod classify;
pub mod relationships;
pub mod validator;

use step_trace_core::Relationship;
use step_trace_parse::ast::Module;

pub use classify::Classification;
pub use relationships::ManualRelationship;
pub use validator::{validate, validate_observations, Conflict, ValidationReport};

/// Runs variable classification followed by edge emission over a parsed
/// module, then folds in any manually supplied relationships. This is the
/// single entry point the assembler calls once per snippet.
#[must_use]
pub fn analyze(module: &Module, manual: &[ManualRelationship]) -> Vec<Relationship> {
    let classification = classify::classify(module);
    let mut relationships = relationships::infer_relationships(module, &classification);
    relationships::merge_manual(&mut relationships, manual);
    relationships
}

#[cfg(test)]
mod tests {
    use super::*;
    use step_trace_core::RelationshipKind;
    use step_trace_parse::parser::parse;

    #[test]
    fn analyze_merges_manual_relationships_after_inferred_ones() {
        let module = parse("for i in range(len(arr)):\n    x = arr[i]\n").expect("parses");
        let manual = vec![ManualRelationship { container: "grid".to_string(), cursor: "row".to_string(), kind: RelationshipKind::KeyAccess }];
        let rels = analyze(&module, &manual);
        assert!(rels.iter().any(|r| r.container == "arr" && r.cursor == "i"));
        assert!(rels.iter().any(|r| r.container == "grid" && r.cursor == "row" && r.node_id.is_manual()));
    }
}
