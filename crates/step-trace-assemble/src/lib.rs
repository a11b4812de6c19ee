//! Drives one tracer invocation end to end (§2's pipeline, leaves first):
//! parse, assign node ids and compute the wrap plan, run the rewritten
//! program under the Step Recorder, infer container/cursor relationships
//! over the clean tree, assemble the trace, and emit the artifact.
//!
//! The "unwrap the rewritten tree" step named in §4.E has nothing to do in
//! this workspace: `step-trace-rewrite`'s `WrapPlan` is consulted by the
//! evaluator at call sites rather than spliced into the tree, so the clean
//! structural tree is just `NodeTable`'s entries, already carrying the ids
//! the runtime callbacks saw.

pub mod assemble;
pub mod inputs;
pub mod recorder;

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use step_trace_analyze::ManualRelationship;
use step_trace_core::{Artifact, Metadata, ResourceError, RuntimeError, SourceNode, TracerError, TracerResult};
use step_trace_interp::format::serialize;
use step_trace_interp::{Interp, RuntimeErr, StepEvent, StepHooks, Value};
use step_trace_rewrite::{assign_ids_and_build_table, compute_wrap_plan, WrapPlan};

use inputs::SpecialInput;
use recorder::Recorder;

/// Everything one tracer invocation needs, mirroring the Orchestrator's
/// call contract in §6: source text, optional entry point, keyword inputs,
/// special-input rewrites, and manually supplied relationships.
pub struct TraceRequest {
    pub code: String,
    pub entry_point: Option<String>,
    pub inputs: IndexMap<String, serde_json::Value>,
    pub special_inputs: Vec<SpecialInput>,
    pub manual_relationships: Vec<ManualRelationship>,
}

/// Delegates every `StepHooks` call to a shared `Recorder`, so the steps it
/// accumulates can be read back out once the `Interp` that borrowed it has
/// gone out of scope.
struct RecorderHandle(Rc<RefCell<Recorder>>);

impl StepHooks for RecorderHandle {
    fn before_statement(&mut self, event: &StepEvent<'_>) {
        self.0.borrow_mut().before_statement(event);
    }

    fn after_statement(&mut self, event: &StepEvent<'_>) {
        self.0.borrow_mut().after_statement(event);
    }

    fn before_expression(&mut self, event: &StepEvent<'_>) {
        self.0.borrow_mut().before_expression(event);
    }

    fn after_expression(&mut self, event: &StepEvent<'_>, value: &Value) {
        self.0.borrow_mut().after_expression(event, value);
    }

    fn note_stdout(&mut self, text: &str) {
        self.0.borrow_mut().note_stdout(text);
    }
}

fn runtime_err_to_tracer_error(err: RuntimeErr) -> TracerError {
    if err.kind == "ResourceError" {
        TracerError::Resource(ResourceError { message: err.message })
    } else {
        TracerError::Runtime(RuntimeError { kind: err.kind, message: err.message })
    }
}

struct Prepared {
    module: step_trace_parse::ast::Module,
    wrap_plan: WrapPlan,
    ast: Vec<SourceNode>,
    relationships: Vec<step_trace_core::Relationship>,
    metadata_inputs: IndexMap<String, step_trace_core::Serialized>,
}

fn prepare(request: &TraceRequest) -> TracerResult<Prepared> {
    let module = step_trace_parse::parse(&request.code)?;
    let node_table = assign_ids_and_build_table(&module, &request.code);
    let wrap_plan = compute_wrap_plan(&module);
    let relationships = step_trace_analyze::analyze(&module, &request.manual_relationships);
    let ast: Vec<SourceNode> = node_table.entries.into_values().map(|entry| entry.node).collect();
    let metadata_inputs = inputs::json_inputs_to_values(&request.inputs).iter().map(|(k, v)| (k.clone(), serialize(v))).collect();
    Ok(Prepared { module, wrap_plan, ast, relationships, metadata_inputs })
}

struct ExecutionOutcome {
    trace: Vec<step_trace_core::TraceLineEntry>,
    stdout: String,
    result: Option<step_trace_core::Serialized>,
    final_locals: IndexMap<String, step_trace_core::Serialized>,
}

fn execute(prepared: &Prepared, request: &TraceRequest) -> Result<ExecutionOutcome, RuntimeErr> {
    let cell = Rc::new(RefCell::new(Recorder::new()));
    let stdout;
    let result;
    {
        let handle = RecorderHandle(cell.clone());
        let mut interp = Interp::new(&prepared.wrap_plan, &request.code, Box::new(handle));

        let mut kwargs = inputs::json_inputs_to_values(&request.inputs);
        inputs::apply_special_inputs(&mut kwargs, &request.special_inputs);

        interp.exec_block(&prepared.module.body)?;

        result = if let Some(name) = &request.entry_point {
            let func = interp.globals().get(name).cloned();
            match func {
                Some(func) => Some(interp.call_value(&func, Vec::new(), kwargs)?),
                None => None,
            }
        } else {
            None
        };
        stdout = interp.stdout.clone();
    }

    let steps = Rc::try_unwrap(cell).unwrap_or_else(|_| unreachable!("interp dropped, recorder uniquely owned")).into_inner().steps;
    let (trace, final_locals) = assemble::assemble_trace(&steps);
    Ok(ExecutionOutcome { trace, stdout, result: result.map(|v| serialize(&v)), final_locals })
}

/// Runs one snippet to completion, propagating any parse, runtime, or
/// resource error instead of recovering from it.
pub fn run(request: &TraceRequest) -> TracerResult<Artifact> {
    let prepared = prepare(request)?;
    let outcome = execute(&prepared, request).map_err(runtime_err_to_tracer_error)?;
    Ok(Artifact {
        metadata: Metadata {
            code: request.code.clone(),
            function: request.entry_point.clone(),
            inputs: prepared.metadata_inputs,
            stdout: outcome.stdout,
            final_locals: outcome.final_locals,
        },
        ast: prepared.ast,
        relationships: prepared.relationships,
        trace: outcome.trace,
        result: outcome.result,
    })
}

/// Server-mode variant (§7, "Error policy"): never propagates. A parse
/// failure yields an empty shell with no structural tree to show; a
/// runtime or resource failure during execution yields an empty shell that
/// still carries the structural tree and inferred relationships, since
/// those don't depend on the entry point having run successfully.
#[must_use]
pub fn run_server_mode(request: &TraceRequest) -> Artifact {
    let Ok(prepared) = prepare(request) else {
        return Artifact::empty_shell(request.code.clone(), request.entry_point.clone(), IndexMap::new(), Vec::new(), Vec::new());
    };
    match execute(&prepared, request) {
        Ok(outcome) => Artifact {
            metadata: Metadata {
                code: request.code.clone(),
                function: request.entry_point.clone(),
                inputs: prepared.metadata_inputs,
                stdout: outcome.stdout,
                final_locals: outcome.final_locals,
            },
            ast: prepared.ast,
            relationships: prepared.relationships,
            trace: outcome.trace,
            result: outcome.result,
        },
        Err(_) => Artifact::empty_shell(request.code.clone(), request.entry_point.clone(), prepared.metadata_inputs, prepared.ast, prepared.relationships),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(code: &str, entry_point: Option<&str>) -> TraceRequest {
        TraceRequest {
            code: code.to_string(),
            entry_point: entry_point.map(str::to_string),
            inputs: IndexMap::new(),
            special_inputs: Vec::new(),
            manual_relationships: Vec::new(),
        }
    }

    #[test]
    fn two_sum_style_snippet_records_key_access_relationship() {
        let code = "def two_sum(arr, target):\n    for i in range(len(arr)):\n        if arr[i] == target:\n            return i\n    return -1\n";
        let mut req = request(code, Some("two_sum"));
        req.inputs.insert("arr".to_string(), serde_json::json!([1, 2, 3]));
        req.inputs.insert("target".to_string(), serde_json::json!(3));
        let artifact = run(&req).expect("runs cleanly");
        assert!(artifact.relationships.iter().any(|r| r.container == "arr" && r.cursor == "i"));
        assert_eq!(artifact.result, Some(step_trace_core::Serialized::Int(2)));
        assert!(!artifact.trace.is_empty());
    }

    #[test]
    fn print_calls_attach_stdout_deltas_and_accumulate_in_metadata() {
        let code = "print(\"hi\")\nprint(\"bye\")\n";
        let req = request(code, None);
        let artifact = run(&req).expect("runs cleanly");
        assert_eq!(artifact.metadata.stdout, "hi\nbye\n");
        let deltas: Vec<&str> = artifact.trace.iter().flat_map(|e| &e.steps).filter_map(|s| s.stdout.as_deref()).collect();
        assert_eq!(deltas, vec!["hi\n", "bye\n"]);
    }

    #[test]
    fn division_by_zero_in_server_mode_yields_an_empty_shell_with_populated_tree() {
        let code = "def boom():\n    return 1 / 0\n";
        let req = request(code, Some("boom"));
        let artifact = run_server_mode(&req);
        assert!(artifact.trace.is_empty());
        assert_eq!(artifact.metadata.stdout, "");
        assert!(!artifact.ast.is_empty());
    }

    #[test]
    fn unparseable_source_in_server_mode_yields_an_empty_shell_with_no_tree() {
        let req = request("def (:\n", None);
        let artifact = run_server_mode(&req);
        assert!(artifact.ast.is_empty());
        assert!(artifact.relationships.is_empty());
        assert!(artifact.trace.is_empty());
    }

    #[test]
    fn division_by_zero_in_strict_mode_propagates_the_error() {
        let code = "def boom():\n    return 1 / 0\n";
        let req = request(code, Some("boom"));
        assert!(run(&req).is_err());
    }

    #[test]
    fn tree_special_input_materializes_before_the_entry_point_runs() {
        // [1, null, 2, 3] builds a root with no left child and a right
        // child (val 2) whose own left child has val 3.
        let code = "def right_left_value(root):\n    return root.right.left.val\n";
        let mut req = request(code, Some("right_left_value"));
        req.inputs.insert("root".to_string(), serde_json::json!([1, null, 2, 3]));
        req.special_inputs.push(SpecialInput { key: "root".to_string(), kind: inputs::SpecialInputKind::Tree, output_key: "root".to_string() });
        let artifact = run(&req).expect("runs cleanly");
        assert_eq!(artifact.result, Some(step_trace_core::Serialized::Int(3)));
    }
}
